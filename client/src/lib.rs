//! # Roadsync Client
//! A peer of a traffic-control sync session: mirrors the host's identity
//! mapping and edit locks, replays confirmed changes and forwards local edits
//! to the host.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use roadsync_shared::{
        CommandInbox, CommandSink, FeatureKind, FeatureTarget, FeatureValue, PeerId, SyncConfig,
        SyncMessage, TickQueue, TrafficControlAdapter,
    };
}

mod events;
mod peer;

pub use events::PeerEvent;
pub use peer::peer_engine::PeerEngine;
