//! # Roadsync Server
//! The authoritative host of a traffic-control sync session: validates and
//! applies change requests, arbitrates edit locks, tracks the identity mapping
//! and exports snapshots to peers.

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
mod host;
mod locks;
mod mapping;
mod request;
mod snapshot;

pub use events::HostEvent;
pub use host::host_engine::HostEngine;
pub use mapping::mapping_tracker::{MappingTracker, PARENTS_PER_TICK};
pub use request::request_handler::RequestOutcome;
pub use snapshot::{
    dispatcher::{ExportOutcome, ExportReason, SnapshotDispatcher},
    provider::{DispatchRoute, SnapshotProvider},
    providers::{FeatureSnapshotProvider, MappingSnapshotProvider, EXPORT_CHUNK},
};
