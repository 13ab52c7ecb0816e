//! In-memory simulation, loopback transport and a multi-peer session used by
//! the integration and property tests.

pub mod loopback;

pub use loopback::{Delivery, HostLink, LoopbackHub, PeerLink};
pub use session::{Session, TestPeer, HOST_FIRST_LANE, TICK};
pub use sim_world::{SimWorld, LANE_TYPE_ID};
