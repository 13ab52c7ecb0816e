use roadsync_shared::{EntityRef, MappingVersion, PeerId, RequestRejected};

/// Things a UI layer on the peer may want to react to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerEvent {
    /// The host refused one of our requests
    Rejected(RequestRejected),
    LockApplied { target: EntityRef, owner: PeerId },
    LockCleared { target: EntityRef },
    /// A mapping record was accepted; `resolved` entries got bound to local handles
    MappingUpdated {
        version: MappingVersion,
        resolved: usize,
    },
    /// The host refused our protocol version; nothing we send will be understood
    VersionMismatch { host_version: u16, local_version: u16 },
}
