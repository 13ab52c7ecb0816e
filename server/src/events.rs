use roadsync_shared::{Applied, EntityRef, PeerId, RequestRejected};

use crate::snapshot::dispatcher::ExportOutcome;

/// Things that happened on the host since events were last taken.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostEvent {
    RequestApplied { sender: PeerId, applied: Applied },
    RequestRejected { sender: PeerId, rejection: RequestRejected },
    /// A peer's unsolicited change notice that the host could not apply
    NoticeDropped { sender: PeerId, target: EntityRef },
    LockGranted { target: EntityRef, owner: PeerId },
    LockCleared { target: EntityRef },
    SnapshotExported(ExportOutcome),
    /// A peer announced a record set this host does not speak
    VersionMismatch {
        peer: PeerId,
        peer_version: u16,
        host_version: u16,
    },
}
