use crate::commands::{
    edit_lock::{EditLockApplied, EditTarget},
    feature_commands::{Applied, BatchApplied, SetRequest},
    mapping_commands::{MappingBatch, MappingChanged, MappingRemoved},
    rejection::RequestRejected,
    version_check::{VersionCheck, VersionResult},
};

/// Version of the record set below. Bumped whenever a record changes shape.
pub const PROTOCOL_VERSION: u16 = 1;

/// Every record exchanged over the reliable command channel.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub enum SyncMessage {
    SetRequest(SetRequest),
    Applied(Applied),
    BatchApplied(BatchApplied),
    RequestRejected(RequestRejected),
    MappingBatch(MappingBatch),
    MappingChanged(MappingChanged),
    MappingRemoved(MappingRemoved),
    BeginEditRequest(EditTarget),
    EndEditRequest(EditTarget),
    EditLockApplied(EditLockApplied),
    EditLockCleared(EditTarget),
    VersionCheck(VersionCheck),
    VersionResult(VersionResult),
}

impl SyncMessage {
    pub fn name(&self) -> &'static str {
        match self {
            SyncMessage::SetRequest(_) => "SetRequest",
            SyncMessage::Applied(_) => "Applied",
            SyncMessage::BatchApplied(_) => "BatchApplied",
            SyncMessage::RequestRejected(_) => "RequestRejected",
            SyncMessage::MappingBatch(_) => "MappingBatch",
            SyncMessage::MappingChanged(_) => "MappingChanged",
            SyncMessage::MappingRemoved(_) => "MappingRemoved",
            SyncMessage::BeginEditRequest(_) => "BeginEditRequest",
            SyncMessage::EndEditRequest(_) => "EndEditRequest",
            SyncMessage::EditLockApplied(_) => "EditLockApplied",
            SyncMessage::EditLockCleared(_) => "EditLockCleared",
            SyncMessage::VersionCheck(_) => "VersionCheck",
            SyncMessage::VersionResult(_) => "VersionResult",
        }
    }

    /// Records only a peer may send to the host.
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            SyncMessage::SetRequest(_)
                | SyncMessage::BeginEditRequest(_)
                | SyncMessage::EndEditRequest(_)
                | SyncMessage::VersionCheck(_)
        )
    }
}
