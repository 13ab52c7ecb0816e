use crate::{CompoundAddress, Handle, MappingVersion, StableId};

/// One row of the identity mapping table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MappingEntry {
    pub address: CompoundAddress,
    /// Handle of the entity in this session, once it has been observed locally.
    pub local_handle: Option<Handle>,
    /// Identity as announced by the authoritative host.
    pub stable_id: StableId,
}

impl MappingEntry {
    /// An entry observed by the local simulation; its local handle is the one in `stable_id`.
    pub fn new_observed(address: CompoundAddress, stable_id: StableId) -> Self {
        Self {
            address,
            local_handle: Some(stable_id.handle),
            stable_id,
        }
    }

    /// An entry announced by a remote participant that still needs re-resolution.
    pub fn new_unresolved(address: CompoundAddress, stable_id: StableId) -> Self {
        Self {
            address,
            local_handle: None,
            stable_id,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.local_handle.is_some()
    }

    /// Handle the sender of the mapping used for this entity.
    pub fn remote_handle(&self) -> Handle {
        self.stable_id.handle
    }
}

/// Result of recording a local observation in the mapping store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertResult {
    Unchanged,
    Added(MappingVersion),
    Updated(MappingVersion),
}

impl UpsertResult {
    pub fn version(&self) -> Option<MappingVersion> {
        match self {
            UpsertResult::Unchanged => None,
            UpsertResult::Added(version) | UpsertResult::Updated(version) => Some(*version),
        }
    }

    pub fn is_changed(&self) -> bool {
        !matches!(self, UpsertResult::Unchanged)
    }
}
