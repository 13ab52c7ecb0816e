use crate::{CompoundAddress, MappingVersion, StableId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct MappingRecord {
    pub address: CompoundAddress,
    pub stable_id: StableId,
}

impl MappingRecord {
    pub fn new(address: CompoundAddress, stable_id: StableId) -> Self {
        Self { address, stable_id }
    }
}

/// Host → all. A full snapshot replaces the receiver's table, otherwise every
/// record is upserted under the batch's single version.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct MappingBatch {
    pub is_full_snapshot: bool,
    pub version: MappingVersion,
    pub entries: Vec<MappingRecord>,
}

impl MappingBatch {
    pub fn snapshot(version: MappingVersion, entries: Vec<MappingRecord>) -> Self {
        Self {
            is_full_snapshot: true,
            version,
            entries,
        }
    }

    pub fn incremental(version: MappingVersion, entries: Vec<MappingRecord>) -> Self {
        Self {
            is_full_snapshot: false,
            version,
            entries,
        }
    }

    pub fn pairs(&self) -> impl Iterator<Item = (CompoundAddress, StableId)> + '_ {
        self.entries
            .iter()
            .map(|record| (record.address, record.stable_id))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct MappingChanged {
    pub address: CompoundAddress,
    pub stable_id: StableId,
    pub version: MappingVersion,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct MappingRemoved {
    pub address: CompoundAddress,
    pub stable_id: StableId,
    pub version: MappingVersion,
}
