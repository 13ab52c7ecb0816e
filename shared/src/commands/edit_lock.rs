use crate::{EntityRef, PeerId, Tick};

/// Carried by begin/end requests and by lock-cleared broadcasts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct EditTarget {
    pub target: EntityRef,
}

impl EditTarget {
    pub fn new(target: EntityRef) -> Self {
        Self { target }
    }
}

/// Host → all: authoritative state of one edit lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct EditLockApplied {
    pub target: EntityRef,
    pub owner: PeerId,
    pub ttl: Tick,
}
