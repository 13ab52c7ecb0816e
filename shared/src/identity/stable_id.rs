use std::fmt;

use crate::Handle;

/// Cross-session identity of a simulated sub-entity (for example a lane).
///
/// The `handle` is the handle of the entity on the participant that produced
/// the id; the remaining fields discriminate the entity independently of that
/// handle and are what re-resolution matches on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct StableId {
    pub handle: Handle,
    /// Build index the simulation assigned to the owning entity when it was created.
    pub build_index: u32,
    /// Type (prefab) identifier.
    pub type_id: u16,
    /// Position of the entity within its owner, e.g. lane-within-segment.
    pub sub_index: u8,
    pub sequence: u32,
}

impl StableId {
    pub fn new(handle: Handle, build_index: u32, type_id: u16, sub_index: u8, sequence: u32) -> Self {
        Self {
            handle,
            build_index,
            type_id,
            sub_index,
            sequence,
        }
    }

    /// An all-zero identity means "no identity yet".
    pub fn is_valid(&self) -> bool {
        self.build_index != 0 || self.type_id != 0 || self.sequence != 0
    }

    /// Whether `candidate`, observed locally, denotes the same entity as `self`
    /// regardless of which handle either side assigned to it.
    pub fn matches(&self, candidate: &StableId) -> bool {
        if self.type_id != candidate.type_id || self.sub_index != candidate.sub_index {
            return false;
        }
        if self.build_index != 0 && candidate.build_index != 0 {
            return self.build_index == candidate.build_index;
        }
        true
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StableId(handle={}, build={}, type={}, sub={}, seq={})",
            self.handle, self.build_index, self.type_id, self.sub_index, self.sequence
        )
    }
}

/// Where a sub-entity lives: its parent's handle plus its index within the parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct CompoundAddress {
    pub parent: Handle,
    pub sub_index: u16,
}

impl CompoundAddress {
    pub fn new(parent: Handle, sub_index: u16) -> Self {
        Self { parent, sub_index }
    }
}

impl fmt::Display for CompoundAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.parent, self.sub_index)
    }
}

/// Kind of a lockable / referenceable simulation entity.
///
/// The declaration order is the global acquisition order for multi-entity locks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityKind {
    Node,
    Segment,
    Lane,
}

impl EntityKind {
    /// Wire tag used in rejections.
    pub fn tag(&self) -> u8 {
        match self {
            EntityKind::Lane => 1,
            EntityKind::Segment => 2,
            EntityKind::Node => 3,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(EntityKind::Lane),
            2 => Some(EntityKind::Segment),
            3 => Some(EntityKind::Node),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Node => "node",
            EntityKind::Segment => "segment",
            EntityKind::Lane => "lane",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: Handle,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: Handle) -> Self {
        Self { kind, id }
    }

    pub fn node(id: Handle) -> Self {
        Self::new(EntityKind::Node, id)
    }

    pub fn segment(id: Handle) -> Self {
        Self::new(EntityKind::Segment, id)
    }

    pub fn lane(id: Handle) -> Self {
        Self::new(EntityKind::Lane, id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.name(), self.id)
    }
}
