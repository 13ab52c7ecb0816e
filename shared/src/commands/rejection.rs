use std::fmt;

use crate::{EntityKind, EntityRef, Handle};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub enum RejectReason {
    EntityMissing,
    InvalidPayload,
    AdapterApplyFailed,
    FeatureDisabled,
}

impl RejectReason {
    /// Reason code as carried on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::EntityMissing => "entity_missing",
            RejectReason::InvalidPayload => "invalid_payload",
            RejectReason::AdapterApplyFailed => "tmpe_apply_failed",
            RejectReason::FeatureDisabled => "feature_disabled",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "entity_missing" => Some(RejectReason::EntityMissing),
            "invalid_payload" => Some(RejectReason::InvalidPayload),
            "tmpe_apply_failed" => Some(RejectReason::AdapterApplyFailed),
            "feature_disabled" => Some(RejectReason::FeatureDisabled),
            _ => None,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Host → requesting peer only.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct RequestRejected {
    pub reason: RejectReason,
    pub entity_id: Handle,
    /// See [`EntityKind::tag`]
    pub entity_type: u8,
}

impl RequestRejected {
    pub fn new(reason: RejectReason, entity: EntityRef) -> Self {
        Self {
            reason,
            entity_id: entity.id,
            entity_type: entity.kind.tag(),
        }
    }

    pub fn entity(&self) -> Option<EntityRef> {
        EntityKind::from_tag(self.entity_type).map(|kind| EntityRef::new(kind, self.entity_id))
    }
}
