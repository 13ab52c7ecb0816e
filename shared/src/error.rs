use thiserror::Error;

use crate::{
    adapter::AdapterError, commands::rejection::RejectReason, deferred::error::DeferredError,
    identity::error::MappingError, locks::error::LockError, EntityRef, FeatureKind,
    MappingVersion,
};

/// Errors surfaced by the synchronization engines
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// A mapping mutation carried a version that is not newer than the last one applied
    #[error("Stale mapping version {received}, already at {current}")]
    StaleVersion {
        received: MappingVersion,
        current: MappingVersion,
    },

    /// A record referenced an entity that does not exist locally
    #[error("Entity {entity} does not exist")]
    EntityMissing { entity: EntityRef },

    /// The traffic-control adapter refused or failed to apply a value
    #[error("Adapter failed to apply {feature}: {source}")]
    AdapterApplyFailure {
        feature: FeatureKind,
        #[source]
        source: AdapterError,
    },

    /// A request was malformed or out of range
    #[error("Invalid payload: {reason}")]
    InvalidPayload { reason: String },

    /// The feature is disabled on the host or unsupported by its adapter
    #[error("Feature {feature} is disabled")]
    FeatureDisabled { feature: FeatureKind },

    /// A host-only operation was invoked on a peer
    #[error("Operation '{operation}' is only valid on the host")]
    NotHost { operation: &'static str },

    /// A shared structure's lock was poisoned by a panic on another thread
    #[error("Lock on {structure} is poisoned")]
    LockPoisoned { structure: &'static str },

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Deferred(#[from] DeferredError),
}

impl SyncError {
    /// Reason code a host reports to the requesting peer, when the error maps onto one.
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            SyncError::EntityMissing { .. } => Some(RejectReason::EntityMissing),
            SyncError::InvalidPayload { .. } => Some(RejectReason::InvalidPayload),
            SyncError::AdapterApplyFailure { .. } => Some(RejectReason::AdapterApplyFailed),
            SyncError::FeatureDisabled { .. } => Some(RejectReason::FeatureDisabled),
            _ => None,
        }
    }
}
