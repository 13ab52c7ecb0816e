use thiserror::Error;

use crate::EntityRef;

/// Errors that can occur while reading or mutating the entity lock registry
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LockError {
    /// The lock table was poisoned by a panic on another thread
    #[error("Lock table is poisoned - a panic occurred while it was held during '{operation}'")]
    TablePoisoned { operation: &'static str },

    /// An authoritative operation was invoked on a mirror registry
    #[error("'{operation}' on {entity} requires the host registry")]
    NotAuthoritative {
        operation: &'static str,
        entity: EntityRef,
    },
}
