use thiserror::Error;

/// Errors that can occur while using the deferred operation queue
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeferredError {
    /// The queue lock was poisoned by a panic on another thread
    #[error("Deferred queue lock is poisoned - a panic occurred while it was held during '{operation}'")]
    QueuePoisoned { operation: &'static str },
}
