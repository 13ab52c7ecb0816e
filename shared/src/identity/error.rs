use thiserror::Error;

use crate::{CompoundAddress, MappingVersion};

/// Errors that can occur while reading or mutating the identity mapping store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MappingError {
    /// The table lock was poisoned by a panic on another thread
    #[error("Identity mapping lock is poisoned - a panic occurred while it was held during '{operation}'")]
    LockPoisoned { operation: &'static str },

    /// A mutation referenced an address with no entry
    #[error("No mapping entry exists at {address}")]
    EntryMissing { address: CompoundAddress },

    /// The local version counter cannot advance any further
    #[error("Mapping version overflow at version {version}")]
    VersionOverflow { version: MappingVersion },
}
