pub mod apply_guard;
pub mod error;
pub mod lock_registry;
