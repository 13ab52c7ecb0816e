pub mod edit_lock;
pub mod feature;
pub mod feature_commands;
pub mod mapping_commands;
pub mod rejection;
pub mod sync_message;
pub mod version_check;
