pub mod error;
pub mod mapping_entry;
pub mod mapping_store;
pub mod resolver;
pub mod stable_id;
