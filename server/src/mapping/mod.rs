pub mod mapping_tracker;
