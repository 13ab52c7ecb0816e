pub mod host_engine;
