pub mod peer_engine;
