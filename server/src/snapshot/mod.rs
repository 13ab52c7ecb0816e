pub mod dispatcher;
pub mod provider;
pub mod providers;
