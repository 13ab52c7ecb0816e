pub mod deferred_op;
pub mod deferred_queue;
pub mod error;
