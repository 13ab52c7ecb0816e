pub mod change_batcher;
pub mod tick_queue;
