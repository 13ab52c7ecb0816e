pub mod applied_op;
pub mod change_observer;
pub mod remote_apply;
pub mod sync_world;
