/// An inbound operation parked until its preconditions hold.
///
/// `C` is whatever the operation needs to inspect and mutate when drained,
/// typically the engine's world.
pub trait DeferredOp<C>: Send {
    /// Identifies the operation for diagnostics and dedup, e.g. `"speed_limit:42"`.
    fn key(&self) -> &str;

    /// Whether the referenced entity is still plausible. `false` drops the op for good.
    fn exists(&self, ctx: &C) -> bool;

    /// Precondition not met yet but may be soon, e.g. the mapping version lags behind.
    fn should_wait(&self, ctx: &C) -> bool;

    /// Only called when `exists` holds. `false` keeps the op for the next pass.
    fn try_apply(&mut self, ctx: &mut C) -> bool;
}
