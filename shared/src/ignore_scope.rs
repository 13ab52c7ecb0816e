use std::{cell::Cell, marker::PhantomData};

thread_local! {
    static IGNORE_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Suppresses local change detection while a remote-originated mutation is
/// replayed on this thread.
///
/// Scopes nest: change detection resumes only once the outermost guard drops.
/// The guard is `!Send`, it must be released on the thread that entered it.
#[must_use = "change detection is only suppressed while the guard is alive"]
pub struct IgnoreScope {
    _not_send: PhantomData<*const ()>,
}

impl IgnoreScope {
    pub fn enter() -> Self {
        IGNORE_DEPTH.with(|depth| depth.set(depth.get().saturating_add(1)));
        Self {
            _not_send: PhantomData,
        }
    }

    pub fn is_active() -> bool {
        Self::depth() > 0
    }

    pub fn depth() -> u32 {
        IGNORE_DEPTH.with(Cell::get)
    }
}

impl Drop for IgnoreScope {
    fn drop(&mut self) {
        IGNORE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}
