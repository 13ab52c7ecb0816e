use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard},
};

use log::{debug, info, trace, warn};

use crate::deferred::{deferred_op::DeferredOp, error::DeferredError};

struct PendingOp<C> {
    op: Box<dyn DeferredOp<C>>,
    passes: u32,
}

/// Counters for a single drain pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub applied: usize,
    /// Entity gone, the op can never apply.
    pub dropped: usize,
    /// Still waiting, or failed and kept for the next pass.
    pub waiting: usize,
    /// Exceeded the configured maximum number of passes.
    pub expired: usize,
}

/// FIFO of deferred operations, drained whenever mapping state advances and
/// once per tick.
pub struct DeferredQueue<C> {
    pending: Mutex<VecDeque<PendingOp<C>>>,
    max_wait_passes: Option<u32>,
}

impl<C> DeferredQueue<C> {
    pub fn new(max_wait_passes: Option<u32>) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            max_wait_passes,
        }
    }

    fn pending(&self, operation: &'static str) -> Result<MutexGuard<'_, VecDeque<PendingOp<C>>>, DeferredError> {
        self.pending
            .lock()
            .map_err(|_| DeferredError::QueuePoisoned { operation })
    }

    /// Queues `op`. An op already queued under the same key is replaced and the
    /// new one goes to the back.
    pub fn enqueue(&self, op: Box<dyn DeferredOp<C>>) -> Result<(), DeferredError> {
        let mut pending = self.pending("enqueue")?;
        if let Some(index) = pending.iter().position(|queued| queued.op.key() == op.key()) {
            pending.remove(index);
            trace!("Deferred op '{}' superseded", op.key());
        } else {
            debug!("Deferring '{}'", op.key());
        }
        pending.push_back(PendingOp { op, passes: 0 });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pending.lock().map(|pending| pending.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Result<Vec<String>, DeferredError> {
        Ok(self
            .pending("keys")?
            .iter()
            .map(|queued| queued.op.key().to_string())
            .collect())
    }

    pub fn clear(&self) -> Result<(), DeferredError> {
        self.pending("clear")?.clear();
        Ok(())
    }

    /// Evaluates every queued op once, in enqueue order.
    ///
    /// The queue lock is not held while ops run, so ops enqueued meanwhile
    /// (from another thread, or by an op's own apply) land behind the survivors
    /// of this pass and are first evaluated on the next one.
    pub fn drain(&self, ctx: &mut C) -> Result<DrainReport, DeferredError> {
        let batch: Vec<PendingOp<C>> = self.pending("drain")?.drain(..).collect();
        let mut report = DrainReport::default();
        let mut survivors = Vec::new();

        for mut queued in batch {
            if queued.op.should_wait(ctx) {
                self.keep_or_expire(queued, &mut survivors, &mut report);
                continue;
            }
            if !queued.op.exists(ctx) {
                debug!("Dropping deferred '{}', its entity is gone", queued.op.key());
                report.dropped += 1;
                continue;
            }
            if queued.op.try_apply(ctx) {
                trace!("Applied deferred '{}'", queued.op.key());
                report.applied += 1;
            } else {
                self.keep_or_expire(queued, &mut survivors, &mut report);
            }
        }

        let mut pending = self.pending("drain")?;
        let late_arrivals: Vec<PendingOp<C>> = pending.drain(..).collect();
        for queued in survivors {
            // a newer op with the same key arrived while draining
            if late_arrivals.iter().any(|late| late.op.key() == queued.op.key()) {
                report.waiting -= 1;
                continue;
            }
            pending.push_back(queued);
        }
        pending.extend(late_arrivals);

        if report.applied > 0 || report.dropped > 0 || report.expired > 0 {
            info!(
                "Deferred drain: {} applied, {} dropped, {} expired, {} waiting",
                report.applied, report.dropped, report.expired, report.waiting
            );
        }
        Ok(report)
    }

    fn keep_or_expire(
        &self,
        mut queued: PendingOp<C>,
        survivors: &mut Vec<PendingOp<C>>,
        report: &mut DrainReport,
    ) {
        queued.passes += 1;
        if let Some(max) = self.max_wait_passes {
            if queued.passes >= max {
                warn!(
                    "Deferred '{}' gave up after {} passes",
                    queued.op.key(),
                    queued.passes
                );
                report.expired += 1;
                return;
            }
        }
        report.waiting += 1;
        survivors.push(queued);
    }
}

impl<C> Default for DeferredQueue<C> {
    fn default() -> Self {
        Self::new(None)
    }
}
