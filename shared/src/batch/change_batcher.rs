use std::{
    mem,
    sync::{Arc, Mutex},
};

use log::{trace, warn};

use crate::{batch::tick_queue::SimulationScheduler, error::SyncError};

pub type FlushAction<T> = Arc<dyn Fn(Vec<T>) -> Result<(), SyncError> + Send + Sync>;

/// Coalesces a burst of outbound notifications into one flush per tick.
///
/// At most one flush is pending at any time: the first enqueue after a flush
/// schedules it, later enqueues only append. A failed flush is logged and its
/// items are not retried.
pub struct ChangeBatcher<T: Send + 'static> {
    topic: &'static str,
    state: Arc<Mutex<BatchState<T>>>,
    flush_action: FlushAction<T>,
    scheduler: Arc<dyn SimulationScheduler>,
}

impl<T: Send + 'static> Clone for ChangeBatcher<T> {
    fn clone(&self) -> Self {
        Self {
            topic: self.topic,
            state: self.state.clone(),
            flush_action: self.flush_action.clone(),
            scheduler: self.scheduler.clone(),
        }
    }
}

struct BatchState<T> {
    buffer: Vec<T>,
    flush_scheduled: bool,
}

impl<T: Send + 'static> ChangeBatcher<T> {
    pub fn new(
        topic: &'static str,
        scheduler: Arc<dyn SimulationScheduler>,
        flush_action: FlushAction<T>,
    ) -> Self {
        Self {
            topic,
            state: Arc::new(Mutex::new(BatchState {
                buffer: Vec::new(),
                flush_scheduled: false,
            })),
            flush_action,
            scheduler,
        }
    }

    pub fn topic(&self) -> &'static str {
        self.topic
    }

    pub fn enqueue(&self, item: T) -> Result<(), SyncError> {
        let schedule = {
            let mut state = self.state.lock().map_err(|_| SyncError::LockPoisoned {
                structure: "change batcher",
            })?;
            state.buffer.push(item);
            !mem::replace(&mut state.flush_scheduled, true)
        };

        if schedule {
            let batcher = self.clone();
            self.scheduler.schedule(Box::new(move || batcher.flush()));
        }
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.state.lock().map(|state| state.buffer.len()).unwrap_or(0)
    }

    fn flush(&self) {
        let batch = match self.state.lock() {
            Ok(mut state) => {
                state.flush_scheduled = false;
                mem::take(&mut state.buffer)
            }
            Err(_) => {
                warn!("[{}] batch lock is poisoned, flush skipped", self.topic);
                return;
            }
        };
        if batch.is_empty() {
            return;
        }

        trace!("[{}] flushing {} item(s)", self.topic, batch.len());
        if let Err(err) = (self.flush_action)(batch) {
            warn!("[{}] flush failed: {}", self.topic, err);
        }
    }
}
