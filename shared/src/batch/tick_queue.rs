use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use log::warn;

pub type SimulationTask = Box<dyn FnOnce() + Send>;

/// "Run on simulation": hands a task to the next simulation tick.
pub trait SimulationScheduler: Send + Sync {
    fn schedule(&self, task: SimulationTask);
}

/// Queue of tasks run in FIFO order by whoever owns the simulation loop.
#[derive(Clone, Default)]
pub struct TickQueue {
    tasks: Arc<Mutex<VecDeque<SimulationTask>>>,
}

impl TickQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every task queued before this call. Tasks scheduled while running wait for the next call.
    pub fn run_pending(&self) -> usize {
        let tasks: Vec<SimulationTask> = match self.tasks.lock() {
            Ok(mut tasks) => tasks.drain(..).collect(),
            Err(_) => {
                warn!("Tick queue lock is poisoned, dropping this tick's tasks");
                return 0;
            }
        };
        let count = tasks.len();
        for task in tasks {
            task();
        }
        count
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().map(|tasks| tasks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SimulationScheduler for TickQueue {
    fn schedule(&self, task: SimulationTask) {
        match self.tasks.lock() {
            Ok(mut tasks) => tasks.push_back(task),
            Err(_) => warn!("Tick queue lock is poisoned, task dropped"),
        }
    }
}
