use std::{collections::HashMap, sync::Arc};

use log::{trace, warn};

use crate::{
    batch::{
        change_batcher::{ChangeBatcher, FlushAction},
        tick_queue::SimulationScheduler,
    },
    commands::{
        feature::{FeatureKind, FeatureTarget, FeatureValue},
        feature_commands::BatchEntry,
    },
    ignore_scope::IgnoreScope,
};

/// Entry point for the simulation's mutation hooks.
///
/// Each feature gets its own batcher; what a flush does (broadcast on the
/// host, request on a peer) is decided by the engine that builds the observer.
#[derive(Clone)]
pub struct ChangeObserver {
    batchers: HashMap<FeatureKind, ChangeBatcher<BatchEntry>>,
}

impl ChangeObserver {
    pub fn new(
        scheduler: Arc<dyn SimulationScheduler>,
        mut flush_for: impl FnMut(FeatureKind) -> FlushAction<BatchEntry>,
    ) -> Self {
        let batchers = FeatureKind::ALL
            .iter()
            .map(|feature| {
                let batcher = ChangeBatcher::new(feature.name(), scheduler.clone(), flush_for(*feature));
                (*feature, batcher)
            })
            .collect();
        Self { batchers }
    }

    /// Reports a local mutation. Returns whether it was queued for sending.
    pub fn observe(&self, target: FeatureTarget, value: FeatureValue) -> bool {
        if IgnoreScope::is_active() {
            trace!("Ignoring {} change on {} replayed from remote", value.feature(), target);
            return false;
        }
        let Some(batcher) = self.batchers.get(&value.feature()) else {
            return false;
        };
        match batcher.enqueue(BatchEntry::new(target, value)) {
            Ok(()) => true,
            Err(err) => {
                warn!("Could not queue {} change on {}: {}", value.feature(), target, err);
                false
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.batchers.values().map(ChangeBatcher::pending).sum()
    }
}
