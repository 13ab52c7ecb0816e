use log::warn;

use crate::{
    adapter::TrafficControlAdapter,
    apply::{
        remote_apply::{apply_remote, needs_mapping},
        sync_world::{Localized, SyncWorld},
    },
    commands::feature_commands::Applied,
    deferred::deferred_op::DeferredOp,
};

/// An applied record parked until the mapping it references is available.
pub struct AppliedOp {
    key: String,
    applied: Applied,
}

impl AppliedOp {
    pub fn new(applied: Applied) -> Self {
        Self {
            key: format!("{}:{}", applied.feature(), applied.target),
            applied,
        }
    }
}

impl<A: TrafficControlAdapter> DeferredOp<SyncWorld<A>> for AppliedOp {
    fn key(&self) -> &str {
        &self.key
    }

    fn exists(&self, world: &SyncWorld<A>) -> bool {
        matches!(
            world.localize_change(&self.applied.target, &self.applied.value),
            Ok(Localized::Ready(_))
        )
    }

    fn should_wait(&self, world: &SyncWorld<A>) -> bool {
        if needs_mapping(world, &self.applied) || !world.adapter().is_ready() {
            return true;
        }
        match world.localize_change(&self.applied.target, &self.applied.value) {
            Ok(localized) => localized == Localized::Pending,
            Err(err) => {
                warn!("Deferred '{}' cannot localize: {}", self.key, err);
                true
            }
        }
    }

    fn try_apply(&mut self, world: &mut SyncWorld<A>) -> bool {
        apply_remote(world, &self.applied).succeeded()
    }
}
