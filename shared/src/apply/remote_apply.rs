use log::{debug, error, trace, warn};

use crate::{
    adapter::TrafficControlAdapter,
    apply::sync_world::{Localized, SyncWorld},
    commands::feature_commands::Applied,
    ignore_scope::IgnoreScope,
};

/// Outcome of applying a remote record. Deferred never counts as succeeded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApplyResult {
    succeeded: bool,
    deferred: bool,
}

impl ApplyResult {
    pub fn applied() -> Self {
        Self {
            succeeded: true,
            deferred: false,
        }
    }

    pub fn deferred() -> Self {
        Self {
            succeeded: false,
            deferred: true,
        }
    }

    pub fn failed() -> Self {
        Self {
            succeeded: false,
            deferred: false,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred
    }
}

/// Whether `applied` can only be handled once the local mapping catches up.
pub fn needs_mapping<A: TrafficControlAdapter>(world: &SyncWorld<A>, applied: &Applied) -> bool {
    let Some(required) = applied.mapping_version else {
        return false;
    };
    match world.mapping().current_version() {
        Ok(current) => current < required,
        Err(err) => {
            warn!("Cannot read mapping version: {}", err);
            true
        }
    }
}

/// Replays an applied record from the host (or the host's own loopback).
///
/// The adapter call runs inside an [`IgnoreScope`] so the local change
/// observer does not report the mutation back out.
pub fn apply_remote<A: TrafficControlAdapter>(world: &mut SyncWorld<A>, applied: &Applied) -> ApplyResult {
    let feature = applied.feature();
    if needs_mapping(world, applied) {
        trace!("{} on {} waits for mapping {:?}", feature, applied.target, applied.mapping_version);
        return ApplyResult::deferred();
    }

    let (target, value) = match world.localize_change(&applied.target, &applied.value) {
        Ok(Localized::Ready(local)) => local,
        Ok(Localized::Pending) => return ApplyResult::deferred(),
        Ok(Localized::Missing(entity)) => {
            warn!("Dropping {} for {}: entity missing", feature, entity);
            return ApplyResult::failed();
        }
        Err(err) => {
            warn!("Cannot localize {}: {}", applied.target, err);
            return ApplyResult::failed();
        }
    };

    if !world.adapter().is_ready() {
        debug!("Adapter not ready, deferring {} on {}", feature, target);
        return ApplyResult::deferred();
    }

    let _guard = match world.locks().acquire_all_for_apply(&value.entities_with(&target)) {
        Ok(guard) => guard,
        Err(err) => {
            error!("Cannot guard {} for {}: {}", target, feature, err);
            return ApplyResult::failed();
        }
    };
    let _scope = IgnoreScope::enter();
    match world.adapter_mut().apply(&target, &value) {
        Ok(()) => {
            trace!("Applied {} {:?} on {}", feature, value, target);
            ApplyResult::applied()
        }
        Err(err) => {
            error!("Failed to apply {} on {}: {}", feature, target, err);
            ApplyResult::failed()
        }
    }
}
