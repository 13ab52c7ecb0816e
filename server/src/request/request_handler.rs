use log::{debug, warn};

use roadsync_shared::{
    AdapterError, Applied, FeatureTarget, FeatureValue, IgnoreScope, Localized, RejectReason, RequestRejected,
    SyncConfig, SyncError, SyncWorld, TrafficControlAdapter,
};

/// What became of a change request on the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Broadcast to every participant
    Applied(Applied),
    /// Sent back to the requester only
    Rejected(RequestRejected),
    /// Not handled, e.g. the host is not running
    Ignored,
}

/// Validates, guards, applies and reads back one change on the host.
///
/// Every check happens before the simulation is touched: a disabled or
/// unsupported feature, then the payload, then entity existence. Existence is
/// checked again once the apply guard is held. The returned record carries the
/// value the simulation actually ended up with, which may differ from `value`.
pub(crate) fn process_change<A: TrafficControlAdapter>(
    world: &mut SyncWorld<A>,
    config: &SyncConfig,
    target: &FeatureTarget,
    value: &FeatureValue,
) -> Result<Applied, SyncError> {
    let feature = value.feature();
    if !config.is_enabled(feature) || !world.adapter().supports(feature) {
        return Err(SyncError::FeatureDisabled { feature });
    }
    value
        .validate(target)
        .map_err(|reason| SyncError::InvalidPayload { reason })?;

    let (local, local_value) = match world.localize_change(target, value)? {
        Localized::Ready(local) => local,
        Localized::Pending => {
            return Err(SyncError::EntityMissing {
                entity: target.primary(),
            })
        }
        Localized::Missing(entity) => return Err(SyncError::EntityMissing { entity }),
    };

    let _guard = world
        .locks()
        .acquire_all_for_apply(&local_value.entities_with(&local))?;
    if let Some(entity) = world.missing_in_change(&local, &local_value) {
        debug!("{} disappeared while acquiring apply guard", entity);
        return Err(SyncError::EntityMissing { entity });
    }

    {
        let _scope = IgnoreScope::enter();
        world
            .adapter_mut()
            .apply(&local, &local_value)
            .map_err(|source| match source {
                AdapterError::EntityGone { entity } => SyncError::EntityMissing { entity },
                source => SyncError::AdapterApplyFailure { feature, source },
            })?;
    }

    let actual = match world.adapter().read(feature, &local) {
        Some(actual) => actual,
        None => {
            debug!("{} on {} cannot be read back, echoing the request", feature, local);
            local_value
        }
    };
    let version = world.mapping().current_version()?;
    Ok(Applied::new(local, actual, Some(version)))
}

/// The rejection reported to the requester for `err`.
pub(crate) fn rejection_for(err: &SyncError, target: &FeatureTarget) -> RequestRejected {
    let entity = match err {
        SyncError::EntityMissing { entity } => *entity,
        _ => target.primary(),
    };
    let reason = match err.reject_reason() {
        Some(reason) => reason,
        None => {
            warn!("Unexpected failure handling request for {}: {}", target, err);
            RejectReason::AdapterApplyFailed
        }
    };
    RequestRejected::new(reason, entity)
}
