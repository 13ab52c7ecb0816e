use log::{debug, info};

use roadsync_shared::{
    CommandSink, EditLockApplied, EditTarget, EntityLockRegistry, EntityRef, LockError, LockGrant,
    PeerId, SyncMessage,
};

/// Grants or refreshes the edit lock on `target` and broadcasts its authoritative state.
pub(crate) fn begin_edit(
    locks: &EntityLockRegistry,
    sink: &dyn CommandSink,
    requester: PeerId,
    target: EntityRef,
) -> Result<LockGrant, LockError> {
    let grant = locks.begin_edit(target, requester)?;
    if grant.created {
        info!("Edit lock on {} granted to {}", target, grant.owner);
    } else {
        debug!("Edit lock on {} refreshed, owner {}", target, grant.owner);
    }
    sink.send_to_all(SyncMessage::EditLockApplied(EditLockApplied {
        target,
        owner: grant.owner,
        ttl: grant.ttl,
    }));
    Ok(grant)
}

pub(crate) fn end_edit(
    locks: &EntityLockRegistry,
    sink: &dyn CommandSink,
    target: EntityRef,
) -> Result<bool, LockError> {
    let removed = locks.end_edit(target)?;
    if let Some(entry) = removed {
        info!("Edit lock on {} released by {}", target, entry.owner);
    }
    sink.send_to_all(SyncMessage::EditLockCleared(EditTarget::new(target)));
    Ok(removed.is_some())
}

/// Ages every lock by one tick and broadcasts the ones that expired.
pub(crate) fn tick(locks: &EntityLockRegistry, sink: &dyn CommandSink) -> Result<Vec<EntityRef>, LockError> {
    let expired = locks.tick()?;
    for target in &expired {
        debug!("Edit lock on {} expired", target);
        sink.send_to_all(SyncMessage::EditLockCleared(EditTarget::new(*target)));
    }
    Ok(expired)
}
