use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use log::{debug, warn};

use crate::{locks::error::LockError, EntityRef, HostType, PeerId, Tick};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockEntry {
    pub owner: PeerId,
    pub remaining_ticks: Tick,
}

/// Result of a `begin_edit` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockGrant {
    pub owner: PeerId,
    pub ttl: Tick,
    /// `false` when an existing lock was only refreshed
    pub created: bool,
}

/// Ownership table for edit sessions, with tick-based expiry.
///
/// On the host (`HostType::Server`) this is the authority; peers keep a
/// mirror fed by lock broadcasts. Locks are advisory: nothing here blocks an
/// apply, adapters and tooling decide whether to honor them.
#[derive(Clone)]
pub struct EntityLockRegistry {
    host_type: HostType,
    ttl_ticks: Tick,
    pub(crate) table: Arc<Mutex<LockTable>>,
}

#[derive(Default)]
pub(crate) struct LockTable {
    locks: HashMap<EntityRef, LockEntry>,
    pub(crate) applying: HashMap<EntityRef, u32>,
}

impl EntityLockRegistry {
    pub fn new(host_type: HostType, ttl_ticks: Tick) -> Self {
        Self {
            host_type,
            ttl_ticks,
            table: Arc::new(Mutex::new(LockTable::default())),
        }
    }

    pub fn host_type(&self) -> HostType {
        self.host_type
    }

    pub fn ttl_ticks(&self) -> Tick {
        self.ttl_ticks
    }

    pub(crate) fn lock_table(&self, operation: &'static str) -> Result<MutexGuard<'_, LockTable>, LockError> {
        self.table
            .lock()
            .map_err(|_| LockError::TablePoisoned { operation })
    }

    fn require_host(&self, operation: &'static str, entity: EntityRef) -> Result<(), LockError> {
        if self.host_type.is_server() {
            Ok(())
        } else {
            Err(LockError::NotAuthoritative { operation, entity })
        }
    }

    /// First come, first served: an unlocked entity is granted to `requester`,
    /// a locked one keeps its owner and only has its TTL refreshed.
    pub fn begin_edit(&self, entity: EntityRef, requester: PeerId) -> Result<LockGrant, LockError> {
        self.require_host("begin_edit", entity)?;
        let ttl = self.ttl_ticks;
        let mut table = self.lock_table("begin_edit")?;
        match table.locks.get_mut(&entity) {
            Some(entry) => {
                entry.remaining_ticks = ttl;
                if entry.owner != requester {
                    debug!(
                        "{} requested edit lock on {} held by {}, refreshed only",
                        requester, entity, entry.owner
                    );
                }
                Ok(LockGrant {
                    owner: entry.owner,
                    ttl,
                    created: false,
                })
            }
            None => {
                table.locks.insert(
                    entity,
                    LockEntry {
                        owner: requester,
                        remaining_ticks: ttl,
                    },
                );
                Ok(LockGrant {
                    owner: requester,
                    ttl,
                    created: true,
                })
            }
        }
    }

    /// Removes the lock unconditionally. Returns the entry that was removed, if any.
    pub fn end_edit(&self, entity: EntityRef) -> Result<Option<LockEntry>, LockError> {
        self.require_host("end_edit", entity)?;
        let removed = self.lock_table("end_edit")?.locks.remove(&entity);
        if removed.is_none() {
            warn!("EndEdit for {} without an active lock", entity);
        }
        Ok(removed)
    }

    /// Advances every lock by one tick and returns the ones that expired, in
    /// lock order. A lock granted with TTL `n` survives `n` ticks.
    pub fn tick(&self) -> Result<Vec<EntityRef>, LockError> {
        let mut table = self.lock_table("tick")?;
        let mut expired = Vec::new();
        table.locks.retain(|entity, entry| {
            entry.remaining_ticks = entry.remaining_ticks.saturating_sub(1);
            if entry.remaining_ticks == 0 {
                expired.push(*entity);
                false
            } else {
                true
            }
        });
        expired.sort();
        Ok(expired)
    }

    /// Whether `entity` has an edit lock (panicking version)
    ///
    /// # Panics
    ///
    /// Panics if the lock table is poisoned.
    /// Consider using `try_is_locked` for non-panicking error handling.
    pub fn is_locked(&self, entity: &EntityRef) -> bool {
        self.try_is_locked(entity)
            .expect("Lock table is held by a panicked thread")
    }

    /// Whether `entity` has an edit lock (non-panicking version)
    pub fn try_is_locked(&self, entity: &EntityRef) -> Result<bool, LockError> {
        Ok(self.lock_table("is_locked")?.locks.contains_key(entity))
    }

    pub fn entry(&self, entity: &EntityRef) -> Result<Option<LockEntry>, LockError> {
        Ok(self.lock_table("entry")?.locks.get(entity).copied())
    }

    pub fn owner(&self, entity: &EntityRef) -> Result<Option<PeerId>, LockError> {
        Ok(self.entry(entity)?.map(|entry| entry.owner))
    }

    /// Used by local tooling to refuse input on entities someone else is editing.
    pub fn is_locked_by_other(&self, entity: &EntityRef, me: PeerId) -> Result<bool, LockError> {
        Ok(self.owner(entity)?.is_some_and(|owner| owner != me))
    }

    pub fn locks(&self) -> Result<Vec<(EntityRef, LockEntry)>, LockError> {
        let table = self.lock_table("locks")?;
        let mut locks: Vec<(EntityRef, LockEntry)> =
            table.locks.iter().map(|(entity, entry)| (*entity, *entry)).collect();
        locks.sort_by_key(|(entity, _)| *entity);
        Ok(locks)
    }

    // Mirror

    /// Applies a lock broadcast from the host. A TTL of zero clears the lock.
    pub fn apply_mirror(&self, entity: EntityRef, owner: PeerId, ttl: Tick) -> Result<(), LockError> {
        let mut table = self.lock_table("apply_mirror")?;
        if ttl == 0 {
            table.locks.remove(&entity);
        } else {
            table.locks.insert(
                entity,
                LockEntry {
                    owner,
                    remaining_ticks: ttl,
                },
            );
        }
        Ok(())
    }

    pub fn clear_mirror(&self, entity: &EntityRef) -> Result<(), LockError> {
        self.lock_table("clear_mirror")?.locks.remove(entity);
        Ok(())
    }

    /// Drops every lock. Apply guards still alive keep their bookkeeping.
    pub fn reset(&self) -> Result<(), LockError> {
        self.lock_table("reset")?.locks.clear();
        Ok(())
    }
}
