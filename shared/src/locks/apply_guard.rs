use std::sync::{Arc, Mutex};

use log::warn;

use crate::{
    locks::{
        error::LockError,
        lock_registry::{EntityLockRegistry, LockTable},
    },
    EntityRef,
};

/// Marks entities as being applied to until dropped.
///
/// Released on every exit path, including unwinding out of an adapter call.
#[must_use = "the entities are only held while the guard is alive"]
pub struct ApplyGuard {
    table: Arc<Mutex<LockTable>>,
    entities: Vec<EntityRef>,
}

impl ApplyGuard {
    pub fn entities(&self) -> &[EntityRef] {
        &self.entities
    }
}

impl Drop for ApplyGuard {
    fn drop(&mut self) {
        let mut table = match self.table.lock() {
            Ok(table) => table,
            Err(poisoned) => {
                warn!("Lock table poisoned while releasing apply guard for {:?}", self.entities);
                poisoned.into_inner()
            }
        };
        for entity in self.entities.iter().rev() {
            if let Some(count) = table.applying.get_mut(entity) {
                *count -= 1;
                if *count == 0 {
                    table.applying.remove(entity);
                }
            }
        }
    }
}

impl EntityLockRegistry {
    pub fn acquire_for_apply(&self, entity: EntityRef) -> Result<ApplyGuard, LockError> {
        self.acquire_all_for_apply(&[entity])
    }

    /// Takes all `entities` in the global lock order (nodes, then segments, then lanes).
    pub fn acquire_all_for_apply(&self, entities: &[EntityRef]) -> Result<ApplyGuard, LockError> {
        let mut ordered = entities.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut table = self.lock_table("acquire_for_apply")?;
        for entity in &ordered {
            *table.applying.entry(*entity).or_insert(0) += 1;
        }
        drop(table);

        Ok(ApplyGuard {
            table: self.table.clone(),
            entities: ordered,
        })
    }

    pub fn is_applying(&self, entity: &EntityRef) -> Result<bool, LockError> {
        Ok(self.lock_table("is_applying")?.applying.contains_key(entity))
    }
}
