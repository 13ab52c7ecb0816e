use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    identity::{
        error::MappingError,
        mapping_entry::{MappingEntry, UpsertResult},
    },
    CompoundAddress, Handle, MappingVersion, StableId,
};

/// Source of truth mapping stable identifiers to locally resolved handles.
///
/// Cloning produces another handle onto the same table: the network I/O thread
/// and the simulation thread may both hold one. Every mutation goes through a
/// single coarse lock.
#[derive(Clone)]
pub struct IdentityMappingStore {
    table: Arc<RwLock<MappingTable>>,
}

impl Default for IdentityMappingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityMappingStore {
    pub fn new() -> Self {
        Self {
            table: Arc::new(RwLock::new(MappingTable::new())),
        }
    }

    fn read(&self, operation: &'static str) -> Result<RwLockReadGuard<'_, MappingTable>, MappingError> {
        self.table
            .read()
            .map_err(|_| MappingError::LockPoisoned { operation })
    }

    fn write(&self, operation: &'static str) -> Result<RwLockWriteGuard<'_, MappingTable>, MappingError> {
        self.table
            .write()
            .map_err(|_| MappingError::LockPoisoned { operation })
    }

    // Reads

    pub fn current_version(&self) -> Result<MappingVersion, MappingError> {
        Ok(self.read("current_version")?.version)
    }

    pub fn len(&self) -> Result<usize, MappingError> {
        Ok(self.read("len")?.by_address.len())
    }

    pub fn is_empty(&self) -> Result<bool, MappingError> {
        Ok(self.len()? == 0)
    }

    /// Returns the local handle known for `stable_id`, or `None` while it is unresolved.
    pub fn resolve_local(&self, stable_id: &StableId) -> Result<Option<Handle>, MappingError> {
        let table = self.read("resolve_local")?;
        if let Some(entry) = table
            .by_remote
            .get(&stable_id.handle)
            .and_then(|address| table.by_address.get(address))
        {
            if entry.stable_id == *stable_id {
                return Ok(entry.local_handle);
            }
        }
        Ok(table
            .by_address
            .values()
            .find(|entry| entry.stable_id == *stable_id)
            .and_then(|entry| entry.local_handle))
    }

    pub fn entry(&self, address: &CompoundAddress) -> Result<Option<MappingEntry>, MappingError> {
        Ok(self.read("entry")?.by_address.get(address).cloned())
    }

    /// Looks up the entry the sender referenced by its own handle.
    pub fn entry_for_remote_handle(&self, handle: Handle) -> Result<Option<MappingEntry>, MappingError> {
        let table = self.read("entry_for_remote_handle")?;
        Ok(table
            .by_remote
            .get(&handle)
            .and_then(|address| table.by_address.get(address))
            .cloned())
    }

    pub fn entry_for_local_handle(&self, handle: Handle) -> Result<Option<MappingEntry>, MappingError> {
        let table = self.read("entry_for_local_handle")?;
        Ok(table
            .by_local
            .get(&handle)
            .and_then(|address| table.by_address.get(address))
            .cloned())
    }

    pub fn entries_for_parent(&self, parent: Handle) -> Result<Vec<MappingEntry>, MappingError> {
        let table = self.read("entries_for_parent")?;
        let mut entries: Vec<MappingEntry> = table
            .by_address
            .values()
            .filter(|entry| entry.address.parent == parent)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.address);
        Ok(entries)
    }

    pub fn unresolved(&self) -> Result<Vec<MappingEntry>, MappingError> {
        let table = self.read("unresolved")?;
        let mut entries: Vec<MappingEntry> = table
            .by_address
            .values()
            .filter(|entry| !entry.is_resolved())
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.address);
        Ok(entries)
    }

    /// Copies the whole table, ordered by address.
    pub fn snapshot(&self) -> Result<(MappingVersion, Vec<MappingEntry>), MappingError> {
        let table = self.read("snapshot")?;
        let mut entries: Vec<MappingEntry> = table.by_address.values().cloned().collect();
        entries.sort_by_key(|entry| entry.address);
        Ok((table.version, entries))
    }

    // Local mutations

    /// Records that the local simulation exposes `stable_id` at `address`.
    /// The version advances only when the binding actually changed.
    pub fn record_local_observation(
        &self,
        address: CompoundAddress,
        stable_id: StableId,
    ) -> Result<UpsertResult, MappingError> {
        let mut table = self.write("record_local_observation")?;

        if let Some(existing) = table.by_address.get(&address) {
            if existing.stable_id == stable_id && existing.local_handle == Some(stable_id.handle) {
                return Ok(UpsertResult::Unchanged);
            }
            let existing = existing.clone();
            table.unindex(&existing);
            table.insert(MappingEntry::new_observed(address, stable_id));
            let version = table.bump_version()?;
            return Ok(UpsertResult::Updated(version));
        }

        table.insert(MappingEntry::new_observed(address, stable_id));
        let version = table.bump_version()?;
        Ok(UpsertResult::Added(version))
    }

    /// Removes the entry at `address`, returning it with the version stamped on the removal.
    pub fn remove(
        &self,
        address: &CompoundAddress,
    ) -> Result<Option<(MappingEntry, MappingVersion)>, MappingError> {
        let mut table = self.write("remove")?;
        let Some(removed) = table.by_address.remove(address) else {
            return Ok(None);
        };
        table.unindex(&removed);
        let version = table.bump_version()?;
        Ok(Some((removed, version)))
    }

    /// Binds a resolved local handle. Resolution is local bookkeeping and does not advance the version.
    pub fn bind_local(&self, address: &CompoundAddress, local_handle: Handle) -> Result<(), MappingError> {
        let mut table = self.write("bind_local")?;
        let Some(entry) = table.by_address.get_mut(address) else {
            return Err(MappingError::EntryMissing { address: *address });
        };
        let previous = entry.local_handle.replace(local_handle);
        if let Some(previous) = previous {
            if table.by_local.get(&previous) == Some(address) {
                table.by_local.remove(&previous);
            }
        }
        table.by_local.insert(local_handle, *address);
        Ok(())
    }

    pub fn clear(&self) -> Result<(), MappingError> {
        let mut table = self.write("clear")?;
        *table = MappingTable::new();
        Ok(())
    }

    // Remote mutations

    /// Host → peer full replace. Accepted only if `version` is newer than anything applied so far.
    /// Every accepted entry starts unresolved: it carries the sender's handles, not ours.
    pub fn apply_remote_snapshot(
        &self,
        entries: impl IntoIterator<Item = (CompoundAddress, StableId)>,
        version: MappingVersion,
    ) -> Result<bool, MappingError> {
        let mut table = self.write("apply_remote_snapshot")?;
        if version <= table.version {
            return Ok(false);
        }
        let mut replacement = MappingTable::new();
        for (address, stable_id) in entries {
            replacement.insert(MappingEntry::new_unresolved(address, stable_id));
        }
        replacement.version = version;
        *table = replacement;
        Ok(true)
    }

    /// Incremental batch sharing a single version stamp.
    pub fn apply_remote_batch(
        &self,
        entries: impl IntoIterator<Item = (CompoundAddress, StableId)>,
        version: MappingVersion,
    ) -> Result<bool, MappingError> {
        let mut table = self.write("apply_remote_batch")?;
        if version <= table.version {
            return Ok(false);
        }
        for (address, stable_id) in entries {
            table.upsert_remote(address, stable_id);
        }
        table.version = version;
        Ok(true)
    }

    pub fn apply_remote_change(
        &self,
        version: MappingVersion,
        stable_id: StableId,
        address: CompoundAddress,
    ) -> Result<bool, MappingError> {
        let mut table = self.write("apply_remote_change")?;
        if version <= table.version {
            return Ok(false);
        }
        table.upsert_remote(address, stable_id);
        table.version = version;
        Ok(true)
    }

    /// Accepted removals advance the version even when the address was already absent.
    ///
    /// The entry is only dropped if it still holds `stable_id`; an address
    /// that has since been re-bound to another identity is kept.
    pub fn apply_remote_removal(
        &self,
        version: MappingVersion,
        address: CompoundAddress,
        stable_id: &StableId,
    ) -> Result<bool, MappingError> {
        let mut table = self.write("apply_remote_removal")?;
        if version <= table.version {
            return Ok(false);
        }
        let holds_identity = table
            .by_address
            .get(&address)
            .is_some_and(|entry| entry.stable_id == *stable_id);
        if holds_identity {
            if let Some(removed) = table.by_address.remove(&address) {
                table.unindex(&removed);
            }
        }
        table.version = version;
        Ok(true)
    }
}

struct MappingTable {
    by_address: HashMap<CompoundAddress, MappingEntry>,
    by_remote: HashMap<Handle, CompoundAddress>,
    by_local: HashMap<Handle, CompoundAddress>,
    version: MappingVersion,
}

impl MappingTable {
    fn new() -> Self {
        Self {
            by_address: HashMap::new(),
            by_remote: HashMap::new(),
            by_local: HashMap::new(),
            version: 0,
        }
    }

    fn bump_version(&mut self) -> Result<MappingVersion, MappingError> {
        self.version = self
            .version
            .checked_add(1)
            .ok_or(MappingError::VersionOverflow { version: self.version })?;
        Ok(self.version)
    }

    fn insert(&mut self, entry: MappingEntry) {
        let address = entry.address;
        if entry.remote_handle() != 0 {
            self.by_remote.insert(entry.remote_handle(), address);
        }
        if let Some(local) = entry.local_handle {
            self.by_local.insert(local, address);
        }
        self.by_address.insert(address, entry);
    }

    // handles may have been recycled onto another address since this entry was indexed
    fn unindex(&mut self, entry: &MappingEntry) {
        let address = entry.address;
        if self.by_remote.get(&entry.remote_handle()) == Some(&address) {
            self.by_remote.remove(&entry.remote_handle());
        }
        if let Some(local) = entry.local_handle {
            if self.by_local.get(&local) == Some(&address) {
                self.by_local.remove(&local);
            }
        }
    }

    fn upsert_remote(&mut self, address: CompoundAddress, stable_id: StableId) {
        let mut entry = MappingEntry::new_unresolved(address, stable_id);
        if let Some(existing) = self.by_address.remove(&address) {
            self.unindex(&existing);
            if existing.stable_id == stable_id {
                entry.local_handle = existing.local_handle;
            }
        }
        self.insert(entry);
    }
}
