use std::collections::{HashSet, VecDeque};

use log::{debug, info};

use roadsync_shared::{
    CompoundAddress, EntityRef, Handle, MappingChanged, MappingError, MappingRemoved,
    MappingVersion, StableId, SyncConfig, SyncMessage, SyncWorld, Tick, TrafficControlAdapter,
};

/// Parents re-synced per tick; the rest stay dirty until the next tick.
pub const PARENTS_PER_TICK: usize = 256;

/// Keeps the host's mapping table in line with the sub-entities the simulation exposes.
///
/// Every method returns the mapping records to broadcast; the caller decides
/// whether to send them (they are pointless right before a full snapshot).
pub struct MappingTracker {
    dirty: VecDeque<Handle>,
    dirty_set: HashSet<Handle>,
    validation_interval: Tick,
    ticks_since_validation: Tick,
}

impl MappingTracker {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            dirty: VecDeque::new(),
            dirty_set: HashSet::new(),
            validation_interval: config.mapping_validation_interval_ticks.max(1),
            ticks_since_validation: 0,
        }
    }

    /// Queues `parent` to be re-synced on a later tick.
    pub fn mark_dirty(&mut self, parent: Handle) {
        if self.dirty_set.insert(parent) {
            self.dirty.push_back(parent);
        }
    }

    pub fn dirty_len(&self) -> usize {
        self.dirty.len()
    }

    pub fn reset(&mut self) {
        self.dirty.clear();
        self.dirty_set.clear();
        self.ticks_since_validation = 0;
    }

    pub fn sync_parent<A: TrafficControlAdapter>(
        &self,
        world: &SyncWorld<A>,
        parent: Handle,
    ) -> Result<Vec<SyncMessage>, MappingError> {
        if !world.adapter().entity_exists(&EntityRef::segment(parent)) {
            return self.release_parent(world, parent);
        }

        let mapping = world.mapping();
        let children = world.adapter().children(parent);
        let mut messages = Vec::new();

        for (sub_index, stable_id) in &children {
            if !stable_id.is_valid() {
                continue;
            }
            let address = CompoundAddress::new(parent, *sub_index);
            let result = mapping.record_local_observation(address, *stable_id)?;
            if let Some(version) = result.version() {
                messages.push(SyncMessage::MappingChanged(MappingChanged {
                    address,
                    stable_id: *stable_id,
                    version,
                }));
            }
        }

        // a slot whose child lost its identity no longer backs an entry
        let live: HashSet<u16> = children
            .iter()
            .filter(|(_, stable_id)| stable_id.is_valid())
            .map(|(sub_index, _)| *sub_index)
            .collect();
        for entry in mapping.entries_for_parent(parent)? {
            if live.contains(&entry.address.sub_index) {
                continue;
            }
            if let Some((removed, version)) = mapping.remove(&entry.address)? {
                messages.push(removal(&removed.address, removed.stable_id, version));
            }
        }

        Ok(messages)
    }

    /// Observes every parent the simulation currently has.
    pub fn sync_all<A: TrafficControlAdapter>(
        &mut self,
        world: &SyncWorld<A>,
    ) -> Result<Vec<SyncMessage>, MappingError> {
        self.reset();
        let mut messages = Vec::new();
        for parent in world.adapter().parents() {
            messages.extend(self.sync_parent(world, parent)?);
        }
        info!(
            "Mapping rebuilt: {} entries at version {}",
            world.mapping().len()?,
            world.mapping().current_version()?
        );
        Ok(messages)
    }

    /// Drops every entry under `parent`.
    pub fn release_parent<A: TrafficControlAdapter>(
        &self,
        world: &SyncWorld<A>,
        parent: Handle,
    ) -> Result<Vec<SyncMessage>, MappingError> {
        let mapping = world.mapping();
        let mut messages = Vec::new();
        for entry in mapping.entries_for_parent(parent)? {
            if let Some((removed, version)) = mapping.remove(&entry.address)? {
                messages.push(removal(&removed.address, removed.stable_id, version));
            }
        }
        if !messages.is_empty() {
            debug!("Released {} mapping entries of parent {}", messages.len(), parent);
        }
        Ok(messages)
    }

    /// Removes entries whose parent no longer exists.
    pub fn prune<A: TrafficControlAdapter>(
        &self,
        world: &SyncWorld<A>,
    ) -> Result<Vec<SyncMessage>, MappingError> {
        let (_, entries) = world.mapping().snapshot()?;
        let mut orphaned: Vec<Handle> = entries
            .iter()
            .map(|entry| entry.address.parent)
            .filter(|parent| !world.adapter().entity_exists(&EntityRef::segment(*parent)))
            .collect();
        orphaned.dedup();

        let mut messages = Vec::new();
        for parent in orphaned {
            messages.extend(self.release_parent(world, parent)?);
        }
        Ok(messages)
    }

    /// Re-syncs up to [`PARENTS_PER_TICK`] dirty parents and periodically prunes.
    pub fn tick<A: TrafficControlAdapter>(
        &mut self,
        world: &SyncWorld<A>,
    ) -> Result<Vec<SyncMessage>, MappingError> {
        let mut messages = Vec::new();
        for _ in 0..PARENTS_PER_TICK {
            let Some(parent) = self.dirty.pop_front() else {
                break;
            };
            self.dirty_set.remove(&parent);
            messages.extend(self.sync_parent(world, parent)?);
        }

        self.ticks_since_validation += 1;
        if self.ticks_since_validation >= self.validation_interval {
            self.ticks_since_validation = 0;
            messages.extend(self.prune(world)?);
        }
        Ok(messages)
    }
}

fn removal(address: &CompoundAddress, stable_id: StableId, version: MappingVersion) -> SyncMessage {
    SyncMessage::MappingRemoved(MappingRemoved {
        address: *address,
        stable_id,
        version,
    })
}
