use crate::{
    adapter::TrafficControlAdapter,
    commands::feature::{FeatureTarget, FeatureValue, LaneRef, LaneSet},
    identity::{
        error::MappingError,
        mapping_store::IdentityMappingStore,
        resolver::{self, ResolutionReport},
    },
    locks::lock_registry::EntityLockRegistry,
    EntityRef, HostType, SyncConfig,
};

/// A target (or value) translated into this participant's handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Localized<T = FeatureTarget> {
    Ready(T),
    /// Known to the mapping but not observed locally yet.
    Pending,
    /// Referenced entity does not exist here.
    Missing(EntityRef),
}

/// The state a synchronization engine mutates: the simulation behind its
/// adapter, the identity mapping and the edit locks.
pub struct SyncWorld<A: TrafficControlAdapter> {
    adapter: A,
    mapping: IdentityMappingStore,
    locks: EntityLockRegistry,
}

impl<A: TrafficControlAdapter> SyncWorld<A> {
    pub fn new(adapter: A, host_type: HostType, config: &SyncConfig) -> Self {
        Self {
            adapter,
            mapping: IdentityMappingStore::new(),
            locks: EntityLockRegistry::new(host_type, config.lock_ttl_ticks),
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn mapping(&self) -> &IdentityMappingStore {
        &self.mapping
    }

    pub fn locks(&self) -> &EntityLockRegistry {
        &self.locks
    }

    pub fn resolve_pending(&self) -> Result<ResolutionReport, MappingError> {
        resolver::resolve_pending(&self.mapping, &self.adapter)
    }

    /// First referenced entity that does not exist locally.
    pub fn missing_entity(&self, target: &FeatureTarget) -> Option<EntityRef> {
        self.first_missing(&target.entities())
    }

    /// First entity touched by setting `value` on `target` that does not exist locally.
    pub fn missing_in_change(&self, target: &FeatureTarget, value: &FeatureValue) -> Option<EntityRef> {
        self.first_missing(&value.entities_with(target))
    }

    fn first_missing(&self, entities: &[EntityRef]) -> Option<EntityRef> {
        entities
            .iter()
            .find(|entity| !self.adapter.entity_exists(entity))
            .copied()
    }

    /// Translates `target`, as sent by a remote participant, into local handles.
    ///
    /// Lanes are looked up by address in the mapping, then directly in the
    /// simulation for lanes the mapping never covered. The sender's lane handle
    /// is never looked up: it is only meaningful on the sender.
    pub fn localize(&self, target: &FeatureTarget) -> Result<Localized, MappingError> {
        let local = match target {
            FeatureTarget::Lane { lane, address } => match self.localize_lane(&LaneRef {
                lane: *lane,
                address: *address,
            })? {
                Localized::Ready(local) => local.target(),
                Localized::Pending => return Ok(Localized::Pending),
                Localized::Missing(entity) => return Ok(Localized::Missing(entity)),
            },
            other => *other,
        };

        match self.missing_entity(&local) {
            Some(missing) => Ok(Localized::Missing(missing)),
            None => Ok(Localized::Ready(local)),
        }
    }

    /// Translates the lanes a value refers to into local handles.
    pub fn localize_value(&self, value: &FeatureValue) -> Result<Localized<FeatureValue>, MappingError> {
        let FeatureValue::LaneConnections(connected) = value else {
            return Ok(Localized::Ready(*value));
        };
        // the first lane that cannot be used decides the outcome
        let localized: Result<LaneSet, Result<Localized<FeatureValue>, MappingError>> =
            connected.try_map(|lane| match self.localize_lane(lane) {
                Ok(Localized::Ready(local)) => Ok(local),
                Ok(Localized::Pending) => Err(Ok(Localized::Pending)),
                Ok(Localized::Missing(entity)) => Err(Ok(Localized::Missing(entity))),
                Err(err) => Err(Err(err)),
            });
        match localized {
            Ok(local) => Ok(Localized::Ready(FeatureValue::LaneConnections(local))),
            Err(unresolved) => unresolved,
        }
    }

    /// Translates a whole change: its target first, then the lanes its value refers to.
    pub fn localize_change(
        &self,
        target: &FeatureTarget,
        value: &FeatureValue,
    ) -> Result<Localized<(FeatureTarget, FeatureValue)>, MappingError> {
        let target = match self.localize(target)? {
            Localized::Ready(target) => target,
            Localized::Pending => return Ok(Localized::Pending),
            Localized::Missing(entity) => return Ok(Localized::Missing(entity)),
        };
        match self.localize_value(value)? {
            Localized::Ready(value) => Ok(Localized::Ready((target, value))),
            Localized::Pending => Ok(Localized::Pending),
            Localized::Missing(entity) => Ok(Localized::Missing(entity)),
        }
    }

    fn localize_lane(&self, lane: &LaneRef) -> Result<Localized<LaneRef>, MappingError> {
        if let Some(entry) = self.mapping.entry(&lane.address)? {
            return Ok(match entry.local_handle {
                Some(local) => Localized::Ready(LaneRef {
                    lane: local,
                    address: entry.address,
                }),
                None => Localized::Pending,
            });
        }
        let found = self
            .adapter
            .children(lane.address.parent)
            .into_iter()
            .find(|(sub_index, _)| *sub_index == lane.address.sub_index);
        Ok(match found {
            Some((_, stable_id)) => Localized::Ready(LaneRef {
                lane: stable_id.handle,
                address: lane.address,
            }),
            None => Localized::Missing(lane.entity()),
        })
    }

    pub fn to_host_target(&self, target: &FeatureTarget) -> Result<FeatureTarget, MappingError> {
        host_target(&self.mapping, target)
    }

    pub fn to_host_value(&self, value: &FeatureValue) -> Result<FeatureValue, MappingError> {
        host_value(&self.mapping, value)
    }
}

/// Translates a locally observed target into the host's handles before it is sent.
/// Lanes the mapping does not know are sent as-is; the host falls back to their address.
pub fn host_target(
    mapping: &IdentityMappingStore,
    target: &FeatureTarget,
) -> Result<FeatureTarget, MappingError> {
    if let FeatureTarget::Lane { lane, address } = target {
        return Ok(host_lane(mapping, &LaneRef {
            lane: *lane,
            address: *address,
        })?
        .target());
    }
    Ok(*target)
}

/// Same as [`host_target`] for the lanes a value refers to.
pub fn host_value(mapping: &IdentityMappingStore, value: &FeatureValue) -> Result<FeatureValue, MappingError> {
    match value {
        FeatureValue::LaneConnections(connected) => Ok(FeatureValue::LaneConnections(
            connected.try_map(|lane| host_lane(mapping, lane))?,
        )),
        other => Ok(*other),
    }
}

fn host_lane(mapping: &IdentityMappingStore, lane: &LaneRef) -> Result<LaneRef, MappingError> {
    Ok(match mapping.entry_for_local_handle(lane.lane)? {
        Some(entry) => LaneRef {
            lane: entry.remote_handle(),
            address: entry.address,
        },
        None => *lane,
    })
}
