use std::{collections::HashSet, default::Default, time::Duration};

use crate::{FeatureKind, Tick, PROTOCOL_VERSION};

/// Contains config properties shared by the host and peer engines
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Ticks an edit lock lives after its last `BeginEdit`
    pub lock_ttl_ticks: Tick,
    /// Minimum spacing between two broadcast snapshot exports. Exports targeted
    /// at a single peer, or triggered by a role change, ignore it.
    pub snapshot_min_interval: Duration,
    /// How often, in ticks, the host drops mapping entries whose parent entity
    /// no longer exists
    pub mapping_validation_interval_ticks: Tick,
    /// Maximum number of drain passes a deferred operation may stay queued.
    /// `None` keeps it until it applies or its entity disappears.
    pub deferred_max_wait_passes: Option<u32>,
    /// Features the host refuses with `feature_disabled`
    pub disabled_features: HashSet<FeatureKind>,
    /// Record set version announced by peers and checked by the host
    pub protocol_version: u16,
}

impl SyncConfig {
    pub fn is_enabled(&self, feature: FeatureKind) -> bool {
        !self.disabled_features.contains(&feature)
    }

    pub fn disable(mut self, feature: FeatureKind) -> Self {
        self.disabled_features.insert(feature);
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            lock_ttl_ticks: 180,
            snapshot_min_interval: Duration::from_secs(1),
            mapping_validation_interval_ticks: 256,
            deferred_max_wait_passes: None,
            disabled_features: HashSet::new(),
            protocol_version: PROTOCOL_VERSION,
        }
    }
}
