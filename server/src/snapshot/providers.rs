use roadsync_shared::{
    BatchApplied, FeatureKind, MappingBatch, MappingRecord, SyncError, SyncMessage, SyncWorld,
    TrafficControlAdapter,
};

use crate::snapshot::provider::{DispatchRoute, SnapshotProvider};

/// Entries per exported feature batch.
pub const EXPORT_CHUNK: usize = 256;

/// Sends the whole identity mapping as one full snapshot. Registered first so
/// peers can resolve handles before feature records arrive.
pub struct MappingSnapshotProvider;

impl<A: TrafficControlAdapter> SnapshotProvider<A> for MappingSnapshotProvider {
    fn name(&self) -> &str {
        "mapping"
    }

    fn export(&self, world: &SyncWorld<A>, route: &mut DispatchRoute<'_>) -> Result<(), SyncError> {
        let (version, entries) = world.mapping().snapshot()?;
        let records = entries
            .into_iter()
            .map(|entry| MappingRecord::new(entry.address, entry.stable_id))
            .collect();
        route.dispatch(SyncMessage::MappingBatch(MappingBatch::snapshot(version, records)));
        Ok(())
    }
}

pub struct FeatureSnapshotProvider {
    feature: FeatureKind,
}

impl FeatureSnapshotProvider {
    pub fn new(feature: FeatureKind) -> Self {
        Self { feature }
    }
}

impl<A: TrafficControlAdapter> SnapshotProvider<A> for FeatureSnapshotProvider {
    fn name(&self) -> &str {
        self.feature.name()
    }

    fn export(&self, world: &SyncWorld<A>, route: &mut DispatchRoute<'_>) -> Result<(), SyncError> {
        if !world.adapter().supports(self.feature) {
            return Ok(());
        }
        let entries = world.adapter().export(self.feature);
        if entries.is_empty() {
            return Ok(());
        }
        let version = world.mapping().current_version()?;
        for chunk in entries.chunks(EXPORT_CHUNK) {
            route.dispatch(SyncMessage::BatchApplied(BatchApplied::new(
                self.feature,
                chunk.to_vec(),
                Some(version),
            )));
        }
        Ok(())
    }
}
