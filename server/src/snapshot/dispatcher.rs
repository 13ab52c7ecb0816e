use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

use log::{debug, info, warn};

use roadsync_shared::{CommandSink, PeerId, SyncWorld, TrafficControlAdapter};

use crate::snapshot::provider::{DispatchRoute, SnapshotProvider};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportReason {
    /// This process just became the host
    RoleChanged,
    PeerJoined,
    Resync,
}

impl ExportReason {
    pub fn bypasses_rate_limit(&self) -> bool {
        matches!(self, ExportReason::RoleChanged)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    Exported {
        target: Option<PeerId>,
        messages: usize,
        failed_providers: usize,
    },
    SkippedNotHost,
    SkippedNotReady,
    RateLimited,
}

/// Runs every registered provider to bring peers up to date.
pub struct SnapshotDispatcher<A: TrafficControlAdapter> {
    providers: Vec<Box<dyn SnapshotProvider<A>>>,
    min_interval: Duration,
    // held for the whole export pass
    last_broadcast: Mutex<Option<Instant>>,
}

impl<A: TrafficControlAdapter> SnapshotDispatcher<A> {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            providers: Vec::new(),
            min_interval,
            last_broadcast: Mutex::new(None),
        }
    }

    /// Providers run in registration order.
    pub fn register_provider(&mut self, provider: Box<dyn SnapshotProvider<A>>) {
        debug!("Snapshot provider '{}' registered", provider.name());
        self.providers.push(provider);
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|provider| provider.name()).collect()
    }

    /// Broadcast export, at most once per `min_interval` unless `reason` bypasses the limit.
    pub fn try_export_if_server(
        &self,
        is_host: bool,
        world: &SyncWorld<A>,
        sink: &dyn CommandSink,
        reason: ExportReason,
        now: Instant,
    ) -> ExportOutcome {
        if let Some(skipped) = Self::precheck(is_host, world) {
            return skipped;
        }
        let mut last_broadcast = match self.last_broadcast.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !reason.bypasses_rate_limit() {
            if let Some(last) = *last_broadcast {
                if now.saturating_duration_since(last) < self.min_interval {
                    debug!("Snapshot export ({:?}) rate limited", reason);
                    return ExportOutcome::RateLimited;
                }
            }
        }
        *last_broadcast = Some(now);
        self.run(world, DispatchRoute::broadcast(sink), reason)
    }

    /// Export addressed to `peer` alone. Never rate limited.
    pub fn try_export_for_peer(
        &self,
        is_host: bool,
        world: &SyncWorld<A>,
        sink: &dyn CommandSink,
        peer: PeerId,
        reason: ExportReason,
    ) -> ExportOutcome {
        if let Some(skipped) = Self::precheck(is_host, world) {
            return skipped;
        }
        let _section = match self.last_broadcast.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.run(world, DispatchRoute::to_peer(sink, peer), reason)
    }

    pub fn reset(&self) {
        if let Ok(mut last_broadcast) = self.last_broadcast.lock() {
            *last_broadcast = None;
        }
    }

    fn precheck(is_host: bool, world: &SyncWorld<A>) -> Option<ExportOutcome> {
        if !is_host {
            return Some(ExportOutcome::SkippedNotHost);
        }
        if !world.adapter().is_ready() {
            debug!("Snapshot export skipped, adapter not ready");
            return Some(ExportOutcome::SkippedNotReady);
        }
        None
    }

    fn run(&self, world: &SyncWorld<A>, mut route: DispatchRoute<'_>, reason: ExportReason) -> ExportOutcome {
        let mut failed_providers = 0;
        for provider in &self.providers {
            if let Err(err) = provider.export(world, &mut route) {
                warn!("Snapshot provider '{}' failed: {}", provider.name(), err);
                failed_providers += 1;
            }
        }
        info!(
            "Snapshot exported ({:?}) to {}: {} record(s)",
            reason,
            route.target().map_or_else(|| "all".to_string(), |peer| peer.to_string()),
            route.dispatched()
        );
        ExportOutcome::Exported {
            target: route.target(),
            messages: route.dispatched(),
            failed_providers,
        }
    }
}
