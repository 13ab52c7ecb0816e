use std::{collections::VecDeque, sync::Arc};

use log::{debug, error, info, trace, warn};

use roadsync_shared::{
    apply_remote, host_target, host_value, Applied, AppliedOp, BatchEntry, ChangeObserver, CommandInbox,
    CommandSink, DeferredQueue, DrainReport, EditTarget, EntityRef, FeatureKind, FeatureTarget,
    FeatureValue, FlushAction, HostType, MappingBatch, MappingError, MappingVersion, PeerId, SetRequest,
    SimulationScheduler, SyncConfig, SyncError, SyncMessage, SyncWorld, TrafficControlAdapter,
    VersionCheck, VersionResult,
};

use crate::events::PeerEvent;

/// A connected, non-authoritative participant.
///
/// Mirrors the host's identity mapping and edit locks, replays confirmed
/// changes (deferring the ones whose mapping has not arrived yet) and turns
/// local edits into requests to the host.
pub struct PeerEngine<A: TrafficControlAdapter + 'static> {
    id: PeerId,
    protocol_version: u16,
    world: SyncWorld<A>,
    deferred: DeferredQueue<SyncWorld<A>>,
    sink: Arc<dyn CommandSink>,
    inbox: CommandInbox,
    observer: ChangeObserver,
    events: VecDeque<PeerEvent>,
}

impl<A: TrafficControlAdapter + 'static> PeerEngine<A> {
    pub fn new(
        id: PeerId,
        config: SyncConfig,
        adapter: A,
        sink: Arc<dyn CommandSink>,
        scheduler: Arc<dyn SimulationScheduler>,
    ) -> Self {
        let world = SyncWorld::new(adapter, HostType::Client, &config);

        let observer = {
            let mapping = world.mapping().clone();
            let sink = sink.clone();
            ChangeObserver::new(scheduler, move |feature: FeatureKind| {
                let mapping = mapping.clone();
                let sink = sink.clone();
                let flush: FlushAction<BatchEntry> =
                    Arc::new(move |entries: Vec<BatchEntry>| -> Result<(), SyncError> {
                        trace!("Requesting {} {} change(s) from host", entries.len(), feature);
                        for entry in entries {
                            let target = host_target(&mapping, &entry.target)?;
                            let value = host_value(&mapping, &entry.value)?;
                            sink.send_to_host(SyncMessage::SetRequest(SetRequest::new(target, value)));
                        }
                        Ok(())
                    });
                flush
            })
        };

        Self {
            id,
            protocol_version: config.protocol_version,
            deferred: DeferredQueue::new(config.deferred_max_wait_passes),
            world,
            sink,
            inbox: CommandInbox::new(),
            observer,
            events: VecDeque::new(),
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn world(&self) -> &SyncWorld<A> {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut SyncWorld<A> {
        &mut self.world
    }

    pub fn inbox(&self) -> CommandInbox {
        self.inbox.clone()
    }

    pub fn observer(&self) -> ChangeObserver {
        self.observer.clone()
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    pub fn take_events(&mut self) -> Vec<PeerEvent> {
        self.events.drain(..).collect()
    }

    /// Forgets everything learned from the host, e.g. after a disconnect.
    pub fn reset(&mut self) {
        info!("{} resetting sync state", self.id);
        if let Err(err) = self.world.mapping().clear() {
            warn!("Could not clear mapping: {}", err);
        }
        if let Err(err) = self.world.locks().reset() {
            warn!("Could not clear lock mirror: {}", err);
        }
        if let Err(err) = self.deferred.clear() {
            warn!("Could not clear deferred operations: {}", err);
        }
        self.events.clear();
        let _ = self.inbox.drain();
    }

    // Outbound

    /// Tells the host which record set this peer speaks. Sent once on joining.
    pub fn announce_version(&self) {
        debug!("{} announcing protocol v{}", self.id, self.protocol_version);
        self.sink
            .send_to_host(SyncMessage::VersionCheck(VersionCheck::new(self.protocol_version)));
    }

    /// Reports a change made through this peer's tools; batched into requests.
    pub fn on_local_change(&self, target: FeatureTarget, value: FeatureValue) -> bool {
        self.observer.observe(target, value)
    }

    /// Sends a single request right away, bypassing the batcher.
    pub fn request_change(&self, target: FeatureTarget, value: FeatureValue) -> Result<(), SyncError> {
        let target = self.world.to_host_target(&target)?;
        let value = self.world.to_host_value(&value)?;
        self.sink
            .send_to_host(SyncMessage::SetRequest(SetRequest::new(target, value)));
        Ok(())
    }

    pub fn begin_edit(&self, target: EntityRef) {
        self.sink
            .send_to_host(SyncMessage::BeginEditRequest(EditTarget::new(target)));
    }

    pub fn end_edit(&self, target: EntityRef) {
        self.sink
            .send_to_host(SyncMessage::EndEditRequest(EditTarget::new(target)));
    }

    pub fn is_locked(&self, target: &EntityRef) -> bool {
        self.world.locks().try_is_locked(target).unwrap_or(false)
    }

    /// Whether someone else is editing `target`, for gating local input.
    pub fn is_locked_by_other(&self, target: &EntityRef) -> bool {
        match self.world.locks().is_locked_by_other(target, self.id) {
            Ok(locked) => locked,
            Err(err) => {
                warn!("Cannot read lock mirror: {}", err);
                false
            }
        }
    }

    // Tick

    pub fn tick(&mut self) {
        match self.inbox.drain() {
            Ok(received) => {
                for (sender, message) in received {
                    self.handle_message(sender, message);
                }
            }
            Err(err) => error!("Cannot read inbox: {}", err),
        }

        if let Err(err) = self.world.locks().tick() {
            error!("Lock mirror tick failed: {}", err);
        }

        // entities announced earlier may have been created locally since
        if !self.deferred.is_empty() {
            if let Err(err) = self.world.resolve_pending() {
                error!("Re-resolution failed: {}", err);
            }
        }
        self.drain_deferred();
    }

    fn drain_deferred(&mut self) -> DrainReport {
        match self.deferred.drain(&mut self.world) {
            Ok(report) => report,
            Err(err) => {
                error!("Deferred drain failed: {}", err);
                DrainReport::default()
            }
        }
    }

    // Inbound

    pub fn handle_message(&mut self, sender: PeerId, message: SyncMessage) {
        if !sender.is_host() {
            warn!("{} ignoring {} from non-host {}", self.id, message.name(), sender);
            return;
        }

        match message {
            SyncMessage::SetRequest(_)
            | SyncMessage::BeginEditRequest(_)
            | SyncMessage::EndEditRequest(_)
            | SyncMessage::VersionCheck(_) => {
                debug!("Ignoring request: {}", SyncError::NotHost { operation: message.name() });
            }
            SyncMessage::MappingBatch(batch) => self.handle_mapping_batch(batch),
            SyncMessage::MappingChanged(changed) => {
                let accepted = self.world.mapping().apply_remote_change(
                    changed.version,
                    changed.stable_id,
                    changed.address,
                );
                self.after_mapping(accepted, changed.version);
            }
            SyncMessage::MappingRemoved(removed) => {
                let accepted = self
                    .world
                    .mapping()
                    .apply_remote_removal(removed.version, removed.address, &removed.stable_id);
                self.after_mapping(accepted, removed.version);
            }
            SyncMessage::Applied(applied) => self.apply_or_defer(applied),
            SyncMessage::BatchApplied(batch) => {
                for applied in batch.applied_records() {
                    self.apply_or_defer(applied);
                }
            }
            SyncMessage::RequestRejected(rejection) => {
                warn!(
                    "Host rejected our request: {} on {:?}",
                    rejection.reason,
                    rejection.entity()
                );
                self.events.push_back(PeerEvent::Rejected(rejection));
            }
            SyncMessage::EditLockApplied(lock) => {
                match self.world.locks().apply_mirror(lock.target, lock.owner, lock.ttl) {
                    Ok(()) => self.events.push_back(PeerEvent::LockApplied {
                        target: lock.target,
                        owner: lock.owner,
                    }),
                    Err(err) => error!("Cannot mirror lock on {}: {}", lock.target, err),
                }
            }
            SyncMessage::EditLockCleared(edit) => match self.world.locks().clear_mirror(&edit.target) {
                Ok(()) => self
                    .events
                    .push_back(PeerEvent::LockCleared { target: edit.target }),
                Err(err) => error!("Cannot clear mirrored lock on {}: {}", edit.target, err),
            },
            SyncMessage::VersionResult(result) => self.handle_version_result(result),
        }
    }

    fn handle_version_result(&mut self, result: VersionResult) {
        if result.accepted {
            debug!("{} protocol v{} accepted by host", self.id, result.peer_version);
            return;
        }
        error!(
            "{} speaks protocol v{} but the host speaks v{}",
            self.id, result.peer_version, result.host_version
        );
        self.events.push_back(PeerEvent::VersionMismatch {
            host_version: result.host_version,
            local_version: result.peer_version,
        });
    }

    fn handle_mapping_batch(&mut self, batch: MappingBatch) {
        let mapping = self.world.mapping();
        let accepted = if batch.is_full_snapshot {
            mapping.apply_remote_snapshot(batch.pairs(), batch.version)
        } else {
            mapping.apply_remote_batch(batch.pairs(), batch.version)
        };
        if matches!(accepted, Ok(true)) {
            debug!(
                "Accepted mapping {} v{} with {} entries",
                if batch.is_full_snapshot { "snapshot" } else { "batch" },
                batch.version,
                batch.entries.len()
            );
        }
        self.after_mapping(accepted, batch.version);
    }

    /// Re-resolves local handles and retries deferred applies once mapping state moved.
    fn after_mapping(&mut self, accepted: Result<bool, MappingError>, version: MappingVersion) {
        match accepted {
            Ok(true) => {}
            Ok(false) => {
                let current = self.world.mapping().current_version().unwrap_or(version);
                debug!("Ignoring mapping record: {}", SyncError::StaleVersion { received: version, current });
                return;
            }
            Err(err) => {
                error!("Cannot apply mapping record v{}: {}", version, err);
                return;
            }
        }

        let resolved = match self.world.resolve_pending() {
            Ok(report) => report.resolved,
            Err(err) => {
                error!("Re-resolution failed: {}", err);
                0
            }
        };
        self.events
            .push_back(PeerEvent::MappingUpdated { version, resolved });
        self.drain_deferred();
    }

    fn apply_or_defer(&mut self, applied: Applied) {
        let result = apply_remote(&mut self.world, &applied);
        if result.is_deferred() {
            let (feature, target) = (applied.feature(), applied.target);
            if let Err(err) = self.deferred.enqueue(Box::new(AppliedOp::new(applied))) {
                error!("Could not defer {} on {}: {}", feature, target, err);
            }
        }
    }
}
