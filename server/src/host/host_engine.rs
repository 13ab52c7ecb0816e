use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use log::{debug, error, info, warn};

use roadsync_shared::{
    apply_remote, Applied, AppliedOp, BatchApplied, BatchEntry, ChangeObserver, CommandInbox,
    CommandSink, DeferredQueue, FeatureKind, FeatureTarget, FeatureValue, FlushAction, Handle,
    HostType, PeerId, SetRequest, SimulationScheduler, SyncConfig, SyncError, SyncMessage,
    SyncWorld, TrafficControlAdapter, VersionCheck, VersionResult,
};

use crate::{
    events::HostEvent,
    locks::lock_authority,
    mapping::mapping_tracker::MappingTracker,
    request::request_handler::{process_change, rejection_for, RequestOutcome},
    snapshot::{
        dispatcher::{ExportOutcome, ExportReason, SnapshotDispatcher},
        providers::{FeatureSnapshotProvider, MappingSnapshotProvider},
    },
};

/// The authoritative side of a session.
///
/// All state lives here and is only touched from the simulation thread:
/// network threads push into [`CommandInbox`] and `tick` drains it.
pub struct HostEngine<A: TrafficControlAdapter + 'static> {
    config: SyncConfig,
    world: SyncWorld<A>,
    deferred: DeferredQueue<SyncWorld<A>>,
    sink: Arc<dyn CommandSink>,
    inbox: CommandInbox,
    observer: ChangeObserver,
    tracker: MappingTracker,
    snapshots: SnapshotDispatcher<A>,
    events: VecDeque<HostEvent>,
    running: Arc<AtomicBool>,
}

impl<A: TrafficControlAdapter + 'static> HostEngine<A> {
    pub fn new(
        config: SyncConfig,
        adapter: A,
        sink: Arc<dyn CommandSink>,
        scheduler: Arc<dyn SimulationScheduler>,
    ) -> Self {
        let world = SyncWorld::new(adapter, HostType::Server, &config);
        let running = Arc::new(AtomicBool::new(false));

        let observer = {
            let mapping = world.mapping().clone();
            let sink = sink.clone();
            let running = running.clone();
            ChangeObserver::new(scheduler, move |feature: FeatureKind| {
                let mapping = mapping.clone();
                let sink = sink.clone();
                let running = running.clone();
                let flush: FlushAction<BatchEntry> = Arc::new(move |entries: Vec<BatchEntry>| -> Result<(), SyncError> {
                    if !running.load(Ordering::Acquire) {
                        debug!("Host stopped, dropping {} observed {} change(s)", entries.len(), feature);
                        return Ok(());
                    }
                    let version = mapping.current_version()?;
                    sink.send_to_all(SyncMessage::BatchApplied(BatchApplied::new(
                        feature,
                        entries,
                        Some(version),
                    )));
                    Ok(())
                });
                flush
            })
        };

        let mut snapshots = SnapshotDispatcher::new(config.snapshot_min_interval);
        snapshots.register_provider(Box::new(MappingSnapshotProvider));
        for feature in FeatureKind::ALL {
            snapshots.register_provider(Box::new(FeatureSnapshotProvider::new(feature)));
        }

        Self {
            deferred: DeferredQueue::new(config.deferred_max_wait_passes),
            tracker: MappingTracker::new(&config),
            config,
            world,
            sink,
            inbox: CommandInbox::new(),
            observer,
            snapshots,
            events: VecDeque::new(),
            running,
        }
    }

    // Lifecycle

    /// Becomes the host: rebuilds the mapping from the simulation and
    /// broadcasts a snapshot that ignores the rate limit.
    pub fn start(&mut self, now: Instant) {
        info!("Host starting");
        self.clear_state();
        self.running.store(true, Ordering::Release);
        if let Err(err) = self.tracker.sync_all(&self.world) {
            error!("Could not build mapping table: {}", err);
        }
        let outcome = self.snapshots.try_export_if_server(
            true,
            &self.world,
            self.sink.as_ref(),
            ExportReason::RoleChanged,
            now,
        );
        self.events.push_back(HostEvent::SnapshotExported(outcome));
    }

    pub fn stop(&mut self) {
        info!("Host stopping");
        self.running.store(false, Ordering::Release);
        self.clear_state();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn clear_state(&mut self) {
        if let Err(err) = self.world.mapping().clear() {
            warn!("Could not clear mapping: {}", err);
        }
        if let Err(err) = self.world.locks().reset() {
            warn!("Could not clear locks: {}", err);
        }
        if let Err(err) = self.deferred.clear() {
            warn!("Could not clear deferred operations: {}", err);
        }
        self.tracker.reset();
        self.snapshots.reset();
        let _ = self.inbox.drain();
    }

    /// Sends the full state to a newly connected peer.
    pub fn on_peer_joined(&mut self, peer: PeerId) -> ExportOutcome {
        info!("{} joined", peer);
        let outcome = self.snapshots.try_export_for_peer(
            self.is_running(),
            &self.world,
            self.sink.as_ref(),
            peer,
            ExportReason::PeerJoined,
        );
        self.events.push_back(HostEvent::SnapshotExported(outcome));
        outcome
    }

    /// Broadcasts the full state, subject to the rate limit.
    pub fn request_resync(&mut self, now: Instant) -> ExportOutcome {
        let outcome = self.snapshots.try_export_if_server(
            self.is_running(),
            &self.world,
            self.sink.as_ref(),
            ExportReason::Resync,
            now,
        );
        self.events.push_back(HostEvent::SnapshotExported(outcome));
        outcome
    }

    // Accessors

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn world(&self) -> &SyncWorld<A> {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut SyncWorld<A> {
        &mut self.world
    }

    /// Handle for the network thread to push received records into.
    pub fn inbox(&self) -> CommandInbox {
        self.inbox.clone()
    }

    /// Handle for the simulation's mutation hooks.
    pub fn observer(&self) -> ChangeObserver {
        self.observer.clone()
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    pub fn take_events(&mut self) -> Vec<HostEvent> {
        self.events.drain(..).collect()
    }

    // Simulation hooks

    /// Reports a change made through the host's own tools.
    pub fn on_local_change(&self, target: FeatureTarget, value: FeatureValue) -> bool {
        self.observer.observe(target, value)
    }

    /// The sub-entities of `parent` may have changed; they are re-synced on a later tick.
    pub fn observe_parent(&mut self, parent: Handle) {
        self.tracker.mark_dirty(parent);
    }

    pub fn on_parent_released(&mut self, parent: Handle) {
        match self.tracker.release_parent(&self.world, parent) {
            Ok(messages) => self.broadcast_all(messages),
            Err(err) => warn!("Could not release parent {}: {}", parent, err),
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

        if !self.is_running() {
            return;
        }

        match lock_authority::tick(self.world.locks(), self.sink.as_ref()) {
            Ok(expired) => self
                .events
                .extend(expired.into_iter().map(|target| HostEvent::LockCleared { target })),
            Err(err) => error!("Lock tick failed: {}", err),
        }

        match self.tracker.tick(&self.world) {
            Ok(messages) => self.broadcast_all(messages),
            Err(err) => error!("Mapping tracker tick failed: {}", err),
        }

        if let Err(err) = self.deferred.drain(&mut self.world) {
            error!("Deferred drain failed: {}", err);
        }
    }

    fn broadcast_all(&self, messages: Vec<SyncMessage>) {
        for message in messages {
            self.sink.send_to_all(message);
        }
    }

    // Messages

    pub fn handle_message(&mut self, sender: PeerId, message: SyncMessage) {
        if !self.is_running() {
            debug!("Host not running, ignoring {} from {}", message.name(), sender);
            return;
        }

        match message {
            SyncMessage::SetRequest(request) => {
                self.handle_set_request(sender, &request);
            }
            SyncMessage::Applied(applied) => self.handle_applied(sender, applied),
            SyncMessage::BatchApplied(batch) => {
                for applied in batch.applied_records() {
                    self.handle_applied(sender, applied);
                }
            }
            SyncMessage::BeginEditRequest(edit) => {
                match lock_authority::begin_edit(self.world.locks(), self.sink.as_ref(), sender, edit.target) {
                    Ok(grant) => self.events.push_back(HostEvent::LockGranted {
                        target: edit.target,
                        owner: grant.owner,
                    }),
                    Err(err) => error!("BeginEdit on {} from {} failed: {}", edit.target, sender, err),
                }
            }
            SyncMessage::EndEditRequest(edit) => {
                match lock_authority::end_edit(self.world.locks(), self.sink.as_ref(), edit.target) {
                    Ok(_) => self
                        .events
                        .push_back(HostEvent::LockCleared { target: edit.target }),
                    Err(err) => error!("EndEdit on {} from {} failed: {}", edit.target, sender, err),
                }
            }
            SyncMessage::VersionCheck(check) => {
                self.handle_version_check(sender, check);
            }
            other => {
                debug!("Host ignores {} from {}", other.name(), sender);
            }
        }
    }

    /// Answers a peer's announced protocol version. The reply always goes
    /// back to `sender`; a mismatch is also surfaced as an event.
    pub fn handle_version_check(&mut self, sender: PeerId, check: VersionCheck) -> VersionResult {
        let result = VersionResult::new(self.config.protocol_version, check.protocol_version);
        if result.accepted {
            info!("{} speaks protocol v{}", sender, check.protocol_version);
        } else {
            warn!(
                "{} speaks protocol v{}, host speaks v{}",
                sender, check.protocol_version, self.config.protocol_version
            );
            self.events.push_back(HostEvent::VersionMismatch {
                peer: sender,
                peer_version: check.protocol_version,
                host_version: self.config.protocol_version,
            });
        }
        self.sink.send_to_peer(sender, SyncMessage::VersionResult(result));
        result
    }

    /// Runs one change request through validation, apply and read-back.
    /// Success is broadcast to everyone, failure goes back to `sender` alone.
    pub fn handle_set_request(&mut self, sender: PeerId, request: &SetRequest) -> RequestOutcome {
        if !self.is_running() {
            return RequestOutcome::Ignored;
        }
        match process_change(&mut self.world, &self.config, &request.target, &request.value) {
            Ok(applied) => {
                debug!("{} from {} applied on {}", request.feature(), sender, applied.target);
                self.sink.send_to_all(SyncMessage::Applied(applied.clone()));
                self.events.push_back(HostEvent::RequestApplied {
                    sender,
                    applied: applied.clone(),
                });
                RequestOutcome::Applied(applied)
            }
            Err(err) => {
                let rejection = rejection_for(&err, &request.target);
                warn!(
                    "Rejecting {} from {} on {}: {} ({})",
                    request.feature(),
                    sender,
                    request.target,
                    rejection.reason,
                    err
                );
                self.sink
                    .send_to_peer(sender, SyncMessage::RequestRejected(rejection.clone()));
                self.events.push_back(HostEvent::RequestRejected {
                    sender,
                    rejection: rejection.clone(),
                });
                RequestOutcome::Rejected(rejection)
            }
        }
    }

    fn handle_applied(&mut self, sender: PeerId, applied: Applied) {
        if sender.is_host() {
            // loopback of our own broadcast
            let result = apply_remote(&mut self.world, &applied);
            if result.is_deferred() {
                if let Err(err) = self.deferred.enqueue(Box::new(AppliedOp::new(applied))) {
                    error!("Could not defer loopback apply: {}", err);
                }
            }
            return;
        }

        // a peer reporting a change it observed: same pipeline as a request, no reply
        match process_change(&mut self.world, &self.config, &applied.target, &applied.value) {
            Ok(confirmed) => self.sink.send_to_all(SyncMessage::Applied(confirmed)),
            Err(err) => {
                warn!("Dropping {} notice from {}: {}", applied.feature(), sender, err);
                self.events.push_back(HostEvent::NoticeDropped {
                    sender,
                    target: applied.target.primary(),
                });
            }
        }
    }
}
