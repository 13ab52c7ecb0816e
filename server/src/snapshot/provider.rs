use log::debug;

use roadsync_shared::{CommandSink, PeerId, SyncError, SyncMessage, SyncWorld, TrafficControlAdapter};

/// Where an export pass sends what providers dispatch: everyone, or exactly one peer.
pub struct DispatchRoute<'a> {
    sink: &'a dyn CommandSink,
    target: Option<PeerId>,
    dispatched: usize,
}

impl<'a> DispatchRoute<'a> {
    pub fn broadcast(sink: &'a dyn CommandSink) -> Self {
        Self {
            sink,
            target: None,
            dispatched: 0,
        }
    }

    pub fn to_peer(sink: &'a dyn CommandSink, peer: PeerId) -> Self {
        Self {
            sink,
            target: Some(peer),
            dispatched: 0,
        }
    }

    pub fn target(&self) -> Option<PeerId> {
        self.target
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn dispatch(&mut self, message: SyncMessage) {
        debug!(
            "Snapshot {} -> {}",
            message.name(),
            self.target.map_or_else(|| "all".to_string(), |peer| peer.to_string())
        );
        match self.target {
            Some(peer) => self.sink.send_to_peer(peer, message),
            None => self.sink.send_to_all(message),
        }
        self.dispatched += 1;
    }
}

/// One feature's contribution to a full-state export.
pub trait SnapshotProvider<A: TrafficControlAdapter>: Send {
    fn name(&self) -> &str;

    /// Dispatches the records describing every entity with non-default state.
    fn export(&self, world: &SyncWorld<A>, route: &mut DispatchRoute<'_>) -> Result<(), SyncError>;

    /// Reserved for bulk ingestion on the peer side.
    fn import(&self, _world: &mut SyncWorld<A>) {}
}
