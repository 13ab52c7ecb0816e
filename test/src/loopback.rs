use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use log::warn;

use roadsync_shared::{CommandInbox, CommandSink, PeerId, SyncMessage};

/// One record as it crossed the loopback hub.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub from: PeerId,
    pub to: PeerId,
    pub message: SyncMessage,
}

/// Reliable, ordered, in-memory command channel between one host and its peers.
#[derive(Default)]
pub struct LoopbackHub {
    host: Mutex<Option<CommandInbox>>,
    peers: Mutex<BTreeMap<PeerId, CommandInbox>>,
    log: Mutex<Vec<Delivery>>,
}

impl LoopbackHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn attach_host(&self, inbox: CommandInbox) {
        *self.host.lock().unwrap() = Some(inbox);
    }

    pub fn attach_peer(&self, peer: PeerId, inbox: CommandInbox) {
        self.peers.lock().unwrap().insert(peer, inbox);
    }

    pub fn detach_peer(&self, peer: PeerId) {
        self.peers.lock().unwrap().remove(&peer);
    }

    pub fn host_link(self: &Arc<Self>) -> Arc<HostLink> {
        Arc::new(HostLink { hub: self.clone() })
    }

    pub fn peer_link(self: &Arc<Self>, peer: PeerId) -> Arc<PeerLink> {
        Arc::new(PeerLink {
            hub: self.clone(),
            peer,
        })
    }

    /// Everything delivered so far, in order.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.log.lock().unwrap().clone()
    }

    pub fn deliveries_to(&self, to: PeerId) -> Vec<Delivery> {
        self.deliveries()
            .into_iter()
            .filter(|delivery| delivery.to == to)
            .collect()
    }

    pub fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }

    /// Whether any inbox still holds undelivered records.
    pub fn has_pending(&self) -> bool {
        let host_pending = self
            .host
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|inbox| !inbox.is_empty());
        host_pending || self.peers.lock().unwrap().values().any(|inbox| !inbox.is_empty())
    }

    fn deliver(&self, from: PeerId, to: PeerId, message: SyncMessage) {
        let inbox = if to.is_host() {
            self.host.lock().unwrap().clone()
        } else {
            self.peers.lock().unwrap().get(&to).cloned()
        };
        let Some(inbox) = inbox else {
            warn!("No inbox for {}, dropping {}", to, message.name());
            return;
        };
        self.log.lock().unwrap().push(Delivery {
            from,
            to,
            message: message.clone(),
        });
        if let Err(err) = inbox.push(from, message) {
            warn!("Delivery to {} failed: {}", to, err);
        }
    }

    fn peer_ids(&self) -> Vec<PeerId> {
        self.peers.lock().unwrap().keys().copied().collect()
    }
}

/// The host's end of the hub. Broadcasts include the host's own loopback.
pub struct HostLink {
    hub: Arc<LoopbackHub>,
}

impl CommandSink for HostLink {
    fn send_to_all(&self, message: SyncMessage) {
        self.hub.deliver(PeerId::HOST, PeerId::HOST, message.clone());
        for peer in self.hub.peer_ids() {
            self.hub.deliver(PeerId::HOST, peer, message.clone());
        }
    }

    fn send_to_peer(&self, peer: PeerId, message: SyncMessage) {
        self.hub.deliver(PeerId::HOST, peer, message);
    }

    fn send_to_host(&self, message: SyncMessage) {
        self.hub.deliver(PeerId::HOST, PeerId::HOST, message);
    }
}

/// A peer's end of the hub. Peers only ever talk to the host.
pub struct PeerLink {
    hub: Arc<LoopbackHub>,
    peer: PeerId,
}

impl CommandSink for PeerLink {
    fn send_to_all(&self, message: SyncMessage) {
        self.hub.deliver(self.peer, PeerId::HOST, message);
    }

    fn send_to_peer(&self, peer: PeerId, message: SyncMessage) {
        warn!("{} cannot message {} directly, dropping {}", self.peer, peer, message.name());
    }

    fn send_to_host(&self, message: SyncMessage) {
        self.hub.deliver(self.peer, PeerId::HOST, message);
    }
}
