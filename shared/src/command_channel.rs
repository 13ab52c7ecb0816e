use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use crate::{commands::sync_message::SyncMessage, error::SyncError, PeerId};

/// Outbound side of the reliable, ordered command channel.
pub trait CommandSink: Send + Sync {
    /// Every participant, the sender's own loopback included.
    fn send_to_all(&self, message: SyncMessage);

    fn send_to_peer(&self, peer: PeerId, message: SyncMessage);

    fn send_to_host(&self, message: SyncMessage);
}

/// Inbound records waiting to be handled on the simulation thread.
///
/// The network I/O thread holds a clone and only ever pushes; the engine that
/// owns the inbox drains it during its tick.
#[derive(Clone, Default)]
pub struct CommandInbox {
    queue: Arc<Mutex<VecDeque<(PeerId, SyncMessage)>>>,
}

impl CommandInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, sender: PeerId, message: SyncMessage) -> Result<(), SyncError> {
        let mut queue = self.queue.lock().map_err(|_| SyncError::LockPoisoned {
            structure: "command inbox",
        })?;
        queue.push_back((sender, message));
        Ok(())
    }

    pub fn drain(&self) -> Result<Vec<(PeerId, SyncMessage)>, SyncError> {
        let mut queue = self.queue.lock().map_err(|_| SyncError::LockPoisoned {
            structure: "command inbox",
        })?;
        Ok(queue.drain(..).collect())
    }

    pub fn len(&self) -> usize {
        self.queue.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
