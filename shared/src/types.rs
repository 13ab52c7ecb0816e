use std::fmt;

/// Volatile, session-local handle the simulation assigns to an entity.
pub type Handle = u32;
/// Monotonic counter stamping every mutation of the identity mapping table.
pub type MappingVersion = u64;
pub type Tick = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HostType {
    Server,
    Client,
}

impl HostType {
    pub fn is_server(self) -> bool {
        self == HostType::Server
    }
}

/// Identifies a participant of the session. The host is always `PeerId::HOST`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct PeerId(pub u32);

impl PeerId {
    pub const HOST: PeerId = PeerId(0);

    pub fn is_host(&self) -> bool {
        *self == Self::HOST
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_host() {
            write!(f, "host")
        } else {
            write!(f, "peer:{}", self.0)
        }
    }
}
