/// Peer → host: sent once on joining, before any request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct VersionCheck {
    pub protocol_version: u16,
}

impl VersionCheck {
    pub fn new(protocol_version: u16) -> Self {
        Self { protocol_version }
    }
}

/// Host → the peer that asked: whether both sides speak the same record set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct VersionResult {
    pub accepted: bool,
    pub host_version: u16,
    pub peer_version: u16,
}

impl VersionResult {
    pub fn new(host_version: u16, peer_version: u16) -> Self {
        Self {
            accepted: host_version == peer_version,
            host_version,
            peer_version,
        }
    }
}
