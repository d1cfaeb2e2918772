use serde::{Deserialize, Serialize};

/// Messages exchanged over the node's gossip network. Each variant carries
/// a bincode-encoded payload the consensus/mempool layer decodes; this crate
/// never inspects `payload` itself, only moves it between peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum P2pMessage {
    /// A peer is broadcasting a signed transaction (bincode `Transaction`).
    Tx { payload: Vec<u8> },
    /// A peer is broadcasting a block proposal (bincode-encoded, external
    /// consensus engine's wire format).
    Proposal { payload: Vec<u8> },
    /// A peer is broadcasting a vote on a proposal (bincode-encoded,
    /// external consensus engine's wire format).
    Vote { payload: Vec<u8> },
}

impl P2pMessage {
    /// Serialize to bytes for GossipSub propagation.
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("P2pMessage serialization is infallible")
    }

    /// Deserialize from GossipSub bytes. A decode failure here means the
    /// outer envelope itself is corrupt; callers drop such messages
    /// silently rather than surfacing them, since there's no message kind
    /// to even name in a warning.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}
