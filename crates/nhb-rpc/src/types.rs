use serde::{Deserialize, Serialize};

/// JSON-serializable account summary returned by `nhb_getAccount`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcAccount {
    pub address: String,
    pub nonce: u64,
    /// u128 balances are carried as decimal strings; JSON numbers lose
    /// precision above 2^53.
    pub balance_nhb: String,
    pub balance_znhb: String,
    pub stake: String,
    pub engagement_score: u64,
    pub username: Option<String>,
    pub roles: Vec<String>,
}

/// JSON-serializable block summary returned by `nhb_getBlockByHeight`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcBlock {
    pub height: u64,
    pub timestamp: i64,
    pub hash: String,
    pub prev_hash: String,
    pub tx_root: String,
    pub state_root: String,
    pub validator: String,
    pub tx_count: usize,
    /// Hex-encoded `bincode(Transaction)` for each transaction, in order.
    pub transactions: Vec<String>,
}

/// A single validator's standing, as returned in `nhb_getValidatorSet`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcValidator {
    pub address: String,
    pub power: String,
}

/// The full active roster returned by `nhb_getValidatorSet`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcValidatorSet {
    pub validators: Vec<RpcValidator>,
    pub total_power: String,
}

/// Aggregate on-chain statistics returned by `nhb_getChainStats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcChainStats {
    pub height: u64,
    pub tip_hash: String,
    pub validator_count: usize,
    pub total_stake: String,
    pub mempool_size: usize,
}

/// A single native token entry as declared at genesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcNativeToken {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

/// Protocol/genesis constants returned by `nhb_getGenesisInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcGenesisInfo {
    pub chain_id: u64,
    pub genesis_time: i64,
    pub genesis_hash: String,
    pub native_tokens: Vec<RpcNativeToken>,
}

/// P2P network identity returned by `nhb_getNetworkInfo`.
/// `peer_multiaddr` is the full libp2p multiaddress (including `/p2p/<PeerId>`)
/// that other nodes should pass as a bootstrap peer to connect to this node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcNetworkInfo {
    pub peer_multiaddr: String,
    pub chain_id: u64,
}

/// Node / protocol version information returned by `nhb_getVersion`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcVersionInfo {
    pub node_version: String,
    pub protocol_version: String,
    pub api_version: String,
}

/// Result of `nhb_simulateTransaction`: whether the transaction would be
/// accepted against the current committed state, without ever touching it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcSimulateResult {
    pub success: bool,
    pub error: Option<String>,
    pub events_emitted: usize,
    pub resulting_state_root: Option<String>,
}
