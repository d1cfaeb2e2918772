use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;

use crate::types::{
    RpcAccount, RpcBlock, RpcChainStats, RpcGenesisInfo, RpcNetworkInfo, RpcSimulateResult,
    RpcValidatorSet, RpcVersionInfo,
};

/// nhb node JSON-RPC 2.0 API definition.
///
/// All method names are prefixed with "nhb_" via `namespace = "nhb"`.
#[rpc(server, namespace = "nhb")]
pub trait NhbApi {
    /// Get full account state by bech32 address (`nhb1...`).
    #[method(name = "getAccount")]
    async fn get_account(&self, address: String) -> RpcResult<Option<RpcAccount>>;

    /// Get an account's balance of one token symbol (`NHB` or `ZNHB`).
    #[method(name = "getBalance")]
    async fn get_balance(&self, address: String, symbol: String) -> RpcResult<String>;

    /// Submit a signed transaction. `tx_hex` is hex-encoded `bincode(Transaction)`.
    /// Returns the transaction hash hex on success.
    #[method(name = "sendTransaction")]
    async fn send_transaction(&self, tx_hex: String) -> RpcResult<String>;

    /// Get a committed transaction by its hash hex.
    /// Returns hex-encoded `bincode(Transaction)` or null if not found.
    #[method(name = "getTransaction")]
    async fn get_transaction(&self, tx_hash: String) -> RpcResult<Option<String>>;

    /// Get a committed block by height, or null if the chain hasn't reached it yet.
    #[method(name = "getBlockByHeight")]
    async fn get_block_by_height(&self, height: u64) -> RpcResult<Option<RpcBlock>>;

    /// Return the current active validator set and its total power.
    #[method(name = "getValidatorSet")]
    async fn get_validator_set(&self) -> RpcResult<RpcValidatorSet>;

    /// Return aggregate on-chain statistics.
    #[method(name = "getChainStats")]
    async fn get_chain_stats(&self) -> RpcResult<RpcChainStats>;

    /// Return genesis/protocol constants.
    #[method(name = "getGenesisInfo")]
    async fn get_genesis_info(&self) -> RpcResult<RpcGenesisInfo>;

    /// Return the node's P2P identity (peer multiaddress).
    /// Other nodes pass this as a bootstrap peer to connect.
    #[method(name = "getNetworkInfo")]
    async fn get_network_info(&self) -> RpcResult<RpcNetworkInfo>;

    /// Return node and protocol version information.
    #[method(name = "getVersion")]
    async fn get_version(&self) -> RpcResult<RpcVersionInfo>;

    /// Dry-run a signed transaction against the current committed state
    /// without ever mutating it or broadcasting it. `tx_hex` is
    /// hex-encoded `bincode(Transaction)`.
    #[method(name = "simulateTransaction")]
    async fn simulate_transaction(&self, tx_hex: String) -> RpcResult<RpcSimulateResult>;
}
