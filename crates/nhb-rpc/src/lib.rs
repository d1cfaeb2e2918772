//! nhb-rpc
//!
//! JSON-RPC 2.0 server for nhb nodes.
//!
//! Namespace: "nhb"
//! Methods:
//!   nhb_getAccount           — full account state
//!   nhb_getBalance           — balance of one token symbol (NHB/ZNHB)
//!   nhb_sendTransaction      — submit a signed transaction (hex-encoded bincode)
//!   nhb_getTransaction       — look up a committed transaction by hash hex
//!   nhb_getBlockByHeight     — a committed block and its transactions
//!   nhb_getValidatorSet      — the active validator roster and total power
//!   nhb_getChainStats        — aggregate chain/mempool statistics
//!   nhb_getGenesisInfo       — chain id, genesis hash and native token list
//!   nhb_getNetworkInfo       — this node's P2P identity
//!   nhb_getVersion           — node/protocol version information
//!   nhb_simulateTransaction  — dry-run a transaction against committed state

pub mod api;
pub mod server;
pub mod types;

pub use api::NhbApiServer;
pub use server::{GenesisInfo, RpcServer, RpcServerState};
pub use types::{
    RpcAccount, RpcBlock, RpcChainStats, RpcGenesisInfo, RpcNativeToken, RpcNetworkInfo,
    RpcSimulateResult, RpcValidator, RpcValidatorSet, RpcVersionInfo,
};
