use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObject;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use nhb_chain::Chain;
use nhb_consensus::ValidatorSet;
use nhb_core::types::{Address, BlockHash};
use nhb_core::{NhbError, Transaction};
use nhb_mempool::Mempool;
use nhb_state::modules::swap::OracleClient;
use nhb_state::{StateManager, StateProcessor, Storage, Trie};

use crate::api::NhbApiServer;
use crate::types::{
    RpcAccount, RpcBlock, RpcChainStats, RpcGenesisInfo, RpcNativeToken, RpcNetworkInfo,
    RpcSimulateResult, RpcValidator, RpcValidatorSet, RpcVersionInfo,
};

fn rpc_err(code: i32, msg: impl Into<String>) -> ErrorObject<'static> {
    ErrorObject::owned(code, msg.into(), None::<()>)
}

/// Maps a domain error to a stable JSON-RPC error code: malformed input the
/// caller sent gets "invalid params", everything the validation pipeline
/// itself rejected gets a dedicated application-error code.
fn rpc_err_from_nhb(e: NhbError) -> ErrorObject<'static> {
    match e {
        NhbError::Serialization(_) | NhbError::InvalidPayload(_) | NhbError::InvalidGenesis(_) => {
            rpc_err(-32602, e.to_string())
        }
        _ => rpc_err(-32000, e.to_string()),
    }
}

/// Genesis-time constants the server reports verbatim via `getGenesisInfo`;
/// resolved once at startup from the genesis document and never touched again.
#[derive(Debug, Clone)]
pub struct GenesisInfo {
    pub genesis_time: i64,
    pub genesis_hash: BlockHash,
    pub native_tokens: Vec<RpcNativeToken>,
}

/// Shared, read-mostly state handed to every RPC call. Cloning an `Arc<Self>`
/// per request is cheap; the only contended resource is `validators`, held
/// for the duration of a single read.
pub struct RpcServerState {
    pub chain: Arc<Chain>,
    pub storage: Arc<Storage>,
    pub chain_id: u64,
    pub validators: Arc<RwLock<ValidatorSet>>,
    pub mempool: Arc<Mempool>,
    pub oracle: Arc<dyn OracleClient + Send + Sync>,
    pub genesis: GenesisInfo,
    /// Forwards accepted transactions into the node's own pipeline (mempool
    /// admission plus gossip broadcast). `None` means this server instance
    /// only serves read queries.
    pub tx_sender: Option<tokio::sync::mpsc::Sender<Transaction>>,
    /// Full libp2p multiaddress of this node (e.g.
    /// `/ip4/127.0.0.1/tcp/26656/p2p/<PeerId>`). Returned by `getNetworkInfo`.
    pub peer_multiaddr: Option<String>,
}

impl RpcServerState {
    fn tip_state_root(&self) -> RpcResult<BlockHash> {
        let block = self
            .chain
            .block_by_hash(&self.chain.tip())
            .map_err(rpc_err_from_nhb)?
            .ok_or_else(|| rpc_err(-32603, "chain tip block missing from storage"))?;
        Ok(block.header.state_root)
    }
}

/// The RPC server implementation.
pub struct RpcServer {
    state: Arc<RpcServerState>,
}

impl RpcServer {
    pub fn new(state: Arc<RpcServerState>) -> Self {
        Self { state }
    }

    /// Start the JSON-RPC server on `addr` with permissive CORS headers. Returns a handle to stop it.
    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<ServerHandle> {
        let cors = CorsLayer::new()
            .allow_methods(Any)
            .allow_origin(Any)
            .allow_headers(Any);

        let server = Server::builder()
            .set_http_middleware(tower::ServiceBuilder::new().layer(cors))
            .build(addr)
            .await?;

        let module = self.into_rpc();
        let handle = server.start(module);
        info!(%addr, "RPC server started");
        Ok(handle)
    }
}

fn tx_to_hex(tx: &Transaction) -> RpcResult<String> {
    bincode::serialize(tx)
        .map(hex::encode)
        .map_err(|e| rpc_err(-32603, e.to_string()))
}

fn decode_tx(tx_hex: &str) -> RpcResult<Transaction> {
    let bytes = hex::decode(tx_hex).map_err(|e| rpc_err(-32602, format!("invalid hex: {e}")))?;
    bincode::deserialize(&bytes)
        .map_err(|e| rpc_err(-32602, format!("invalid transaction encoding: {e}")))
}

#[async_trait]
impl NhbApiServer for RpcServer {
    async fn get_account(&self, address: String) -> RpcResult<Option<RpcAccount>> {
        let addr = Address::from_bech32(&address).map_err(rpc_err_from_nhb)?;

        let root = self.state.tip_state_root()?;
        let mut trie = Trie::open(self.state.storage.clone(), root);
        let sm = StateManager::new(&mut trie);
        let account = sm.account(&addr).map_err(rpc_err_from_nhb)?;

        Ok(Some(RpcAccount {
            address,
            nonce: account.nonce,
            balance_nhb: account.balance_nhb.to_string(),
            balance_znhb: account.balance_znhb.to_string(),
            stake: account.stake.to_string(),
            engagement_score: account.engagement_score,
            username: account.username,
            roles: account.roles,
        }))
    }

    async fn get_balance(&self, address: String, symbol: String) -> RpcResult<String> {
        let addr = Address::from_bech32(&address).map_err(rpc_err_from_nhb)?;

        let root = self.state.tip_state_root()?;
        let mut trie = Trie::open(self.state.storage.clone(), root);
        let sm = StateManager::new(&mut trie);
        let account = sm.account(&addr).map_err(rpc_err_from_nhb)?;

        Ok(account.balance_of(&symbol).to_string())
    }

    async fn send_transaction(&self, tx_hex: String) -> RpcResult<String> {
        let tx = decode_tx(&tx_hex)?;
        let hash = tx.hash().to_hex();

        match &self.state.tx_sender {
            Some(sender) => sender
                .send(tx)
                .await
                .map_err(|_| rpc_err(-32603, "transaction pipeline closed"))?,
            None => {
                warn!("RPC: sendTransaction called but no tx pipeline configured");
                return Err(rpc_err(-32603, "node tx pipeline not connected").into());
            }
        }

        Ok(hash)
    }

    async fn get_transaction(&self, tx_hash: String) -> RpcResult<Option<String>> {
        let wanted = BlockHash::from_hex(&tx_hash)
            .map_err(|e| rpc_err(-32602, format!("invalid tx hash: {e}")))?;

        let mut height = self.state.chain.height();
        loop {
            let block = self
                .state
                .chain
                .block_by_height(height)
                .map_err(rpc_err_from_nhb)?;
            if let Some(block) = block {
                for tx in &block.transactions {
                    if tx.hash() == wanted {
                        return Ok(Some(tx_to_hex(tx)?));
                    }
                }
            }
            if height == 0 {
                return Ok(None);
            }
            height -= 1;
        }
    }

    async fn get_block_by_height(&self, height: u64) -> RpcResult<Option<RpcBlock>> {
        let block = self
            .state
            .chain
            .block_by_height(height)
            .map_err(rpc_err_from_nhb)?;
        let Some(block) = block else { return Ok(None) };

        let transactions = block
            .transactions
            .iter()
            .map(tx_to_hex)
            .collect::<RpcResult<Vec<_>>>()?;

        Ok(Some(RpcBlock {
            height: block.header.height,
            timestamp: block.header.timestamp,
            hash: block.hash().to_hex(),
            prev_hash: block.header.prev_hash.to_hex(),
            tx_root: block.header.tx_root.to_hex(),
            state_root: block.header.state_root.to_hex(),
            validator: block.header.validator.to_bech32(),
            tx_count: transactions.len(),
            transactions,
        }))
    }

    async fn get_validator_set(&self) -> RpcResult<RpcValidatorSet> {
        let validators = self
            .state
            .validators
            .read()
            .expect("validator set lock poisoned");

        let power_map = validators.power_map();
        let total_power: u128 = power_map.values().sum();
        let validators = power_map
            .into_iter()
            .map(|(addr, power)| RpcValidator {
                address: addr.to_bech32(),
                power: power.to_string(),
            })
            .collect();

        Ok(RpcValidatorSet {
            validators,
            total_power: total_power.to_string(),
        })
    }

    async fn get_chain_stats(&self) -> RpcResult<RpcChainStats> {
        let root = self.state.tip_state_root()?;
        let mut trie = Trie::open(self.state.storage.clone(), root);
        let sm = StateManager::new(&mut trie);
        let total_stake = sm.total_stake().map_err(rpc_err_from_nhb)?;

        let validator_count = self
            .state
            .validators
            .read()
            .expect("validator set lock poisoned")
            .len();

        Ok(RpcChainStats {
            height: self.state.chain.height(),
            tip_hash: self.state.chain.tip().to_hex(),
            validator_count,
            total_stake: total_stake.to_string(),
            mempool_size: self.state.mempool.len(),
        })
    }

    async fn get_genesis_info(&self) -> RpcResult<RpcGenesisInfo> {
        Ok(RpcGenesisInfo {
            chain_id: self.state.chain_id,
            genesis_time: self.state.genesis.genesis_time,
            genesis_hash: self.state.genesis.genesis_hash.to_hex(),
            native_tokens: self.state.genesis.native_tokens.clone(),
        })
    }

    async fn get_network_info(&self) -> RpcResult<RpcNetworkInfo> {
        Ok(RpcNetworkInfo {
            peer_multiaddr: self.state.peer_multiaddr.clone().unwrap_or_default(),
            chain_id: self.state.chain_id,
        })
    }

    async fn get_version(&self) -> RpcResult<RpcVersionInfo> {
        Ok(RpcVersionInfo {
            node_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: "1".to_string(),
            api_version: "1".to_string(),
        })
    }

    async fn simulate_transaction(&self, tx_hex: String) -> RpcResult<RpcSimulateResult> {
        let tx = decode_tx(&tx_hex)?;
        let root = self.state.tip_state_root()?;

        let mut processor = StateProcessor::new(
            self.state.storage.clone(),
            root,
            self.state.chain_id,
            self.state.oracle.clone(),
        );
        processor.begin_block();

        let now = chrono::Utc::now().timestamp();
        match processor.apply_transaction(&tx, now) {
            Ok(events) => Ok(RpcSimulateResult {
                success: true,
                error: None,
                events_emitted: events.len(),
                resulting_state_root: Some(processor.pending_root().to_hex()),
            }),
            Err(e) => Ok(RpcSimulateResult {
                success: false,
                error: Some(e.to_string()),
                events_emitted: 0,
                resulting_state_root: None,
            }),
        }
    }
}
