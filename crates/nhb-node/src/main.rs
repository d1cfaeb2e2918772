//! nhb-node — the permissioned PoS full-node binary.
//!
//! Startup sequence:
//!   1. Open (or bootstrap) the state database from the genesis document.
//!   2. Build the node controller (chain + state processor + mempool + validators).
//!   3. Start the P2P gossip network and the JSON-RPC server.
//!   4. Run the block-production loop: this binary ships with no external BFT
//!      engine, so for standalone/single-validator operation it drives its own
//!      `Node::create_block`/`commit_block` on a fixed tick — exactly the
//!      surface a real consensus engine would call instead.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use nhb_chain::Chain;
use nhb_core::Transaction;
use nhb_crypto::KeyPair;
use nhb_mempool::Mempool;
use nhb_node::node::Node;
use nhb_node::oracle::{FixedOracle, HttpOracle};
use nhb_p2p::{P2pConfig, P2pMessage, P2pNetwork};
use nhb_rpc::server::{GenesisInfo, RpcServerState};
use nhb_rpc::{RpcServer, RpcNativeToken};
use nhb_state::modules::swap::OracleClient;
use nhb_state::Storage;

#[derive(Parser, Debug)]
#[command(
    name = "nhb-node",
    version,
    about = "nhb full node — a permissioned proof-of-stake chain for escrow, identity and loyalty-style engagement"
)]
struct Args {
    /// Directory for the persistent state database.
    #[arg(long, default_value = "~/.nhb/data")]
    data_dir: PathBuf,

    /// Path to the genesis document (JSON). Consulted on every start to
    /// rebuild the validator roster; only used to bootstrap state the first
    /// time this data directory is used.
    #[arg(long)]
    genesis: Option<PathBuf>,

    /// Allow synthesising the fixed "dev" genesis when `--genesis` is not
    /// given. Refuses to start on a fresh data directory otherwise.
    #[arg(long, default_value_t = false)]
    allow_dev_genesis: bool,

    /// Path to this node's validator secret key (32 raw bytes, hex-encoded).
    /// Generated and written on first start if the file does not exist.
    #[arg(long)]
    validator_key: Option<PathBuf>,

    /// P2P listen multiaddress.
    #[arg(long, default_value = "/ip4/0.0.0.0/tcp/26656")]
    p2p_listen: String,

    /// JSON-RPC listen address.
    #[arg(long, default_value = "127.0.0.1:8545")]
    rpc_addr: SocketAddr,

    /// Bootstrap peer multiaddresses (comma-separated).
    #[arg(long, value_delimiter = ',')]
    bootstrap: Vec<String>,

    /// Mempool capacity; 0 means unlimited.
    #[arg(long, default_value_t = nhb_core::constants::DEFAULT_MEMPOOL_LIMIT)]
    mempool_limit: usize,

    /// Interval, in milliseconds, between this node's own block-production
    /// attempts. Only meaningful in standalone mode (no external BFT engine
    /// driving `create_block`/`commit_block` over RPC/gRPC instead).
    #[arg(long, default_value_t = 1_000)]
    block_interval_ms: u64,

    /// Base URL of an HTTP price-oracle adapter for swap vouchers (`GET
    /// {url}/quote/{pair}`). If omitted, a fixed-rate oracle is used.
    #[arg(long)]
    oracle_url: Option<String>,

    /// Trading pair the fixed-rate oracle answers for (ignored if `--oracle-url` is set).
    #[arg(long, default_value = "USD/NHB")]
    oracle_pair: String,

    /// Fixed oracle rate, smallest-unit integer (ignored if `--oracle-url` is set).
    #[arg(long, default_value_t = 1)]
    oracle_rate: u128,

    /// Fixed oracle rate decimals (ignored if `--oracle-url` is set).
    #[arg(long, default_value_t = 0)]
    oracle_rate_decimals: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,nhb=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!("nhb node starting");

    let data_dir = expand_tilde(&args.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;

    let validator_kp = load_or_generate_validator_key(args.validator_key.as_deref())?;
    info!(address = %validator_kp.address.to_bech32(), "validator identity");

    let storage = Arc::new(Storage::open(&data_dir).context("opening state database")?);

    let spec = nhb_genesis::load_or_synthesize(args.genesis.as_deref(), args.allow_dev_genesis)
        .context("loading genesis document")?;

    let existing = Chain::open(storage.clone()).context("checking for an existing chain")?;
    let (chain, validators, chain_id) = match existing {
        Some(chain) => {
            info!("existing chain found — skipping genesis bootstrap");
            let validators = nhb_genesis::validators_from_spec(&spec, Some(validator_kp.address))
                .context("rebuilding validator roster from genesis")?;
            let genesis_hash = chain.genesis_hash()?;
            let chain_id = u64::from_be_bytes(genesis_hash.as_bytes()[..8].try_into().unwrap());
            (chain, validators, chain_id)
        }
        None => {
            info!("fresh data directory — bootstrapping genesis");
            let bootstrapped = nhb_genesis::bootstrap(storage.clone(), &spec, Some(validator_kp.address))
                .context("bootstrapping genesis")?;
            (bootstrapped.chain, bootstrapped.validators, bootstrapped.chain_id)
        }
    };

    let committed_root = chain
        .block_by_hash(&chain.tip())?
        .ok_or_else(|| anyhow::anyhow!("chain tip block missing from storage"))?
        .header
        .state_root;

    let oracle: Arc<dyn OracleClient + Send + Sync> = match &args.oracle_url {
        Some(url) => Arc::new(HttpOracle::new(url.clone())),
        None => Arc::new(FixedOracle {
            pair: args.oracle_pair.clone(),
            rate: args.oracle_rate,
            rate_decimals: args.oracle_rate_decimals,
        }),
    };

    let mempool = Arc::new(Mempool::new(chain_id, args.mempool_limit));
    let validators = Arc::new(RwLock::new(validators));
    let chain = Arc::new(chain);

    let node = Arc::new(Node::new(
        chain.clone(),
        storage.clone(),
        chain_id,
        committed_root,
        oracle.clone(),
        validators.clone(),
        mempool.clone(),
    ));

    // ── P2P network ───────────────────────────────────────────────────────────
    let p2p_config = P2pConfig {
        listen_addr: args.p2p_listen.clone(),
        bootstrap_peers: args.bootstrap.clone(),
        ..P2pConfig::default()
    };
    let (p2p_network, mut p2p_handle) =
        P2pNetwork::new(&p2p_config).map_err(|e| anyhow::anyhow!("building P2P network: {e}"))?;
    info!(peer_id = %p2p_handle.local_peer_id, "P2P identity");

    let peer_multiaddr = format!("{}/p2p/{}", p2p_config.listen_addr, p2p_handle.local_peer_id);
    let outbound_tx = p2p_handle.outbound_tx.clone();

    // Gossip-received transactions feed straight into mempool admission.
    // `Proposal`/`Vote` messages are routed to nowhere in standalone mode —
    // there is no external BFT engine in this workspace to hand them to.
    let node_for_p2p = node.clone();
    tokio::spawn(async move {
        while let Some(msg) = p2p_handle.inbound_rx.recv().await {
            match msg {
                P2pMessage::Tx { payload } => match bincode::deserialize::<Transaction>(&payload) {
                    Ok(tx) => {
                        if let Err(e) = node_for_p2p.submit_transaction(tx) {
                            warn!(error = %e, "rejected transaction received via gossip");
                        }
                    }
                    Err(e) => warn!(error = %e, "failed to decode inbound gossip transaction"),
                },
                P2pMessage::Proposal { .. } | P2pMessage::Vote { .. } => {
                    tracing::debug!("dropping proposal/vote message: no consensus engine wired");
                }
            }
        }
    });

    tokio::spawn(async move { p2p_network.run().await });

    // ── Inbound transaction queue from RPC ────────────────────────────────────
    let (tx_sender, mut tx_receiver) = tokio::sync::mpsc::channel::<Transaction>(512);
    let node_for_rpc_queue = node.clone();
    tokio::spawn(async move {
        while let Some(tx) = tx_receiver.recv().await {
            let payload = match bincode::serialize(&tx) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(error = %e, "failed to encode transaction for gossip");
                    continue;
                }
            };
            match node_for_rpc_queue.submit_transaction(tx) {
                Ok(()) => {
                    let _ = outbound_tx.send(P2pMessage::Tx { payload }).await;
                }
                Err(e) => warn!(error = %e, "rejected transaction submitted via RPC"),
            }
        }
    });

    // ── RPC server ────────────────────────────────────────────────────────────
    let genesis_info = GenesisInfo {
        genesis_time: spec.genesis_time.timestamp(),
        genesis_hash: chain.genesis_hash()?,
        native_tokens: spec
            .native_tokens
            .iter()
            .map(|t| RpcNativeToken {
                symbol: t.symbol.clone(),
                name: t.name.clone(),
                decimals: t.decimals,
            })
            .collect(),
    };
    let rpc_state = Arc::new(RpcServerState {
        chain: chain.clone(),
        storage: storage.clone(),
        chain_id,
        validators: validators.clone(),
        mempool: mempool.clone(),
        oracle: oracle.clone(),
        genesis: genesis_info,
        tx_sender: Some(tx_sender),
        peer_multiaddr: Some(peer_multiaddr),
    });
    let _rpc_handle = RpcServer::new(rpc_state)
        .start(args.rpc_addr)
        .await
        .context("starting RPC server")?;

    // ── Block production loop ─────────────────────────────────────────────────
    info!("node ready");
    let mut ticker = tokio::time::interval(Duration::from_millis(args.block_interval_ms));
    loop {
        ticker.tick().await;
        let now = chrono::Utc::now().timestamp();
        let block = match node.create_block(validator_kp.address, now) {
            Ok(block) => block,
            Err(e) => {
                warn!(error = %e, "failed to build a candidate block");
                continue;
            }
        };
        if block.transactions.is_empty() {
            continue;
        }
        match node.commit_block(block) {
            Ok(events) => {
                info!(height = node.get_height(), events = events.len(), "block committed");
            }
            Err(e) => warn!(error = %e, "failed to commit proposed block"),
        }
    }
}

/// Load this node's validator secret key from `path` (32 raw bytes,
/// hex-encoded), generating and persisting a fresh one if the file does not
/// exist. With no path, a throwaway ephemeral key is generated every start —
/// fine for a one-shot local experiment, useless for anything meant to
/// survive a restart with the same validator identity.
fn load_or_generate_validator_key(path: Option<&Path>) -> anyhow::Result<KeyPair> {
    let Some(path) = path else {
        warn!("no --validator-key given; generating an ephemeral key for this run only");
        return Ok(KeyPair::generate());
    };
    if path.exists() {
        let hex_str = std::fs::read_to_string(path)
            .with_context(|| format!("reading validator key from {}", path.display()))?;
        let bytes = hex::decode(hex_str.trim()).context("validator key file is not valid hex")?;
        let sk: [u8; 32] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("validator key file must contain exactly 32 bytes"))?;
        return KeyPair::from_bytes(sk).map_err(|e| anyhow::anyhow!("invalid validator key: {e}"));
    }
    let kp = KeyPair::generate();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    std::fs::write(path, hex::encode(kp.secret_key_bytes()))
        .with_context(|| format!("writing validator key to {}", path.display()))?;
    info!(path = %path.display(), "generated and saved a new validator key");
    Ok(kp)
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
