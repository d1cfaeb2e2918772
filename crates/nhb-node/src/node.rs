//! The node controller: the single owner of chain, state and mempool a
//! validator process runs. Every mutating entry point serialises through one
//! coarse-grained `state` mutex (§5) — exactly one `CreateBlock`/`CommitBlock`
//! (or module call reached through them) executes at a time. `chain` has its
//! own read/write lock and answers height/tip reads without touching `state`
//! at all.
//!
//! This is the node's own rendering of the external BFT engine's
//! `ConsensusAPI`: `submit_transaction`, `get_validator_set`,
//! `get_block_by_height`, `get_height`, `get_mempool`, `create_block`,
//! `commit_block`, `get_last_commit_hash`, `query_state`, `query_prefix`,
//! `simulate_tx`. No external consensus engine ships in this workspace; a
//! BFT implementation is expected to drive a node through exactly this
//! surface.

use std::sync::{Arc, Mutex, RwLock};

use nhb_chain::Chain;
use nhb_consensus::ValidatorSet;
use nhb_core::types::{Address, Balance, ChainId, Hash32, Timestamp};
use nhb_core::{Block, BlockHeader, Event, NhbError, Transaction};
use nhb_mempool::Mempool;
use nhb_state::modules::swap::OracleClient;
use nhb_state::{StateProcessor, Storage, Trie};

/// A transaction that would be accepted against the current committed state,
/// along with the fee it would pay and the events it would emit — the node's
/// rendering of `SimulateTx`'s `{gasUsed, gasCost, events}`.
pub struct SimulationOutcome {
    pub fee: Balance,
    pub events: Vec<Event>,
    pub resulting_state_root: Hash32,
}

pub struct Node {
    chain: Arc<Chain>,
    storage: Arc<Storage>,
    chain_id: ChainId,
    state: Mutex<StateProcessor>,
    validators: Arc<RwLock<ValidatorSet>>,
    mempool: Arc<Mempool>,
}

impl Node {
    /// `validators` and `mempool` are taken as already-shared handles so the
    /// RPC and P2P front ends can be built against the same instances the
    /// node mutates, rather than a private copy only this struct sees.
    pub fn new(
        chain: Arc<Chain>,
        storage: Arc<Storage>,
        chain_id: ChainId,
        committed_root: Hash32,
        oracle: Arc<dyn OracleClient + Send + Sync>,
        validators: Arc<RwLock<ValidatorSet>>,
        mempool: Arc<Mempool>,
    ) -> Self {
        let state = StateProcessor::new(storage.clone(), committed_root, chain_id, oracle);
        Self {
            chain,
            storage,
            chain_id,
            state: Mutex::new(state),
            validators,
            mempool,
        }
    }

    pub fn chain(&self) -> &Arc<Chain> {
        &self.chain
    }

    pub fn mempool(&self) -> &Arc<Mempool> {
        &self.mempool
    }

    pub fn validators(&self) -> &Arc<RwLock<ValidatorSet>> {
        &self.validators
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    /// Stateless, mempool-level admission check plus enqueue. Does not touch
    /// the trie — nonce/balance checks happen later, when the transaction is
    /// actually applied in a block.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<(), NhbError> {
        self.mempool.add_transaction(tx)
    }

    pub fn get_validator_set(&self) -> std::collections::BTreeMap<Address, Balance> {
        self.validators
            .read()
            .expect("validator set lock poisoned")
            .power_map()
    }

    pub fn get_block_by_height(&self, height: u64) -> Result<Option<Block>, NhbError> {
        self.chain.block_by_height(height)
    }

    pub fn get_height(&self) -> u64 {
        self.chain.height()
    }

    pub fn get_last_commit_hash(&self) -> Hash32 {
        self.chain.tip()
    }

    /// Drain every transaction the mempool currently considers ready for
    /// proposal. Not idempotent: a second call returns nothing until more
    /// transactions are admitted.
    pub fn get_mempool(&self, now: Timestamp) -> Vec<Transaction> {
        self.mempool.take_for_proposal(now)
    }

    /// Raw keyspace read, namespaced the same way `nhb_state::manager`'s
    /// internal key prefixes are (e.g. `"acct:"`). Answers against the last
    /// *committed* root, not whatever a concurrent `create_block` is
    /// speculating on.
    pub fn query_state(&self, namespace: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>, NhbError> {
        let root = self.state.lock().expect("state lock poisoned").current_root();
        let trie = Trie::open(self.storage.clone(), root);
        let mut full_key = namespace.to_vec();
        full_key.extend_from_slice(key);
        trie.get(&full_key)
    }

    /// Raw keyspace prefix scan. A full trie walk filtered client-side (the
    /// trie routes by key hash, not by raw byte order) — fine for the
    /// namespace-sized scans this is meant for, not a substitute for a
    /// range index over the whole chain.
    pub fn query_prefix(
        &self,
        namespace: &[u8],
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, NhbError> {
        let root = self.state.lock().expect("state lock poisoned").current_root();
        let trie = Trie::open(self.storage.clone(), root);
        let mut full_prefix = namespace.to_vec();
        full_prefix.extend_from_slice(prefix);
        trie.scan_prefix(&full_prefix)
    }

    /// Apply `tx` against an isolated copy of the committed state and throw
    /// the result away. Never observable by any other caller.
    pub fn simulate_tx(&self, tx: &Transaction, now: Timestamp) -> Result<SimulationOutcome, NhbError> {
        let mut scratch = self.state.lock().expect("state lock poisoned").copy();
        scratch.begin_block();
        let events = scratch.apply_transaction(tx, now)?;
        Ok(SimulationOutcome {
            fee: tx.fee(),
            events,
            resulting_state_root: scratch.pending_root(),
        })
    }

    /// Build a candidate block out of whatever the mempool currently has
    /// ready, executing against a speculative copy of state so the node's
    /// own committed view is never touched. Transactions that fail to apply
    /// are simply left out of the block, not treated as a hard error —
    /// a stale nonce by the time of proposal is routine, not exceptional.
    pub fn create_block(&self, validator: Address, now: Timestamp) -> Result<Block, NhbError> {
        let candidates = self.mempool.take_for_proposal(now);
        let mut scratch = self.state.lock().expect("state lock poisoned").copy();
        scratch.begin_block();

        let mut included = Vec::with_capacity(candidates.len());
        for tx in candidates {
            match scratch.apply_transaction(&tx, now) {
                Ok(_) => included.push(tx),
                Err(e) => tracing::debug!(error = %e, "dropping transaction from proposed block"),
            }
        }

        let tx_root = Block::compute_tx_root(&included);
        let state_root = scratch.pending_root();
        let header = BlockHeader {
            height: self.chain.height() + 1,
            timestamp: now,
            prev_hash: self.chain.tip(),
            tx_root,
            state_root,
            validator,
        };
        Ok(Block {
            header,
            transactions: included,
        })
    }

    /// Validate and apply a proposed block against the live state: linkage
    /// is `Chain::add_block`'s job, so only the block's own internal
    /// consistency (tx root, timestamp window, transaction replay, state
    /// root) is checked here. On any failure the live trie is rewound to the
    /// parent root before the error is returned — a rejected block never
    /// leaves a partial mutation behind.
    pub fn commit_block(&self, block: Block) -> Result<Vec<Event>, NhbError> {
        let mut state = self.state.lock().expect("state lock poisoned");
        let parent_root = state.current_root();

        let computed_tx_root = Block::compute_tx_root(&block.transactions);
        if computed_tx_root != block.header.tx_root {
            return Err(NhbError::TxRootMismatch {
                expected: block.header.tx_root.to_hex(),
                computed: computed_tx_root.to_hex(),
            });
        }

        let parent_ts = self
            .chain
            .block_by_hash(&block.header.prev_hash)?
            .map(|b| b.header.timestamp)
            .unwrap_or(block.header.timestamp);
        let max_ts = now_with_tolerance();
        if block.header.timestamp < parent_ts || block.header.timestamp > max_ts {
            return Err(NhbError::BlockTimestampOutOfWindow {
                ts: block.header.timestamp,
                min: parent_ts,
                max: max_ts,
            });
        }

        state.begin_block();
        for tx in &block.transactions {
            if let Err(e) = state.apply_transaction(tx, block.header.timestamp) {
                state.reset_to_root(parent_root);
                return Err(e);
            }
        }

        let validator_addrs = self
            .validators
            .read()
            .expect("validator set lock poisoned")
            .addresses();
        let lifecycle_events = match state.process_block_lifecycle(
            block.header.height,
            block.header.timestamp,
            &validator_addrs,
        ) {
            Ok(events) => events,
            Err(e) => {
                state.reset_to_root(parent_root);
                return Err(e);
            }
        };
        // `end_block` drains the transaction events collected by `apply_transaction`
        // above; lifecycle events are appended after so the committed order matches
        // the block's own transaction order followed by end-of-block housekeeping.
        let mut events = state.end_block();
        events.extend(lifecycle_events);

        let computed_state_root = state.pending_root();
        if computed_state_root != block.header.state_root {
            state.reset_to_root(parent_root);
            return Err(NhbError::StateRootMismatch {
                expected: block.header.state_root.to_hex(),
                computed: computed_state_root.to_hex(),
            });
        }

        state.commit()?;
        self.chain.add_block(block)?;
        Ok(events)
    }
}

fn now_with_tolerance() -> Timestamp {
    chrono::Utc::now().timestamp() + nhb_core::constants::BLOCK_TIMESTAMP_TOLERANCE_SECS
}
