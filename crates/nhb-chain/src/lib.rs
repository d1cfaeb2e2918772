//! Append-only block log plus height/hash indices, layered over the same
//! sled-backed `Storage` the trie uses (the `chain_meta` tree). Genesis
//! bootstrap is one explicit call (`init_with_genesis`); every block after
//! that goes through `add_block`, the only way the tip advances.

use std::sync::{Arc, RwLock};

use nhb_core::types::BlockHash;
use nhb_core::{Block, NhbError};
use nhb_state::Storage;

mod keys {
    pub const TIP: &[u8] = b"tip";
    pub const HEIGHT: &[u8] = b"height";
    pub const GENESIS: &[u8] = b"genesis";
    pub const HEIGHT_PREFIX: &[u8] = b"height:";
    pub const HASH_PREFIX: &[u8] = b"hash:";
}

fn height_key(height: u64) -> Vec<u8> {
    let mut key = keys::HEIGHT_PREFIX.to_vec();
    key.extend_from_slice(&height.to_be_bytes());
    key
}

fn hash_key(hash: &BlockHash) -> Vec<u8> {
    let mut key = keys::HASH_PREFIX.to_vec();
    key.extend_from_slice(hash.as_bytes());
    key
}

fn ser<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, NhbError> {
    bincode::serialize(value).map_err(|e| NhbError::Serialization(e.to_string()))
}

fn deser<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, NhbError> {
    bincode::deserialize(bytes).map_err(|e| NhbError::Serialization(e.to_string()))
}

struct Tip {
    hash: BlockHash,
    height: u64,
}

/// Append-only block index. The tip and height are cached in memory behind
/// a `RwLock` and mirrored into `Storage` on every write, so a restart picks
/// up exactly where the process left off.
pub struct Chain {
    storage: Arc<Storage>,
    tip: RwLock<Tip>,
}

impl Chain {
    /// Load an existing chain from `storage`, or `Ok(None)` if it has never
    /// been bootstrapped (no genesis block persisted yet).
    pub fn open(storage: Arc<Storage>) -> Result<Option<Self>, NhbError> {
        let meta = storage.chain_meta();
        let tip_bytes = meta
            .get(keys::TIP)
            .map_err(|e| NhbError::Storage(e.to_string()))?;
        let Some(tip_bytes) = tip_bytes else {
            return Ok(None);
        };
        let hash: BlockHash = deser(&tip_bytes)?;
        let height_bytes = meta
            .get(keys::HEIGHT)
            .map_err(|e| NhbError::Storage(e.to_string()))?
            .ok_or_else(|| NhbError::Storage("chain tip present without a height".into()))?;
        let height: u64 = deser(&height_bytes)?;
        Ok(Some(Self {
            storage,
            tip: RwLock::new(Tip { hash, height }),
        }))
    }

    /// Bootstrap the chain with `genesis` as block 0. Fails if a chain
    /// already exists at `storage` — callers decide whether to reuse an
    /// existing data directory or hand it a fresh one.
    pub fn init_with_genesis(storage: Arc<Storage>, genesis: Block) -> Result<Self, NhbError> {
        if genesis.header.height != 0 {
            return Err(NhbError::InvalidGenesis(
                "genesis block must be height 0".into(),
            ));
        }
        let meta = storage.chain_meta();
        if meta
            .get(keys::TIP)
            .map_err(|e| NhbError::Storage(e.to_string()))?
            .is_some()
        {
            return Err(NhbError::InvalidGenesis("chain already bootstrapped".into()));
        }
        let hash = genesis.hash();
        let mut batch = sled::Batch::default();
        batch.insert(keys::GENESIS, ser(&hash)?);
        batch.insert(keys::TIP, ser(&hash)?);
        batch.insert(keys::HEIGHT, ser(&0u64)?);
        batch.insert(height_key(0), ser(&hash)?);
        batch.insert(hash_key(&hash), ser(&genesis)?);
        meta.apply_batch(batch)
            .map_err(|e| NhbError::Storage(e.to_string()))?;
        storage.flush()?;
        Ok(Self {
            storage,
            tip: RwLock::new(Tip { hash, height: 0 }),
        })
    }

    pub fn genesis_hash(&self) -> Result<BlockHash, NhbError> {
        let meta = self.storage.chain_meta();
        let bytes = meta
            .get(keys::GENESIS)
            .map_err(|e| NhbError::Storage(e.to_string()))?
            .ok_or_else(|| NhbError::Storage("genesis hash missing".into()))?;
        deser(&bytes)
    }

    pub fn tip(&self) -> BlockHash {
        self.tip.read().expect("chain tip lock poisoned").hash
    }

    pub fn height(&self) -> u64 {
        self.tip.read().expect("chain tip lock poisoned").height
    }

    /// Append `block`, verifying linkage (`prev_hash` matches the current
    /// tip, `height` is the current height plus one) and its own `tx_root`
    /// before writing the block, tip, height, and both indices in a single
    /// sled batch.
    pub fn add_block(&self, block: Block) -> Result<(), NhbError> {
        let (expected_prev, expected_height) = {
            let tip = self.tip.read().expect("chain tip lock poisoned");
            (tip.hash, tip.height + 1)
        };
        if block.header.height != expected_height || block.header.prev_hash != expected_prev {
            return Err(NhbError::BlockLinkage {
                expected_prev: expected_prev.to_hex(),
                expected_height,
            });
        }
        let computed_tx_root = Block::compute_tx_root(&block.transactions);
        if computed_tx_root != block.header.tx_root {
            return Err(NhbError::TxRootMismatch {
                expected: block.header.tx_root.to_hex(),
                computed: computed_tx_root.to_hex(),
            });
        }

        let hash = block.hash();
        let height = block.header.height;
        let meta = self.storage.chain_meta();
        let mut batch = sled::Batch::default();
        batch.insert(keys::TIP, ser(&hash)?);
        batch.insert(keys::HEIGHT, ser(&height)?);
        batch.insert(height_key(height), ser(&hash)?);
        batch.insert(hash_key(&hash), ser(&block)?);
        meta.apply_batch(batch)
            .map_err(|e| NhbError::Storage(e.to_string()))?;
        self.storage.flush()?;

        let mut tip = self.tip.write().expect("chain tip lock poisoned");
        tip.hash = hash;
        tip.height = height;
        tracing::info!(height, hash = %hash.to_hex(), "block appended");
        Ok(())
    }

    pub fn block_by_height(&self, height: u64) -> Result<Option<Block>, NhbError> {
        let meta = self.storage.chain_meta();
        let Some(hash_bytes) = meta
            .get(height_key(height))
            .map_err(|e| NhbError::Storage(e.to_string()))?
        else {
            return Ok(None);
        };
        let hash: BlockHash = deser(&hash_bytes)?;
        self.block_by_hash(&hash)
    }

    pub fn block_by_hash(&self, hash: &BlockHash) -> Result<Option<Block>, NhbError> {
        let meta = self.storage.chain_meta();
        match meta
            .get(hash_key(hash))
            .map_err(|e| NhbError::Storage(e.to_string()))?
        {
            Some(bytes) => Ok(Some(deser(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nhb_core::types::Address;
    use nhb_core::{BlockHeader, EMPTY_TX_ROOT};
    use tempfile::tempdir;

    fn genesis_block() -> Block {
        Block {
            header: BlockHeader {
                height: 0,
                timestamp: 0,
                prev_hash: BlockHash::ZERO,
                tx_root: EMPTY_TX_ROOT,
                state_root: BlockHash::ZERO,
                validator: Address::zero(),
            },
            transactions: vec![],
        }
    }

    #[test]
    fn open_returns_none_before_bootstrap() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::open(dir.path()).unwrap());
        assert!(Chain::open(storage).unwrap().is_none());
    }

    #[test]
    fn add_block_enforces_linkage() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::open(dir.path()).unwrap());
        let chain = Chain::init_with_genesis(storage, genesis_block()).unwrap();
        assert_eq!(chain.height(), 0);

        let mut bad = genesis_block();
        bad.header.height = 2;
        bad.header.prev_hash = chain.tip();
        assert!(chain.add_block(bad).is_err());

        let mut good = genesis_block();
        good.header.height = 1;
        good.header.prev_hash = chain.tip();
        chain.add_block(good.clone()).unwrap();
        assert_eq!(chain.height(), 1);
        assert_eq!(chain.tip(), good.hash());
        assert_eq!(chain.block_by_height(1).unwrap().unwrap().hash(), good.hash());
    }
}
