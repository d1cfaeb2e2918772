use std::path::Path;

use nhb_core::NhbError;

/// Durable key/value storage backed by sled (pure-Rust, no C dependencies).
///
/// Named trees:
///   chain_meta — chain index keys (`tip`, `genesis`, `height`, `height:<be8>`,
///                `hash:<h>`) and raw block bytes keyed by block hash.
///   trie_nodes — trie node hash (32B) → bincode(Node), the trie's durable
///                backing store once a dirty-node overlay is committed.
pub struct Storage {
    db: sled::Db,
    chain_meta: sled::Tree,
    trie_nodes: sled::Tree,
}

impl Storage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, NhbError> {
        let db = sled::open(path).map_err(|e| NhbError::Storage(e.to_string()))?;
        let chain_meta = db
            .open_tree("chain_meta")
            .map_err(|e| NhbError::Storage(e.to_string()))?;
        let trie_nodes = db
            .open_tree("trie_nodes")
            .map_err(|e| NhbError::Storage(e.to_string()))?;
        Ok(Self {
            db,
            chain_meta,
            trie_nodes,
        })
    }

    pub fn chain_meta(&self) -> &sled::Tree {
        &self.chain_meta
    }

    pub fn trie_nodes(&self) -> &sled::Tree {
        &self.trie_nodes
    }

    pub fn flush(&self) -> Result<(), NhbError> {
        self.db
            .flush()
            .map_err(|e| NhbError::Storage(e.to_string()))?;
        Ok(())
    }
}

pub fn ser<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, NhbError> {
    bincode::serialize(value).map_err(|e| NhbError::Serialization(e.to_string()))
}

pub fn deser<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, NhbError> {
    bincode::deserialize(bytes).map_err(|e| NhbError::Serialization(e.to_string()))
}
