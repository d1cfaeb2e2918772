//! In-repo authenticated binary trie. Keys are hashed with keccak256 before
//! being routed bit-by-bit from the root; leaves carry the original key so
//! lookups can confirm an exact match past any hash-prefix collision. No
//! crate in the workspace ships a Merkle/Patricia trie, so this is built the
//! same way the rest of the repository builds its durable records: a named
//! sled tree holding bincode-encoded nodes, keyed by content hash instead of
//! by record id.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use nhb_core::types::Hash32;
use nhb_core::{NhbError, EMPTY_TX_ROOT};

use crate::storage::{deser, ser, Storage};

/// keccak256("") — same constant the block header's empty tx-root uses; an
/// empty trie and an empty transaction list are both "no content" digests.
pub const EMPTY_TRIE_ROOT: Hash32 = EMPTY_TX_ROOT;

#[derive(Clone, Serialize, Deserialize)]
enum Node {
    Leaf { key: Vec<u8>, value: Vec<u8> },
    Branch {
        left: Option<Hash32>,
        right: Option<Hash32>,
    },
}

fn keccak(bytes: &[u8]) -> [u8; 32] {
    use sha3::{Digest, Keccak256};
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&out);
    arr
}

fn hash_node(node: &Node) -> Hash32 {
    match node {
        Node::Leaf { key, value } => {
            let mut buf = Vec::with_capacity(1 + key.len() + value.len());
            buf.push(0x00);
            buf.extend_from_slice(key);
            buf.extend_from_slice(value);
            Hash32::from_bytes(keccak(&buf))
        }
        Node::Branch { left, right } => {
            let l = left.unwrap_or(EMPTY_TRIE_ROOT);
            let r = right.unwrap_or(EMPTY_TRIE_ROOT);
            let mut buf = Vec::with_capacity(64);
            buf.extend_from_slice(l.as_bytes());
            buf.extend_from_slice(r.as_bytes());
            Hash32::from_bytes(keccak(&buf))
        }
    }
}

/// `true` = take the right child, `false` = take the left child.
fn bit_at(hash: &[u8; 32], depth: usize) -> bool {
    let byte = hash[depth / 8];
    let bit = 7 - (depth % 8);
    (byte >> bit) & 1 == 1
}

/// Authenticated trie over one logical keyspace. Holds a dirty-node overlay
/// on top of a shared, durable `Storage` handle; `copy()` clones the overlay
/// cheaply (a `HashMap::clone`) so block proposal can mutate a scratch view
/// without touching the committed state.
pub struct Trie {
    base: Arc<Storage>,
    overlay: HashMap<Hash32, Node>,
    root: Option<Hash32>,
}

impl Trie {
    /// Open a trie view rooted at `root` (use `EMPTY_TRIE_ROOT` for a fresh
    /// trie).
    pub fn open(base: Arc<Storage>, root: Hash32) -> Self {
        Self {
            base,
            overlay: HashMap::new(),
            root: if root == EMPTY_TRIE_ROOT {
                None
            } else {
                Some(root)
            },
        }
    }

    pub fn root(&self) -> Hash32 {
        self.root.unwrap_or(EMPTY_TRIE_ROOT)
    }

    fn load_node(&self, hash: Hash32) -> Result<Node, NhbError> {
        if let Some(node) = self.overlay.get(&hash) {
            return Ok(node.clone());
        }
        let bytes = self
            .base
            .trie_nodes()
            .get(hash.as_bytes())
            .map_err(|e| NhbError::Storage(e.to_string()))?
            .ok_or_else(|| NhbError::Storage(format!("missing trie node {}", hash.to_hex())))?;
        deser(&bytes)
    }

    fn store_node(&mut self, node: Node) -> Hash32 {
        let hash = hash_node(&node);
        self.overlay.insert(hash, node);
        hash
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, NhbError> {
        let key_hash = keccak(key);
        let mut current = self.root;
        let mut depth = 0usize;
        loop {
            let Some(hash) = current else { return Ok(None) };
            match self.load_node(hash)? {
                Node::Leaf { key: leaf_key, value } => {
                    return Ok(if leaf_key == key { Some(value) } else { None });
                }
                Node::Branch { left, right } => {
                    current = if bit_at(&key_hash, depth) { right } else { left };
                    depth += 1;
                }
            }
        }
    }

    /// Collect every `(key, value)` pair whose raw key starts with `prefix`.
    /// Keys are routed by `keccak256(key)`, not by raw byte order, so this
    /// walks every node reachable from the root rather than following a
    /// sorted range — fine for the namespace-sized scans `QueryPrefix`
    /// callers actually run, not a substitute for a range-ordered index.
    pub fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, NhbError> {
        let mut out = Vec::new();
        self.collect_prefix(self.root, prefix, &mut out)?;
        Ok(out)
    }

    fn collect_prefix(
        &self,
        current: Option<Hash32>,
        prefix: &[u8],
        out: &mut Vec<(Vec<u8>, Vec<u8>)>,
    ) -> Result<(), NhbError> {
        let Some(hash) = current else { return Ok(()) };
        match self.load_node(hash)? {
            Node::Leaf { key, value } => {
                if key.starts_with(prefix) {
                    out.push((key, value));
                }
                Ok(())
            }
            Node::Branch { left, right } => {
                self.collect_prefix(left, prefix, out)?;
                self.collect_prefix(right, prefix, out)
            }
        }
    }

    pub fn put(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), NhbError> {
        let key_hash = keccak(key);
        let new_root = self.insert(self.root, 0, key_hash, key, value)?;
        self.root = Some(new_root);
        Ok(())
    }

    pub fn remove(&mut self, key: &[u8]) -> Result<(), NhbError> {
        let key_hash = keccak(key);
        self.root = self.remove_at(self.root, 0, key_hash, key)?;
        Ok(())
    }

    fn insert(
        &mut self,
        current: Option<Hash32>,
        depth: usize,
        key_hash: [u8; 32],
        key: &[u8],
        value: Vec<u8>,
    ) -> Result<Hash32, NhbError> {
        let Some(hash) = current else {
            return Ok(self.store_node(Node::Leaf {
                key: key.to_vec(),
                value,
            }));
        };
        match self.load_node(hash)? {
            Node::Leaf {
                key: existing_key,
                value: existing_value,
            } => {
                if existing_key == key {
                    return Ok(self.store_node(Node::Leaf {
                        key: key.to_vec(),
                        value,
                    }));
                }
                let existing_hash = keccak(&existing_key);
                self.split(
                    depth,
                    key_hash,
                    key.to_vec(),
                    value,
                    existing_hash,
                    existing_key,
                    existing_value,
                )
            }
            Node::Branch { left, right } => {
                let (left, right) = if bit_at(&key_hash, depth) {
                    (left, Some(self.insert(right, depth + 1, key_hash, key, value)?))
                } else {
                    (Some(self.insert(left, depth + 1, key_hash, key, value)?), right)
                };
                Ok(self.store_node(Node::Branch { left, right }))
            }
        }
    }

    /// Place two leaves that share a hash prefix: descend one bit at a time
    /// until they diverge, inserting a single-child branch at each shared
    /// level, then a two-child branch at the divergence point.
    #[allow(clippy::too_many_arguments)]
    fn split(
        &mut self,
        depth: usize,
        hash_a: [u8; 32],
        key_a: Vec<u8>,
        value_a: Vec<u8>,
        hash_b: [u8; 32],
        key_b: Vec<u8>,
        value_b: Vec<u8>,
    ) -> Result<Hash32, NhbError> {
        if depth >= 256 {
            // keccak256 collision between two distinct keys: astronomically
            // unlikely: keep the most recently inserted value.
            return Ok(self.store_node(Node::Leaf {
                key: key_a,
                value: value_a,
            }));
        }
        let bit_a = bit_at(&hash_a, depth);
        let bit_b = bit_at(&hash_b, depth);
        if bit_a == bit_b {
            let child = self.split(depth + 1, hash_a, key_a, value_a, hash_b, key_b, value_b)?;
            let (left, right) = if bit_a { (None, Some(child)) } else { (Some(child), None) };
            Ok(self.store_node(Node::Branch { left, right }))
        } else {
            let leaf_a = self.store_node(Node::Leaf {
                key: key_a,
                value: value_a,
            });
            let leaf_b = self.store_node(Node::Leaf {
                key: key_b,
                value: value_b,
            });
            let (left, right) = if bit_a { (leaf_b, leaf_a) } else { (leaf_a, leaf_b) };
            Ok(self.store_node(Node::Branch {
                left: Some(left),
                right: Some(right),
            }))
        }
    }

    fn remove_at(
        &mut self,
        current: Option<Hash32>,
        depth: usize,
        key_hash: [u8; 32],
        key: &[u8],
    ) -> Result<Option<Hash32>, NhbError> {
        let Some(hash) = current else { return Ok(None) };
        match self.load_node(hash)? {
            Node::Leaf { key: leaf_key, .. } => {
                if leaf_key == key {
                    Ok(None)
                } else {
                    Ok(Some(hash))
                }
            }
            Node::Branch { left, right } => {
                let (left, right) = if bit_at(&key_hash, depth) {
                    (left, self.remove_at(right, depth + 1, key_hash, key)?)
                } else {
                    (self.remove_at(left, depth + 1, key_hash, key)?, right)
                };
                match (left, right) {
                    (None, None) => Ok(None),
                    (left, right) => Ok(Some(self.store_node(Node::Branch { left, right }))),
                }
            }
        }
    }

    /// Cheap independent view: shares `base` storage, clones the (small)
    /// dirty-node overlay. Used for block proposal so speculative execution
    /// never mutates the committed trie.
    pub fn copy(&self) -> Trie {
        Trie {
            base: self.base.clone(),
            overlay: self.overlay.clone(),
            root: self.root,
        }
    }

    /// Flush the dirty-node overlay into durable storage and return the
    /// committed root.
    pub fn commit(&mut self) -> Result<Hash32, NhbError> {
        if !self.overlay.is_empty() {
            let mut batch = sled::Batch::default();
            for (hash, node) in self.overlay.drain() {
                batch.insert(hash.as_bytes().as_slice(), ser(&node)?);
            }
            self.base
                .trie_nodes()
                .apply_batch(batch)
                .map_err(|e| NhbError::Storage(e.to_string()))?;
        }
        Ok(self.root())
    }

    /// Discard the dirty-node overlay and rewind to a previously committed
    /// root (rollback on apply failure).
    pub fn reset_to_root(&mut self, root: Hash32) {
        self.overlay.clear();
        self.root = if root == EMPTY_TRIE_ROOT { None } else { Some(root) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_trie() -> (tempfile::TempDir, Trie) {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::open(dir.path()).unwrap());
        let trie = Trie::open(storage, EMPTY_TRIE_ROOT);
        (dir, trie)
    }

    #[test]
    fn empty_trie_has_fixed_root() {
        let (_dir, trie) = open_trie();
        assert_eq!(trie.root(), EMPTY_TRIE_ROOT);
    }

    #[test]
    fn put_then_get_round_trips() {
        let (_dir, mut trie) = open_trie();
        trie.put(b"account:alice", b"balance=10".to_vec()).unwrap();
        assert_eq!(trie.get(b"account:alice").unwrap(), Some(b"balance=10".to_vec()));
        assert_eq!(trie.get(b"account:bob").unwrap(), None);
    }

    #[test]
    fn root_changes_deterministically_with_content() {
        let (_dir, mut trie_a) = open_trie();
        trie_a.put(b"k1", b"v1".to_vec()).unwrap();
        trie_a.put(b"k2", b"v2".to_vec()).unwrap();

        let (_dir2, mut trie_b) = open_trie();
        trie_b.put(b"k2", b"v2".to_vec()).unwrap();
        trie_b.put(b"k1", b"v1".to_vec()).unwrap();

        assert_eq!(trie_a.root(), trie_b.root());
    }

    #[test]
    fn remove_restores_empty_root() {
        let (_dir, mut trie) = open_trie();
        trie.put(b"only-key", b"value".to_vec()).unwrap();
        assert_ne!(trie.root(), EMPTY_TRIE_ROOT);
        trie.remove(b"only-key").unwrap();
        assert_eq!(trie.root(), EMPTY_TRIE_ROOT);
    }

    #[test]
    fn commit_persists_nodes_for_reopening() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::open(dir.path()).unwrap());
        let mut trie = Trie::open(storage.clone(), EMPTY_TRIE_ROOT);
        trie.put(b"persisted", b"value".to_vec()).unwrap();
        let root = trie.commit().unwrap();

        let reopened = Trie::open(storage, root);
        assert_eq!(reopened.get(b"persisted").unwrap(), Some(b"value".to_vec()));
    }

    #[test]
    fn scan_prefix_finds_only_matching_keys() {
        let (_dir, mut trie) = open_trie();
        trie.put(b"acct:alice", b"a".to_vec()).unwrap();
        trie.put(b"acct:bob", b"b".to_vec()).unwrap();
        trie.put(b"escrow:1", b"e".to_vec()).unwrap();

        let mut found = trie.scan_prefix(b"acct:").unwrap();
        found.sort();
        assert_eq!(
            found,
            vec![
                (b"acct:alice".to_vec(), b"a".to_vec()),
                (b"acct:bob".to_vec(), b"b".to_vec()),
            ]
        );
    }

    #[test]
    fn copy_is_isolated_from_original() {
        let (_dir, mut trie) = open_trie();
        trie.put(b"k", b"v1".to_vec()).unwrap();
        let mut copy = trie.copy();
        copy.put(b"k", b"v2".to_vec()).unwrap();
        assert_eq!(trie.get(b"k").unwrap(), Some(b"v1".to_vec()));
        assert_eq!(copy.get(b"k").unwrap(), Some(b"v2".to_vec()));
    }
}
