//! Block and header types. Owned by `nhb-core` because RPC, mempool and the
//! chain index all need to name them without depending on `nhb-chain`.

use serde::{Deserialize, Serialize};

use crate::transaction::Transaction;
use crate::types::{Address, BlockHash, StateRoot, Timestamp};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BlockHeader {
    pub height: u64,
    pub timestamp: Timestamp,
    pub prev_hash: BlockHash,
    pub tx_root: BlockHash,
    pub state_root: StateRoot,
    pub validator: Address,
}

impl BlockHeader {
    pub fn hash(&self) -> BlockHash {
        let bytes = bincode::serialize(self).expect("canonical header encoding is infallible");
        keccak(&bytes)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn hash(&self) -> BlockHash {
        self.header.hash()
    }

    /// Merkle root of the canonical serialisation of the ordered transaction
    /// list. A pairwise keccak tree; an odd node at a level is duplicated,
    /// matching the common Merkle convention. The empty list has a fixed
    /// constant root (not all-zero, so it is distinguishable from a
    /// single-leaf tree whose leaf happens to hash to zero).
    pub fn compute_tx_root(transactions: &[Transaction]) -> BlockHash {
        if transactions.is_empty() {
            return EMPTY_TX_ROOT;
        }
        let mut level: Vec<[u8; 32]> = transactions
            .iter()
            .map(|tx| *tx.hash().as_bytes())
            .collect();
        while level.len() > 1 {
            if level.len() % 2 == 1 {
                level.push(*level.last().unwrap());
            }
            level = level
                .chunks(2)
                .map(|pair| {
                    let mut buf = Vec::with_capacity(64);
                    buf.extend_from_slice(&pair[0]);
                    buf.extend_from_slice(&pair[1]);
                    *keccak(&buf).as_bytes()
                })
                .collect();
        }
        BlockHash::from_bytes(level[0])
    }
}

/// keccak256("") — the fixed empty-tx-root constant the spec requires.
pub const EMPTY_TX_ROOT: BlockHash = BlockHash([
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
    0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
]);

fn keccak(bytes: &[u8]) -> BlockHash {
    use sha3::{Digest, Keccak256};
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&out);
    BlockHash::from_bytes(arr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tx_root_matches_empty_keccak() {
        assert_eq!(Block::compute_tx_root(&[]), EMPTY_TX_ROOT);
    }
}
