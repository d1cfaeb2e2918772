//! Bounded, FIFO transaction pool: admission runs the stateless checks every
//! node can do without touching the trie (structural limits, signature
//! recovery) plus a `transaction_key` duplicate guard, then enqueues under
//! a single dedicated mutex so adds and drains from many threads never race.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use nhb_core::types::Timestamp;
use nhb_core::{constants, NhbError, Transaction, TxKind};

/// Uniquely identifies one admitted transaction: two submissions that agree
/// on chain id, sender, nonce, paymaster and content hash are the same
/// transaction and the second is rejected as a duplicate. Transactions that
/// merely share a nonce (a would-be replacement) are both admitted — replace-
/// by-fee is not implemented.
fn transaction_key(tx: &Transaction, sender: nhb_core::types::Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + 20 + 8 + 21 + 32);
    key.extend_from_slice(&tx.chain_id.to_be_bytes());
    key.extend_from_slice(sender.as_bytes());
    key.extend_from_slice(&tx.nonce.to_be_bytes());
    match tx.paymaster {
        Some(p) => {
            key.push(1);
            key.extend_from_slice(p.as_bytes());
        }
        None => key.push(0),
    }
    key.extend_from_slice(tx.hash().as_bytes());
    key
}

/// `true` if `tx` carries a mint or swap voucher whose `expiry` is already in
/// the past. Transactions of any other kind are never pruned here.
fn is_expired_voucher(tx: &Transaction, now: Timestamp) -> bool {
    match tx.kind {
        TxKind::Mint => match bincode::deserialize::<nhb_core::payload::MintPayload>(&tx.data) {
            Ok(payload) => payload.voucher.expiry <= now,
            Err(_) => false,
        },
        TxKind::Swap => match bincode::deserialize::<nhb_core::payload::SwapPayload>(&tx.data) {
            Ok(payload) => payload.submission.expiry <= now,
            Err(_) => false,
        },
        _ => false,
    }
}

struct Inner {
    queue: VecDeque<Transaction>,
    keys: HashSet<Vec<u8>>,
    limit: usize,
}

pub struct Mempool {
    chain_id: u64,
    inner: Mutex<Inner>,
}

impl Mempool {
    pub fn new(chain_id: u64, limit: usize) -> Self {
        Self {
            chain_id,
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                keys: HashSet::new(),
                limit,
            }),
        }
    }

    /// Change the bound; `0` disables it. Transactions already queued are
    /// kept even if they now exceed the new limit — only future adds are
    /// affected.
    pub fn set_mempool_limit(&self, limit: usize) {
        self.inner.lock().expect("mempool lock poisoned").limit = limit;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("mempool lock poisoned").queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Admit `tx`: validates chain id, structural size/gas limits, and
    /// signature recoverability, then rejects exact duplicates and enforces
    /// the bound. Does not touch state — nonce/balance checks happen later,
    /// in `StateProcessor::apply_transaction`.
    pub fn add_transaction(&self, tx: Transaction) -> Result<(), NhbError> {
        if tx.chain_id != self.chain_id {
            return Err(NhbError::InvalidChainId {
                expected: self.chain_id,
                got: tx.chain_id,
            });
        }
        if tx.data.len() > constants::MAX_TX_DATA_BYTES {
            return Err(NhbError::InvalidPayload(
                "transaction data exceeds the maximum size".into(),
            ));
        }
        if tx.gas_limit > constants::MAX_GAS_LIMIT {
            return Err(NhbError::InvalidPayload(
                "gas limit exceeds the maximum allowed".into(),
            ));
        }
        let sender = nhb_crypto::recover_signer(&tx.signing_bytes(), &tx.signature)?;
        let key = transaction_key(&tx, sender);

        let mut inner = self.inner.lock().expect("mempool lock poisoned");
        if inner.keys.contains(&key) {
            return Err(NhbError::InvalidPayload("duplicate transaction".into()));
        }
        if inner.limit != 0 && inner.queue.len() >= inner.limit {
            return Err(NhbError::MempoolFull { limit: inner.limit });
        }
        inner.keys.insert(key);
        inner.queue.push_back(tx);
        Ok(())
    }

    /// Drain the entire pool. Reserved for the block proposer: once taken,
    /// transactions are gone from the pool whether or not they end up in a
    /// block (callers that fail mid-proposal do not get them back).
    pub fn get_mempool(&self) -> Vec<Transaction> {
        let mut inner = self.inner.lock().expect("mempool lock poisoned");
        inner.keys.clear();
        inner.queue.drain(..).collect()
    }

    /// Non-draining snapshot, for RPC/diagnostic callers that must not
    /// interfere with an in-flight proposal.
    pub fn peek_mempool(&self) -> Vec<Transaction> {
        let inner = self.inner.lock().expect("mempool lock poisoned");
        inner.queue.iter().cloned().collect()
    }

    /// Drain the pool for block proposal, filtering out mint/swap vouchers
    /// whose expiry has already passed.
    pub fn take_for_proposal(&self, now: Timestamp) -> Vec<Transaction> {
        self.get_mempool()
            .into_iter()
            .filter(|tx| !is_expired_voucher(tx, now))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nhb_core::types::{Address, PubKey, Signature};

    fn unsigned_tx(chain_id: u64, nonce: u64) -> Transaction {
        Transaction {
            chain_id,
            kind: TxKind::Transfer,
            nonce,
            to: Some(Address::zero()),
            value: Some(1),
            gas_limit: 21_000,
            gas_price: 1,
            data: vec![],
            paymaster: None,
            public_key: PubKey(vec![0u8; 65]),
            signature: Signature::from_bytes([0u8; 65]),
        }
    }

    #[test]
    fn rejects_wrong_chain_id() {
        let pool = Mempool::new(7, 0);
        let tx = unsigned_tx(9, 0);
        assert!(pool.add_transaction(tx).is_err());
    }

    #[test]
    fn enforces_exact_limit_under_concurrent_adds() {
        use std::sync::Arc;
        use std::thread;

        let pool = Arc::new(Mempool::new(0, 2_048));
        let mut handles = Vec::new();
        for producer in 0..32u64 {
            let pool = pool.clone();
            handles.push(thread::spawn(move || {
                for i in 0..64u64 {
                    let keypair = nhb_crypto::KeyPair::generate();
                    let mut tx = unsigned_tx(0, producer * 1_000 + i);
                    tx.public_key = keypair.public_key.clone();
                    tx.signature = keypair.sign(&tx.signing_bytes());
                    let _ = pool.add_transaction(tx);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(pool.len(), 2_048);
    }

    #[test]
    fn peek_does_not_drain() {
        let pool = Mempool::new(0, 0);
        let keypair = nhb_crypto::KeyPair::generate();
        let mut tx = unsigned_tx(0, 0);
        tx.public_key = keypair.public_key.clone();
        tx.signature = keypair.sign(&tx.signing_bytes());
        pool.add_transaction(tx).unwrap();
        assert_eq!(pool.peek_mempool().len(), 1);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get_mempool().len(), 1);
        assert_eq!(pool.len(), 0);
    }
}
