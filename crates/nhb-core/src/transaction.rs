//! The wire transaction and its typed kind catalog.
//!
//! `data` carries the bincode-encoded, kind-specific payload (e.g. the
//! alias string for `RegisterIdentity`, the escrow parameters for
//! `EscrowCreate`); modules decode it themselves rather than `Transaction`
//! inlining every variant's fields — this keeps the envelope's shape stable
//! as modules gain fields.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Balance, ChainId, Nonce, PubKey, Signature, TxHash};

/// The full catalog of transaction kinds the state processor dispatches on.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TxKind {
    Transfer,
    RegisterIdentity,
    Heartbeat,
    StakeLock,
    StakeUnbond,
    StakeWithdraw,
    EscrowCreate,
    EscrowFund,
    EscrowRelease,
    EscrowRefund,
    EscrowExpire,
    EscrowDispute,
    EscrowResolve,
    TradeCreate,
    TradeSettle,
    TradeDispute,
    TradeResolve,
    Mint,
    Swap,
    GovernancePropose,
    GovernanceVote,
    GovernanceFinalize,
    GovernanceQueue,
    GovernanceExecute,
    ClaimableCreate,
    ClaimableClaim,
    ClaimableExpire,
    ClaimableCancel,
}

impl TxKind {
    /// Whether this kind debits `gas_price * gas_limit` from the sender (or
    /// paymaster) before dispatch. Vouchers carry their own economics and
    /// are fee-exempt; everything else pays the standard fee.
    pub fn is_fee_bearing(self) -> bool {
        !matches!(self, TxKind::Mint | TxKind::Swap)
    }
}

/// A signed transaction, as admitted to the mempool or embedded in a block.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub chain_id: ChainId,
    pub kind: TxKind,
    pub nonce: Nonce,
    pub to: Option<Address>,
    pub value: Option<Balance>,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub data: Vec<u8>,
    pub paymaster: Option<Address>,
    /// The sender's uncompressed public key; the address is derived from it,
    /// never carried redundantly on the wire.
    pub public_key: PubKey,
    pub signature: Signature,
}

/// Canonical, deterministic encoding used both for signing and for hashing.
/// Mirrors the wire `Transaction` field-for-field including `paymaster`, but
/// excludes the signature itself (the signature signs this digest).
#[derive(Serialize)]
struct SigningPayload<'a> {
    chain_id: ChainId,
    kind: TxKind,
    nonce: Nonce,
    to: &'a Option<Address>,
    value: &'a Option<Balance>,
    gas_limit: u64,
    gas_price: u128,
    data: &'a [u8],
    paymaster: &'a Option<Address>,
    public_key: &'a PubKey,
}

/// Canonical encoding used to compute the transaction hash: the signing
/// payload plus the signature, so that two transactions differing only in
/// `paymaster` (and therefore resigned) hash to distinct values.
#[derive(Serialize)]
struct HashingPayload<'a> {
    signing: SigningPayload<'a>,
    signature: &'a Signature,
}

impl Transaction {
    fn signing_payload(&self) -> SigningPayload<'_> {
        SigningPayload {
            chain_id: self.chain_id,
            kind: self.kind,
            nonce: self.nonce,
            to: &self.to,
            value: &self.value,
            gas_limit: self.gas_limit,
            gas_price: self.gas_price,
            data: &self.data,
            paymaster: &self.paymaster,
            public_key: &self.public_key,
        }
    }

    /// Bytes that the sender's signature covers.
    pub fn signing_bytes(&self) -> Vec<u8> {
        bincode::serialize(&self.signing_payload()).expect("canonical tx encoding is infallible")
    }

    /// The transaction hash: keccak256 of the canonical encoding, including
    /// `paymaster` and `signature`, so a sponsor change yields a new hash.
    pub fn hash(&self) -> TxHash {
        let payload = HashingPayload {
            signing: self.signing_payload(),
            signature: &self.signature,
        };
        let bytes = bincode::serialize(&payload).expect("canonical tx encoding is infallible");
        keccak(&bytes)
    }

    pub fn fee(&self) -> u128 {
        self.gas_price.saturating_mul(self.gas_limit as u128)
    }
}

fn keccak(bytes: &[u8]) -> TxHash {
    use sha3::{Digest, Keccak256};
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&out);
    TxHash::from_bytes(arr)
}
