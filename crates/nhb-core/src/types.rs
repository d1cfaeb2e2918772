use serde::{Deserialize, Serialize};
use std::fmt;

/// Balance, held as a token-agnostic 128-bit integer. Both NHB and ZNHB
/// ledgers use this type; they are distinguished by which field of
/// `Account` holds them, not by a tagged union.
pub type Balance = u128;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = i64;

/// Transaction sequence number per account (monotonically increasing).
pub type Nonce = u64;

/// Chain id: the first 8 bytes of the genesis hash, big-endian.
pub type ChainId = u64;

// ── Address ──────────────────────────────────────────────────────────────────

/// 20-byte account address: the low 20 bytes of `keccak256(uncompressed_pubkey[1..])`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const LEN: usize = 20;

    pub fn from_bytes(b: [u8; 20]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Bech32 encoding with the `nhb` human-readable prefix, matching the
    /// spec's requirement that event attributes encode addresses as bech32.
    pub fn to_bech32(&self) -> String {
        crate::bech32::encode_address(&self.0)
    }

    pub fn from_bech32(s: &str) -> Result<Self, crate::error::NhbError> {
        crate::bech32::decode_address(s).map(Self)
    }

    pub fn zero() -> Self {
        Self([0u8; 20])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_bech32())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_bech32())
    }
}

// ── Hash32 ───────────────────────────────────────────────────────────────────

/// A generic 32-byte keccak digest: used for transaction hashes, block
/// hashes, state roots, escrow/trade/claimable ids and hash-locks alike.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    pub const ZERO: Hash32 = Hash32([0u8; 32]);

    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes[..32.min(bytes.len())]);
        Ok(Self(arr))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({}…)", &self.to_hex()[..10])
    }
}

/// A transaction hash: keccak256 over the transaction's canonical encoding,
/// including `Paymaster`, so that a paymaster change changes the hash.
pub type TxHash = Hash32;

/// A block hash: keccak256 over the block header's canonical encoding.
pub type BlockHash = Hash32;

/// A cryptographic state root: the trie root after applying a block.
pub type StateRoot = Hash32;

// ── PubKey / Signature ───────────────────────────────────────────────────────

/// An uncompressed secp256k1 public key (65 bytes: 0x04 || X || Y).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKey(pub Vec<u8>);

impl fmt::Debug for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PubKey({}b)", self.0.len())
    }
}

/// A 65-byte recoverable ECDSA signature: `r (32) || s (32) || v (1)`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub [u8; 65]);

impl Signature {
    pub fn from_bytes(b: [u8; 65]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}b)", self.0.len())
    }
}
