//! Kind-specific transaction payloads. `Transaction::data` carries the
//! bincode encoding of the payload matching `Transaction::kind`; the
//! processor decodes it just before dispatching to the matching module.
//! Kept out of `Transaction` itself so the envelope's shape stays stable as
//! modules gain fields (see `transaction.rs`'s module doc comment).

use serde::{Deserialize, Serialize};

use crate::governance::VoteChoice;
use crate::types::{Address, Balance, Hash32, Timestamp};
use crate::voucher::{MintVoucher, SwapVoucherSubmission};
use crate::types::Signature;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterIdentityPayload {
    pub alias: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeartbeatPayload {
    pub delta_minutes: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StakeLockPayload {
    pub amount: Balance,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StakeUnbondPayload {
    pub lock_nonce: u64,
    pub amount: Balance,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StakeWithdrawPayload {}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EscrowCreatePayload {
    pub id: Hash32,
    pub payee: Address,
    pub token: String,
    pub amount: Balance,
    pub fee_bps: u32,
    pub deadline: Timestamp,
    pub mediator: Option<Address>,
    pub meta: [u8; 32],
    pub realm: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EscrowIdPayload {
    pub id: Hash32,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ResolveOutcomeWire {
    Release,
    Refund,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolvePayload {
    pub id: Hash32,
    pub outcome: ResolveOutcomeWire,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TradeCreatePayload {
    pub id: Hash32,
    pub offer_id: Hash32,
    pub seller: Address,
    pub escrow_base_id: Hash32,
    pub escrow_quote_id: Hash32,
    pub base_token: String,
    pub base_amount: Balance,
    pub quote_token: String,
    pub quote_amount: Balance,
    pub deadline: Timestamp,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TradeIdPayload {
    pub id: Hash32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MintPayload {
    pub voucher: MintVoucher,
    pub signature: Signature,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwapPayload {
    pub submission: SwapVoucherSubmission,
    pub signature: Signature,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernanceProposePayload {
    pub kind: String,
    pub payload: Vec<u8>,
    pub deposit: Balance,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernanceVotePayload {
    pub id: u64,
    pub choice: VoteChoice,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernanceIdPayload {
    pub id: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClaimableCreatePayload {
    pub id: Hash32,
    pub token: String,
    pub amount: Balance,
    pub hash_lock: Hash32,
    pub deadline: Timestamp,
    pub recipient_hint: Option<Address>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClaimableClaimPayload {
    pub id: Hash32,
    pub preimage: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClaimableIdPayload {
    pub id: Hash32,
}
