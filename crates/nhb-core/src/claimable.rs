//! Hash-time-locked payout records.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Balance, Hash32, Timestamp};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClaimableStatus {
    Init,
    Claimed,
    Cancelled,
    Expired,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Claimable {
    pub id: Hash32,
    pub payer: Address,
    pub token: String,
    pub amount: Balance,
    pub hash_lock: Hash32,
    pub deadline: Timestamp,
    pub recipient_hint: Option<Address>,
    pub status: ClaimableStatus,
}
