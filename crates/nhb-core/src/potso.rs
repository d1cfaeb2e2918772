//! POTSO: proof-of-stake + participation. A stake lock moves ZNHB from the
//! owner into a vault; unbonding splits a lock and schedules a withdrawal
//! day; the withdrawal queue is organised in day buckets.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Balance, Timestamp};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StakeLock {
    /// Monotonically allocated per-owner lock sequence number.
    pub lock_nonce: u64,
    pub owner: Address,
    pub amount: Balance,
    pub locked_at: Timestamp,
}

/// An unbonding entry queued for release on `withdraw_day`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UnbondingEntry {
    pub owner: Address,
    pub lock_nonce: u64,
    pub amount: Balance,
    pub withdraw_day: i64,
}

/// A single day's heartbeat/engagement record for one address.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct EngagementMeter {
    pub day: i64,
    pub raw_minutes: u64,
    pub heartbeat_count: u64,
}

/// Engagement scoring policy, shared by the POTSO/engagement module.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EngagementPolicy {
    pub heartbeat_weight: u64,
    pub tx_weight: u64,
    pub escrow_weight: u64,
    pub gov_weight: u64,
    pub daily_cap: u64,
    pub max_minutes_per_heartbeat: u64,
    pub lambda_numerator: u64,
    pub lambda_denominator: u64,
}

impl Default for EngagementPolicy {
    fn default() -> Self {
        Self {
            heartbeat_weight: 1,
            tx_weight: 1,
            escrow_weight: 1,
            gov_weight: 1,
            daily_cap: crate::constants::DEFAULT_DAILY_ENGAGEMENT_CAP,
            max_minutes_per_heartbeat: crate::constants::DEFAULT_MAX_MINUTES_PER_HEARTBEAT,
            lambda_numerator: crate::constants::DEFAULT_LAMBDA_NUMERATOR,
            lambda_denominator: crate::constants::DEFAULT_LAMBDA_DENOMINATOR,
        }
    }
}

/// Reward emission + split configuration for one epoch.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RewardPolicy {
    pub epoch_length_blocks: u64,
    pub emission_per_epoch: Balance,
    pub validator_bps: u32,
    pub staker_bps: u32,
    pub engagement_bps: u32,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            epoch_length_blocks: crate::constants::DEFAULT_EPOCH_LENGTH_BLOCKS,
            emission_per_epoch: 0,
            validator_bps: 0,
            staker_bps: 0,
            engagement_bps: 0,
        }
    }
}
