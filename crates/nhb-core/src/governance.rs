//! Governance proposal records and the policy that gates proposal lifecycle
//! transitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Address, Balance, Timestamp};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProposalStatus {
    Deposited,
    Voting,
    Rejected,
    Passed,
    Queued,
    Executed,
    Expired,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Tally {
    pub yes: Balance,
    pub no: Balance,
    pub abstain: Balance,
}

impl Default for Tally {
    fn default() -> Self {
        Self {
            yes: 0,
            no: 0,
            abstain: 0,
        }
    }
}

impl Tally {
    pub fn total(&self) -> Balance {
        self.yes + self.no + self.abstain
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum VoteChoice {
    Yes,
    No,
    Abstain,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Proposal {
    pub id: u64,
    pub kind: String,
    /// Opaque, module-interpreted payload (e.g. a parameter-change request).
    pub payload: Vec<u8>,
    pub proposer: Address,
    pub deposit: Balance,
    pub status: ProposalStatus,
    pub voting_end: Timestamp,
    pub timelock_end: Timestamp,
    pub tally: Tally,
    /// Voters who have already cast a vote, so re-votes are rejected rather
    /// than silently double-counted.
    pub voters: BTreeMap<Address, VoteChoice>,
}

/// Governance policy, hot-swappable under its own read/write lock per the
/// concurrency model so it can change without blocking state execution.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GovernancePolicy {
    pub voting_period_secs: i64,
    pub timelock_secs: i64,
    pub min_deposit: Balance,
    pub allowed_params: Vec<String>,
    pub quorum_bps: u32,
    pub pass_threshold_bps: u32,
}

impl Default for GovernancePolicy {
    fn default() -> Self {
        Self {
            voting_period_secs: crate::constants::DEFAULT_VOTING_PERIOD_SECS,
            timelock_secs: crate::constants::DEFAULT_TIMELOCK_SECS,
            min_deposit: crate::constants::DEFAULT_MIN_DEPOSIT,
            allowed_params: Vec::new(),
            quorum_bps: crate::constants::DEFAULT_QUORUM_BPS,
            pass_threshold_bps: crate::constants::DEFAULT_PASS_THRESHOLD_BPS,
        }
    }
}
