//! The account record: the single per-address state object every module
//! reads and mutates. Two token ledgers (NHB, ZNHB) share one record rather
//! than being split into separate per-token accounts, per the data model.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Balance, Nonce};

/// Full on-chain account state as stored under the `accounts` namespace.
///
/// Accounts are never deleted once referenced; a missing account reads as
/// the zero value and is materialised in storage on first write.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub nonce: Nonce,
    pub balance_nhb: Balance,
    pub balance_znhb: Balance,
    /// ZNHB currently locked in a POTSO stake (subset of `balance_znhb`'s
    /// original funding; moved out of the spendable balance while locked).
    pub stake: Balance,
    /// Engagement EMA score, updated at day rollover.
    pub engagement_score: u64,
    /// Raw engagement minutes credited so far in the current day (pre-rollover).
    pub engagement_minutes_today: u64,
    /// Calendar day (days since epoch) of the last heartbeat credit, used to
    /// detect day-boundary rollovers.
    pub last_engagement_day: i64,
    /// Primary alias, if one has been registered for this address (mirror of
    /// the identity module's reverse index, kept here for O(1) reads).
    pub username: Option<String>,
    /// Whether this account currently holds the given named role
    /// (`MINTER_NHB`, `MINTER_ZNHB`, `ARBITRATOR`, `SWAP_MINT_AUTHORITY`, …).
    /// Stored as a sorted, de-duplicated list; role checks are linear scans
    /// since the list is expected to stay small per account.
    pub roles: Vec<String>,
}

impl Account {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn grant_role(&mut self, role: &str) {
        if !self.has_role(role) {
            self.roles.push(role.to_string());
            self.roles.sort();
        }
    }

    pub fn revoke_role(&mut self, role: &str) {
        self.roles.retain(|r| r != role);
    }

    /// Spendable ZNHB: total balance minus the amount currently locked in a
    /// POTSO stake.
    pub fn spendable_znhb(&self) -> Balance {
        self.balance_znhb.saturating_sub(self.stake)
    }

    pub fn balance_of(&self, token: &str) -> Balance {
        match token {
            crate::constants::TOKEN_NHB => self.balance_nhb,
            crate::constants::TOKEN_ZNHB => self.balance_znhb,
            _ => 0,
        }
    }

    pub fn credit(&mut self, token: &str, amount: Balance) {
        match token {
            crate::constants::TOKEN_NHB => self.balance_nhb = self.balance_nhb.saturating_add(amount),
            crate::constants::TOKEN_ZNHB => self.balance_znhb = self.balance_znhb.saturating_add(amount),
            _ => {}
        }
    }

    pub fn debit(&mut self, token: &str, amount: Balance) -> Result<(), crate::error::NhbError> {
        let have = self.balance_of(token);
        if have < amount {
            return Err(crate::error::NhbError::InsufficientFunds { need: amount, have });
        }
        match token {
            crate::constants::TOKEN_NHB => self.balance_nhb -= amount,
            crate::constants::TOKEN_ZNHB => self.balance_znhb -= amount,
            _ => {}
        }
        Ok(())
    }
}

/// A reference to an account either by its raw address or by a registered
/// alias; modules resolve this to an `Address` via the identity index
/// before touching balances.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum AccountRef {
    Address(Address),
    Alias(String),
}
