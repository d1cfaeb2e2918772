//! Escrow and Trade record types. Trade couples two escrows by ID rather
//! than holding references, breaking the escrow↔trade cyclic dependency
//! the design notes call out: resolution always goes back through the
//! state manager by ID.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Balance, Hash32, Timestamp};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum EscrowState {
    Init,
    Funded,
    Released,
    Refunded,
    Disputed,
    Expired,
    Resolved,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Escrow {
    pub id: Hash32,
    pub payer: Address,
    pub payee: Address,
    pub token: String,
    pub amount: Balance,
    pub fee_bps: u32,
    pub deadline: Timestamp,
    pub mediator: Option<Address>,
    pub meta: [u8; 32],
    pub realm: String,
    pub state: EscrowState,
}

impl Escrow {
    pub fn fee(&self) -> Balance {
        self.amount
            .saturating_mul(self.fee_bps as u128)
            .saturating_div(crate::constants::BPS_DENOMINATOR as u128)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TradeState {
    Init,
    Funded,
    Settled,
    Disputed,
    Resolved,
    Expired,
}

/// Couples two escrows (base leg, quote leg) under one atomically-settled
/// trade ID.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    pub id: Hash32,
    pub offer_id: Hash32,
    pub buyer: Address,
    pub seller: Address,
    pub escrow_base: Hash32,
    pub escrow_quote: Hash32,
    pub deadline: Timestamp,
    pub state: TradeState,
}
