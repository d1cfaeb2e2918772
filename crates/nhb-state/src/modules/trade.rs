//! Trade: couples two escrows (base and quote leg) under one ID so both
//! settle atomically or neither does. Holds escrow IDs, never references,
//! per the design notes on breaking the trade<->escrow cycle.

use nhb_core::types::{Address, Balance, Hash32, Timestamp};
use nhb_core::{Event, NhbError, Trade, TradeState};

use crate::manager::StateManager;
use crate::modules::escrow;

#[allow(clippy::too_many_arguments)]
pub fn create_trade(
    sm: &mut StateManager,
    id: Hash32,
    offer_id: Hash32,
    buyer: Address,
    seller: Address,
    escrow_base_id: Hash32,
    escrow_quote_id: Hash32,
    base_token: String,
    base_amount: Balance,
    quote_token: String,
    quote_amount: Balance,
    deadline: Timestamp,
) -> Result<Vec<Event>, NhbError> {
    if sm.trade(&id)?.is_some() {
        return Err(NhbError::InvalidPayload(format!(
            "trade id already exists: {}",
            id.to_hex()
        )));
    }
    escrow::create(
        sm,
        escrow_base_id,
        buyer,
        seller,
        base_token,
        base_amount,
        0,
        deadline,
        None,
        [0u8; 32],
        "trade".to_string(),
    )?;
    escrow::create(
        sm,
        escrow_quote_id,
        seller,
        buyer,
        quote_token,
        quote_amount,
        0,
        deadline,
        None,
        [0u8; 32],
        "trade".to_string(),
    )?;
    let trade = Trade {
        id,
        offer_id,
        buyer,
        seller,
        escrow_base: escrow_base_id,
        escrow_quote: escrow_quote_id,
        deadline,
        state: TradeState::Init,
    };
    sm.put_trade(&trade)?;
    Ok(vec![Event::new("trade_created").hex_attr("id", id.as_bytes())])
}

fn load(sm: &StateManager, id: Hash32) -> Result<Trade, NhbError> {
    sm.trade(&id)?.ok_or_else(|| NhbError::TradeNotFound(id.to_hex()))
}

/// Both legs fund from the respective payer, advancing the trade to
/// `Funded` once both escrows report `Funded`.
pub fn fund_leg(sm: &mut StateManager, id: Hash32, funder: Address) -> Result<Vec<Event>, NhbError> {
    let mut trade = load(sm, id)?;
    let escrow_id = if funder == trade.buyer {
        trade.escrow_base
    } else if funder == trade.seller {
        trade.escrow_quote
    } else {
        return Err(NhbError::TradeNotFound(id.to_hex()));
    };
    let mut events = escrow::fund(sm, escrow_id, funder)?;
    let base = sm
        .escrow(&trade.escrow_base)?
        .ok_or_else(|| NhbError::EscrowNotFound(trade.escrow_base.to_hex()))?;
    let quote = sm
        .escrow(&trade.escrow_quote)?
        .ok_or_else(|| NhbError::EscrowNotFound(trade.escrow_quote.to_hex()))?;
    if base.state == nhb_core::EscrowState::Funded && quote.state == nhb_core::EscrowState::Funded {
        trade.state = TradeState::Funded;
        sm.put_trade(&trade)?;
        events.push(Event::new("trade_funded").hex_attr("id", id.as_bytes()));
    }
    Ok(events)
}

pub fn settle_atomic(sm: &mut StateManager, id: Hash32, caller: Address) -> Result<Vec<Event>, NhbError> {
    let mut trade = load(sm, id)?;
    if trade.state != TradeState::Funded {
        return Err(NhbError::EscrowInvalidState);
    }
    let mut events = escrow::release(sm, trade.escrow_base, caller)?;
    events.extend(escrow::release(sm, trade.escrow_quote, caller)?);
    trade.state = TradeState::Settled;
    sm.put_trade(&trade)?;
    events.push(Event::new("trade_settled").hex_attr("id", id.as_bytes()));
    Ok(events)
}

pub fn dispute(sm: &mut StateManager, id: Hash32, caller: Address) -> Result<Vec<Event>, NhbError> {
    let mut trade = load(sm, id)?;
    if trade.state != TradeState::Funded {
        return Err(NhbError::EscrowInvalidState);
    }
    if caller != trade.buyer && caller != trade.seller {
        return Err(NhbError::EscrowInvalidState);
    }
    escrow::dispute(sm, trade.escrow_base, caller)?;
    escrow::dispute(sm, trade.escrow_quote, caller)?;
    trade.state = TradeState::Disputed;
    sm.put_trade(&trade)?;
    Ok(vec![Event::new("trade_disputed").hex_attr("id", id.as_bytes())])
}

pub fn resolve(
    sm: &mut StateManager,
    id: Hash32,
    arbitrator: Address,
    outcome: escrow::ResolveOutcome,
) -> Result<Vec<Event>, NhbError> {
    let mut trade = load(sm, id)?;
    if trade.state != TradeState::Disputed {
        return Err(NhbError::EscrowInvalidState);
    }
    let base_outcome = match outcome {
        escrow::ResolveOutcome::Release => escrow::ResolveOutcome::Release,
        escrow::ResolveOutcome::Refund => escrow::ResolveOutcome::Refund,
    };
    let quote_outcome = match outcome {
        escrow::ResolveOutcome::Release => escrow::ResolveOutcome::Release,
        escrow::ResolveOutcome::Refund => escrow::ResolveOutcome::Refund,
    };
    let mut events = escrow::resolve(sm, trade.escrow_base, arbitrator, base_outcome)?;
    events.extend(escrow::resolve(sm, trade.escrow_quote, arbitrator, quote_outcome)?);
    trade.state = TradeState::Resolved;
    sm.put_trade(&trade)?;
    events.push(Event::new("trade_resolved").hex_attr("id", id.as_bytes()));
    Ok(events)
}
