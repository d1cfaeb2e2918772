//! Escrow: two-party payment held in a notional vault until released,
//! refunded, disputed or expired.

use nhb_core::types::{Address, Balance, Hash32, Timestamp};
use nhb_core::{Escrow, EscrowState, Event, NhbError};

use crate::manager::StateManager;

#[allow(clippy::too_many_arguments)]
pub fn create(
    sm: &mut StateManager,
    id: Hash32,
    payer: Address,
    payee: Address,
    token: String,
    amount: Balance,
    fee_bps: u32,
    deadline: Timestamp,
    mediator: Option<Address>,
    meta: [u8; 32],
    realm: String,
) -> Result<Vec<nhb_core::Event>, NhbError> {
    if sm.escrow(&id)?.is_some() {
        return Err(NhbError::InvalidPayload(format!(
            "escrow id already exists: {}",
            id.to_hex()
        )));
    }
    let escrow = Escrow {
        id,
        payer,
        payee,
        token,
        amount,
        fee_bps,
        deadline,
        mediator,
        meta,
        realm,
        state: EscrowState::Init,
    };
    sm.put_escrow(&escrow)?;
    Ok(vec![Event::new("escrow_created")
        .hex_attr("id", id.as_bytes())
        .addr_attr("payer", payer)
        .addr_attr("payee", payee)
        .amount_attr("amount", amount)])
}

fn load(sm: &StateManager, id: Hash32) -> Result<Escrow, NhbError> {
    sm.escrow(&id)?
        .ok_or_else(|| NhbError::EscrowNotFound(id.to_hex()))
}

pub fn fund(sm: &mut StateManager, id: Hash32, from: Address) -> Result<Vec<Event>, NhbError> {
    let mut escrow = load(sm, id)?;
    if escrow.state != EscrowState::Init {
        return Err(NhbError::EscrowInvalidState);
    }
    if from != escrow.payer {
        return Err(NhbError::EscrowInvalidState);
    }
    let total = escrow.amount.saturating_add(escrow.fee());
    sm.debit(&from, &escrow.token, total)?;
    escrow.state = EscrowState::Funded;
    sm.put_escrow(&escrow)?;
    Ok(vec![Event::new("escrow_funded")
        .hex_attr("id", id.as_bytes())
        .addr_attr("from", from)
        .amount_attr("amount", total)])
}

pub fn release(sm: &mut StateManager, id: Hash32, caller: Address) -> Result<Vec<Event>, NhbError> {
    let mut escrow = load(sm, id)?;
    if escrow.state != EscrowState::Funded && escrow.state != EscrowState::Disputed {
        return Err(NhbError::EscrowInvalidState);
    }
    if caller != escrow.payer && Some(caller) != escrow.mediator {
        return Err(NhbError::EscrowInvalidState);
    }
    let fee = escrow.fee();
    sm.credit(&escrow.payee, &escrow.token, escrow.amount)?;
    if fee > 0 {
        sm.credit(&treasury_address(), &escrow.token, fee)?;
    }
    escrow.state = EscrowState::Released;
    sm.put_escrow(&escrow)?;
    Ok(vec![Event::new("escrow_released")
        .hex_attr("id", id.as_bytes())
        .addr_attr("payee", escrow.payee)
        .amount_attr("amount", escrow.amount)])
}

pub fn refund(sm: &mut StateManager, id: Hash32, caller: Address) -> Result<Vec<Event>, NhbError> {
    let mut escrow = load(sm, id)?;
    if escrow.state != EscrowState::Funded && escrow.state != EscrowState::Disputed {
        return Err(NhbError::EscrowInvalidState);
    }
    if caller != escrow.payee && Some(caller) != escrow.mediator {
        return Err(NhbError::EscrowInvalidState);
    }
    let total = escrow.amount.saturating_add(escrow.fee());
    sm.credit(&escrow.payer, &escrow.token, total)?;
    escrow.state = EscrowState::Refunded;
    sm.put_escrow(&escrow)?;
    Ok(vec![Event::new("escrow_refunded")
        .hex_attr("id", id.as_bytes())
        .addr_attr("payer", escrow.payer)
        .amount_attr("amount", total)])
}

pub fn expire(sm: &mut StateManager, id: Hash32, now: Timestamp) -> Result<Vec<Event>, NhbError> {
    let mut escrow = load(sm, id)?;
    if escrow.state != EscrowState::Funded {
        return Err(NhbError::EscrowInvalidState);
    }
    if now <= escrow.deadline {
        return Err(NhbError::EscrowInvalidState);
    }
    let total = escrow.amount.saturating_add(escrow.fee());
    sm.credit(&escrow.payer, &escrow.token, total)?;
    escrow.state = EscrowState::Expired;
    sm.put_escrow(&escrow)?;
    Ok(vec![Event::new("escrow_expired").hex_attr("id", id.as_bytes())])
}

pub fn dispute(sm: &mut StateManager, id: Hash32, caller: Address) -> Result<Vec<Event>, NhbError> {
    let mut escrow = load(sm, id)?;
    if escrow.state != EscrowState::Funded {
        return Err(NhbError::EscrowInvalidState);
    }
    if caller != escrow.payer && caller != escrow.payee {
        return Err(NhbError::EscrowInvalidState);
    }
    escrow.state = EscrowState::Disputed;
    sm.put_escrow(&escrow)?;
    Ok(vec![Event::new("escrow_disputed").hex_attr("id", id.as_bytes())])
}

pub enum ResolveOutcome {
    Release,
    Refund,
}

pub fn resolve(
    sm: &mut StateManager,
    id: Hash32,
    arbitrator: Address,
    outcome: ResolveOutcome,
) -> Result<Vec<Event>, NhbError> {
    let escrow = load(sm, id)?;
    if escrow.state != EscrowState::Disputed {
        return Err(NhbError::EscrowInvalidState);
    }
    if !sm.account(&arbitrator)?.has_role(nhb_core::constants::ROLE_ARBITRATOR) {
        return Err(NhbError::EscrowInvalidState);
    }
    match outcome {
        ResolveOutcome::Release => release(sm, id, escrow.payer),
        ResolveOutcome::Refund => refund(sm, id, escrow.payee),
    }
}

/// The fee sink every escrow/trade fee lands in. A fixed, well-known
/// address rather than a configurable field, matching the single-treasury
/// design the module contract implies.
pub fn treasury_address() -> Address {
    Address::from_bytes([0xEEu8; 20])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::{Trie, EMPTY_TRIE_ROOT};
    use nhb_core::constants::TOKEN_NHB;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn manager() -> (tempfile::TempDir, Trie) {
        let dir = tempdir().unwrap();
        let storage = Arc::new(crate::storage::Storage::open(dir.path()).unwrap());
        (dir, Trie::open(storage, EMPTY_TRIE_ROOT))
    }

    #[test]
    fn fund_then_release_moves_balance_to_payee() {
        let (_dir, mut trie) = manager();
        let mut sm = StateManager::new(&mut trie);
        let payer = Address::from_bytes([1u8; 20]);
        let payee = Address::from_bytes([2u8; 20]);
        sm.credit(&payer, TOKEN_NHB, 1_000).unwrap();

        let id = Hash32::from_bytes([7u8; 32]);
        create(
            &mut sm,
            id,
            payer,
            payee,
            TOKEN_NHB.to_string(),
            500,
            0,
            1_000,
            None,
            [0u8; 32],
            "default".to_string(),
        )
        .unwrap();
        fund(&mut sm, id, payer).unwrap();
        release(&mut sm, id, payer).unwrap();

        assert_eq!(sm.account(&payee).unwrap().balance_nhb, 500);
        assert_eq!(sm.account(&payer).unwrap().balance_nhb, 500);
    }

    #[test]
    fn release_before_funding_is_rejected() {
        let (_dir, mut trie) = manager();
        let mut sm = StateManager::new(&mut trie);
        let payer = Address::from_bytes([1u8; 20]);
        let payee = Address::from_bytes([2u8; 20]);
        let id = Hash32::from_bytes([9u8; 32]);
        create(
            &mut sm,
            id,
            payer,
            payee,
            TOKEN_NHB.to_string(),
            500,
            0,
            1_000,
            None,
            [0u8; 32],
            "default".to_string(),
        )
        .unwrap();
        let err = release(&mut sm, id, payer).unwrap_err();
        assert!(matches!(err, NhbError::EscrowInvalidState));
    }
}
