//! Hash-time-locked payouts: funds sit in a notional vault until someone
//! presents the preimage of `hash_lock`, or the deadline passes.

use nhb_core::types::{Address, Balance, Hash32, Timestamp};
use nhb_core::{Claimable, ClaimableStatus, Event, NhbError};
use nhb_crypto::keccak256;

use crate::manager::StateManager;

#[allow(clippy::too_many_arguments)]
pub fn create(
    sm: &mut StateManager,
    id: Hash32,
    payer: Address,
    token: String,
    amount: Balance,
    hash_lock: Hash32,
    deadline: Timestamp,
    recipient_hint: Option<Address>,
) -> Result<Vec<Event>, NhbError> {
    if sm.claimable(&id)?.is_some() {
        return Err(NhbError::InvalidPayload(format!(
            "claimable id already exists: {}",
            id.to_hex()
        )));
    }
    sm.debit(&payer, &token, amount)?;
    let claimable = Claimable {
        id,
        payer,
        token,
        amount,
        hash_lock,
        deadline,
        recipient_hint,
        status: ClaimableStatus::Init,
    };
    sm.put_claimable(&claimable)?;
    Ok(vec![Event::new("claimable_created")
        .hex_attr("id", id.as_bytes())
        .addr_attr("payer", payer)
        .amount_attr("amount", amount)])
}

fn load(sm: &StateManager, id: Hash32) -> Result<Claimable, NhbError> {
    sm.claimable(&id)?
        .ok_or_else(|| NhbError::ClaimableNotFound(id.to_hex()))
}

pub fn claim(
    sm: &mut StateManager,
    id: Hash32,
    preimage: &[u8],
    claimant: Address,
) -> Result<Vec<Event>, NhbError> {
    let mut claimable = load(sm, id)?;
    if claimable.status != ClaimableStatus::Init {
        return Err(NhbError::ClaimableInvalidState);
    }
    if Hash32::from_bytes(keccak256(preimage)) != claimable.hash_lock {
        return Err(NhbError::ClaimableInvalidPreimage);
    }
    sm.credit(&claimant, &claimable.token, claimable.amount)?;
    claimable.status = ClaimableStatus::Claimed;
    sm.put_claimable(&claimable)?;
    Ok(vec![Event::new("claimable_claimed")
        .hex_attr("id", id.as_bytes())
        .addr_attr("claimant", claimant)
        .amount_attr("amount", claimable.amount)])
}

pub fn expire(sm: &mut StateManager, id: Hash32, now: Timestamp) -> Result<Vec<Event>, NhbError> {
    let mut claimable = load(sm, id)?;
    if claimable.status != ClaimableStatus::Init || now <= claimable.deadline {
        return Err(NhbError::ClaimableInvalidState);
    }
    sm.credit(&claimable.payer, &claimable.token, claimable.amount)?;
    claimable.status = ClaimableStatus::Expired;
    sm.put_claimable(&claimable)?;
    Ok(vec![Event::new("claimable_expired").hex_attr("id", id.as_bytes())])
}

pub fn cancel(sm: &mut StateManager, id: Hash32, caller: Address) -> Result<Vec<Event>, NhbError> {
    let mut claimable = load(sm, id)?;
    if claimable.status != ClaimableStatus::Init {
        return Err(NhbError::ClaimableInvalidState);
    }
    if caller != claimable.payer {
        return Err(NhbError::ClaimableInvalidState);
    }
    sm.credit(&claimable.payer, &claimable.token, claimable.amount)?;
    claimable.status = ClaimableStatus::Cancelled;
    sm.put_claimable(&claimable)?;
    Ok(vec![Event::new("claimable_cancelled").hex_attr("id", id.as_bytes())])
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
    fn claim_with_correct_preimage_pays_claimant() {
        let (_dir, mut trie) = manager();
        let mut sm = StateManager::new(&mut trie);
        let payer = Address::from_bytes([1u8; 20]);
        let claimant = Address::from_bytes([2u8; 20]);
        sm.credit(&payer, TOKEN_NHB, 1_000).unwrap();

        let id = Hash32::from_bytes([3u8; 32]);
        let preimage = b"secret";
        let hash_lock = Hash32::from_bytes(keccak256(preimage));
        create(&mut sm, id, payer, TOKEN_NHB.to_string(), 100, hash_lock, 1_000, None).unwrap();

        claim(&mut sm, id, preimage, claimant).unwrap();
        assert_eq!(sm.account(&claimant).unwrap().balance_nhb, 100);
    }

    #[test]
    fn claim_with_wrong_preimage_is_rejected() {
        let (_dir, mut trie) = manager();
        let mut sm = StateManager::new(&mut trie);
        let payer = Address::from_bytes([1u8; 20]);
        sm.credit(&payer, TOKEN_NHB, 1_000).unwrap();

        let id = Hash32::from_bytes([4u8; 32]);
        let hash_lock = Hash32::from_bytes(keccak256(b"secret"));
        create(&mut sm, id, payer, TOKEN_NHB.to_string(), 100, hash_lock, 1_000, None).unwrap();

        let err = claim(&mut sm, id, b"wrong", payer).unwrap_err();
        assert!(matches!(err, NhbError::ClaimableInvalidPreimage));
    }
}
