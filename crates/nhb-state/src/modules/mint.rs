//! Signed mint vouchers: an off-chain authority vouches for a credit to a
//! recipient, admitted once (`invoice_id` replay guard), before expiry, by a
//! signer holding the token's minter role.

use nhb_core::types::{Address, Balance, ChainId, Timestamp};
use nhb_core::{AccountRef, Event, MintVoucher, NhbError};
use nhb_crypto::recover_mint_voucher_signer;

use crate::manager::StateManager;
use crate::modules::identity;

fn minter_role_for(token: &str) -> Result<&'static str, NhbError> {
    match token {
        nhb_core::constants::TOKEN_NHB => Ok(nhb_core::constants::ROLE_MINTER_NHB),
        nhb_core::constants::TOKEN_ZNHB => Ok(nhb_core::constants::ROLE_MINTER_ZNHB),
        other => Err(NhbError::InvalidPayload(format!("unknown mint token: {other}"))),
    }
}

fn resolve_recipient(sm: &StateManager, recipient: &AccountRef) -> Result<Address, NhbError> {
    match recipient {
        AccountRef::Address(addr) => Ok(*addr),
        AccountRef::Alias(alias) => identity::resolve(sm, alias),
    }
}

/// Validate and apply a signed mint voucher. Returns the mint amount and the
/// events the credit produced. Order of checks matches §4.4: chain id,
/// expiry, signature recovery + role, then invoice replay.
pub fn mint_with_signature(
    sm: &mut StateManager,
    voucher: &MintVoucher,
    signature: &nhb_core::types::Signature,
    chain_id: ChainId,
    now: Timestamp,
) -> Result<(Balance, Vec<Event>), NhbError> {
    if voucher.chain_id != chain_id {
        return Err(NhbError::MintInvalidChainId {
            expected: chain_id,
            got: voucher.chain_id,
        });
    }
    if voucher.expiry <= now {
        return Err(NhbError::MintExpired { expiry: voucher.expiry });
    }
    if signature.as_bytes().len() != 65 {
        return Err(NhbError::InvalidSignature);
    }
    let signer = recover_mint_voucher_signer(voucher, signature)?;
    let role = minter_role_for(&voucher.token)?;
    if !sm.account(&signer)?.has_role(role) {
        return Err(NhbError::MintInvalidSigner);
    }
    if sm.invoice_used(&voucher.invoice_id)? {
        return Err(NhbError::MintInvoiceUsed(voucher.invoice_id.clone()));
    }

    let amount: Balance = voucher
        .amount
        .parse()
        .map_err(|_| NhbError::InvalidPayload(format!("malformed mint amount: {}", voucher.amount)))?;
    let recipient = resolve_recipient(sm, &voucher.recipient)?;

    sm.credit(&recipient, &voucher.token, amount)?;
    sm.mark_invoice_used(&voucher.invoice_id)?;

    Ok((
        amount,
        vec![Event::new("mint_completed")
            .attr("invoice_id", voucher.invoice_id.clone())
            .addr_attr("recipient", recipient)
            .attr("token", voucher.token.clone())
            .amount_attr("amount", amount)
            .addr_attr("signer", signer)],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::{Trie, EMPTY_TRIE_ROOT};
    use nhb_core::constants::{ROLE_MINTER_NHB, TOKEN_NHB};
    use nhb_crypto::KeyPair;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn manager() -> (tempfile::TempDir, Trie) {
        let dir = tempdir().unwrap();
        let storage = Arc::new(crate::storage::Storage::open(dir.path()).unwrap());
        (dir, Trie::open(storage, EMPTY_TRIE_ROOT))
    }

    fn sample(recipient: Address) -> MintVoucher {
        MintVoucher {
            invoice_id: "inv-1".to_string(),
            recipient: AccountRef::Address(recipient),
            token: TOKEN_NHB.to_string(),
            amount: "10".to_string(),
            chain_id: 7,
            expiry: 2_000_000_000,
        }
    }

    #[test]
    fn valid_voucher_credits_recipient_once() {
        let (_dir, mut trie) = manager();
        let mut sm = StateManager::new(&mut trie);
        let minter = KeyPair::generate();
        let mut minter_account = sm.account(&minter.address).unwrap();
        minter_account.grant_role(ROLE_MINTER_NHB);
        sm.put_account(&minter.address, &minter_account).unwrap();

        let recipient = Address::from_bytes([9u8; 20]);
        let voucher = sample(recipient);
        let digest = nhb_crypto::hash_mint_voucher(&voucher).unwrap();
        let sig = minter.sign_digest(&digest);

        let (amount, _events) = mint_with_signature(&mut sm, &voucher, &sig, 7, 0).unwrap();
        assert_eq!(amount, 10);
        assert_eq!(sm.account(&recipient).unwrap().balance_nhb, 10);

        let err = mint_with_signature(&mut sm, &voucher, &sig, 7, 0).unwrap_err();
        assert!(matches!(err, NhbError::MintInvoiceUsed(_)));
    }

    #[test]
    fn wrong_chain_id_is_rejected() {
        let (_dir, mut trie) = manager();
        let mut sm = StateManager::new(&mut trie);
        let minter = KeyPair::generate();
        let voucher = sample(Address::from_bytes([1u8; 20]));
        let digest = nhb_crypto::hash_mint_voucher(&voucher).unwrap();
        let sig = minter.sign_digest(&digest);
        let err = mint_with_signature(&mut sm, &voucher, &sig, 99, 0).unwrap_err();
        assert!(matches!(err, NhbError::MintInvalidChainId { .. }));
    }

    #[test]
    fn signer_without_role_is_rejected() {
        let (_dir, mut trie) = manager();
        let mut sm = StateManager::new(&mut trie);
        let minter = KeyPair::generate();
        let voucher = sample(Address::from_bytes([1u8; 20]));
        let digest = nhb_crypto::hash_mint_voucher(&voucher).unwrap();
        let sig = minter.sign_digest(&digest);
        let err = mint_with_signature(&mut sm, &voucher, &sig, 7, 0).unwrap_err();
        assert!(matches!(err, NhbError::MintInvalidSigner));
    }

    #[test]
    fn expired_voucher_is_rejected() {
        let (_dir, mut trie) = manager();
        let mut sm = StateManager::new(&mut trie);
        let minter = KeyPair::generate();
        let mut voucher = sample(Address::from_bytes([1u8; 20]));
        voucher.expiry = 10;
        let digest = nhb_crypto::hash_mint_voucher(&voucher).unwrap();
        let sig = minter.sign_digest(&digest);
        let err = mint_with_signature(&mut sm, &voucher, &sig, 7, 1_000).unwrap_err();
        assert!(matches!(err, NhbError::MintExpired { .. }));
    }
}
