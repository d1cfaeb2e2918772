//! Canonical voucher hashing: mint and swap vouchers are signed off-chain
//! over a sorted-key JSON encoding rather than the tx-side bincode scheme,
//! so any client that can produce stable JSON can also produce a valid
//! signature.

use serde::Serialize;

use nhb_core::types::{Address, Signature};
use nhb_core::{MintVoucher, NhbError, SwapVoucherSubmission};

use crate::hash::keccak256;
use crate::keypair::recover_address;

/// Serialize a voucher to canonical JSON: `serde_json::Value`'s object map
/// is a `BTreeMap`, so keys come out sorted regardless of struct field order.
fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, NhbError> {
    let as_value =
        serde_json::to_value(value).map_err(|e| NhbError::Serialization(e.to_string()))?;
    serde_json::to_vec(&as_value).map_err(|e| NhbError::Serialization(e.to_string()))
}

/// keccak256 digest of a voucher's canonical JSON encoding.
pub fn hash_mint_voucher(voucher: &MintVoucher) -> Result<[u8; 32], NhbError> {
    Ok(keccak256(&canonical_json(voucher)?))
}

pub fn hash_swap_voucher(voucher: &SwapVoucherSubmission) -> Result<[u8; 32], NhbError> {
    Ok(keccak256(&canonical_json(voucher)?))
}

/// Recover the signer of a mint voucher from its accompanying signature.
pub fn recover_mint_voucher_signer(
    voucher: &MintVoucher,
    signature: &Signature,
) -> Result<Address, NhbError> {
    recover_address(&hash_mint_voucher(voucher)?, signature)
}

/// Recover the signer of a swap voucher submission from its signature.
pub fn recover_swap_voucher_signer(
    voucher: &SwapVoucherSubmission,
    signature: &Signature,
) -> Result<Address, NhbError> {
    recover_address(&hash_swap_voucher(voucher)?, signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nhb_core::account::AccountRef;
    use crate::keypair::KeyPair;

    fn sample_voucher(recipient: Address) -> MintVoucher {
        MintVoucher {
            invoice_id: "inv-1".to_string(),
            recipient: AccountRef::Address(recipient),
            token: "NHB".to_string(),
            amount: "10.0".to_string(),
            chain_id: 1,
            expiry: 1_700_000_000,
        }
    }

    #[test]
    fn mint_voucher_round_trips_through_sign_and_recover() {
        let kp = KeyPair::generate();
        let recipient = KeyPair::generate().address;
        let voucher = sample_voucher(recipient);
        let digest = hash_mint_voucher(&voucher).unwrap();
        let sig = kp.sign_digest(&digest);
        let recovered = recover_mint_voucher_signer(&voucher, &sig).unwrap();
        assert_eq!(recovered, kp.address);
    }

    #[test]
    fn changing_amount_changes_hash_and_invalidates_signature() {
        let kp = KeyPair::generate();
        let recipient = KeyPair::generate().address;
        let original = sample_voucher(recipient);
        let sig = kp.sign_digest(&hash_mint_voucher(&original).unwrap());

        let mut tampered = original.clone();
        tampered.amount = "1000.0".to_string();

        assert_ne!(
            hash_mint_voucher(&original).unwrap(),
            hash_mint_voucher(&tampered).unwrap()
        );
        let recovered = recover_mint_voucher_signer(&tampered, &sig).unwrap();
        assert_ne!(recovered, kp.address);
    }
}
