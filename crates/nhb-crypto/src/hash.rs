use sha3::{Digest, Keccak256};

use nhb_core::types::Address;

/// keccak256 of arbitrary bytes.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let out = hasher.finalize();
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&out);
    arr
}

/// Derive an `Address` from an uncompressed secp256k1 public key (65 bytes,
/// `0x04 || X || Y`): the low 20 bytes of `keccak256(X || Y)`, i.e. the
/// pubkey with its leading `0x04` prefix stripped.
pub fn address_from_pubkey(uncompressed_pubkey: &[u8]) -> Address {
    let body = if uncompressed_pubkey.first() == Some(&0x04) {
        &uncompressed_pubkey[1..]
    } else {
        uncompressed_pubkey
    };
    let digest = keccak256(body);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[12..]);
    Address::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak256_of_empty_matches_known_digest() {
        let digest = keccak256(b"");
        assert_eq!(
            hex::encode(digest),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn address_from_pubkey_strips_leading_prefix_byte() {
        let mut uncompressed = vec![0x04u8];
        uncompressed.extend_from_slice(&[7u8; 64]);
        let with_prefix = address_from_pubkey(&uncompressed);
        let without_prefix = address_from_pubkey(&uncompressed[1..]);
        assert_eq!(with_prefix, without_prefix);
    }
}
