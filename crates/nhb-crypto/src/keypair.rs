use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use zeroize::Zeroizing;

use nhb_core::types::{Address, PubKey, Signature};
use nhb_core::NhbError;

use crate::hash::{address_from_pubkey, keccak256};

/// A node/wallet keypair: a secp256k1 secret key plus its derived address.
/// The secret key is held in a `Zeroizing` buffer to wipe memory on drop.
pub struct KeyPair {
    pub address: Address,
    pub public_key: PubKey,
    secret_key: Zeroizing<[u8; 32]>,
}

impl KeyPair {
    /// Generate a fresh keypair using the global RNG.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let mut rng = rand::thread_rng();
        let (sk, pk) = secp.generate_keypair(&mut rng);
        Self::from_secret(sk, pk)
    }

    /// Restore a keypair from a raw 32-byte secret key.
    pub fn from_bytes(sk_bytes: [u8; 32]) -> Result<Self, NhbError> {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&sk_bytes)
            .map_err(|e| NhbError::Other(format!("invalid secret key: {e}")))?;
        let pk = PublicKey::from_secret_key(&secp, &sk);
        Ok(Self::from_secret(sk, pk))
    }

    fn from_secret(sk: SecretKey, pk: PublicKey) -> Self {
        let uncompressed = pk.serialize_uncompressed();
        let address = address_from_pubkey(&uncompressed);
        Self {
            address,
            public_key: PubKey(uncompressed.to_vec()),
            secret_key: Zeroizing::new(sk.secret_bytes()),
        }
    }

    /// Sign a 32-byte message digest, producing a 65-byte `r || s || v`
    /// recoverable signature.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Signature {
        let secp = Secp256k1::signing_only();
        let sk = SecretKey::from_slice(&*self.secret_key).expect("stored secret key is valid");
        let msg = Message::from_digest(*digest);
        let recoverable = secp.sign_ecdsa_recoverable(&msg, &sk);
        let (recovery_id, compact) = recoverable.serialize_compact();
        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&compact);
        bytes[64] = recovery_id.to_i32() as u8;
        Signature(bytes)
    }

    /// Sign arbitrary bytes: hashes with keccak256, then signs the digest.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.sign_digest(&keccak256(message))
    }

    /// The raw 32-byte secret key, for a caller that needs to persist it
    /// (e.g. a validator key file) or hand it to `from_bytes` again later.
    /// Copies out of the `Zeroizing` buffer; callers are responsible for
    /// not leaving the copy lying around longer than they must.
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        *self.secret_key
    }
}

/// Recover the signer's address from a 65-byte recoverable signature over a
/// 32-byte digest. Returns `InvalidSignature` on any malformed input or
/// recovery failure.
pub fn recover_address(digest: &[u8; 32], signature: &Signature) -> Result<Address, NhbError> {
    let bytes = signature.as_bytes();
    let recovery_id =
        RecoveryId::from_i32(bytes[64] as i32).map_err(|_| NhbError::InvalidSignature)?;
    let recoverable = RecoverableSignature::from_compact(&bytes[..64], recovery_id)
        .map_err(|_| NhbError::InvalidSignature)?;
    let secp = Secp256k1::verification_only();
    let msg = Message::from_digest(*digest);
    let pubkey = secp
        .recover_ecdsa(&msg, &recoverable)
        .map_err(|_| NhbError::InvalidSignature)?;
    Ok(address_from_pubkey(&pubkey.serialize_uncompressed()))
}

/// Recover the signer's address from a 65-byte signature over arbitrary
/// bytes (hashed with keccak256 first).
pub fn recover_signer(message: &[u8], signature: &Signature) -> Result<Address, NhbError> {
    recover_address(&keccak256(message), signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_recover_round_trips() {
        let kp = KeyPair::generate();
        let sig = kp.sign(b"transfer 10 NHB");
        let recovered = recover_signer(b"transfer 10 NHB", &sig).unwrap();
        assert_eq!(recovered, kp.address);
    }

    #[test]
    fn tampered_message_recovers_different_address() {
        let kp = KeyPair::generate();
        let sig = kp.sign(b"original");
        let recovered = recover_signer(b"tampered", &sig).unwrap();
        assert_ne!(recovered, kp.address);
    }

    #[test]
    fn from_bytes_reproduces_same_address() {
        let kp = KeyPair::generate();
        let sk_bytes = *kp.secret_key;
        let restored = KeyPair::from_bytes(sk_bytes).unwrap();
        assert_eq!(restored.address, kp.address);
    }
}
