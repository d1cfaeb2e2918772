pub mod hash;
pub mod keypair;
pub mod voucher;

pub use hash::{address_from_pubkey, keccak256};
pub use keypair::{recover_address, recover_signer, KeyPair};
pub use voucher::{
    hash_mint_voucher, hash_swap_voucher, recover_mint_voucher_signer, recover_swap_voucher_signer,
};
