pub mod claimable;
pub mod escrow;
pub mod governance;
pub mod identity;
pub mod mint;
pub mod potso;
pub mod rewards;
pub mod swap;
pub mod trade;
