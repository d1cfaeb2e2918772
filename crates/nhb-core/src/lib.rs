pub mod account;
pub mod bech32;
pub mod block;
pub mod claimable;
pub mod constants;
pub mod error;
pub mod escrow;
pub mod event;
pub mod governance;
pub mod identity;
pub mod payload;
pub mod potso;
pub mod transaction;
pub mod types;
pub mod voucher;

pub use account::{Account, AccountRef};
pub use block::{Block, BlockHeader, EMPTY_TX_ROOT};
pub use claimable::{Claimable, ClaimableStatus};
pub use error::NhbError;
pub use escrow::{Escrow, EscrowState, Trade, TradeState};
pub use event::Event;
pub use governance::{GovernancePolicy, Proposal, ProposalStatus, Tally, VoteChoice};
pub use identity::{normalize_alias, IdentityRecord};
pub use payload::{
    ClaimableClaimPayload, ClaimableCreatePayload, ClaimableIdPayload, EscrowCreatePayload,
    EscrowIdPayload, GovernanceIdPayload, GovernanceProposePayload, GovernanceVotePayload,
    HeartbeatPayload, MintPayload, RegisterIdentityPayload, ResolveOutcomeWire, ResolvePayload,
    StakeLockPayload, StakeUnbondPayload, StakeWithdrawPayload, SwapPayload, TradeCreatePayload,
    TradeIdPayload,
};
pub use potso::{EngagementMeter, EngagementPolicy, RewardPolicy, StakeLock, UnbondingEntry};
pub use transaction::{Transaction, TxKind};
pub use types::*;
pub use voucher::{
    MintVoucher, PriceQuote, SwapConfig, SwapRiskLimits, SwapRiskState, SwapVoucherRecord,
    SwapVoucherSubmission,
};
