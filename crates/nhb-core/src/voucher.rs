//! Signed admission vouchers: the off-chain-authorised mint and the
//! fiat-onramp swap, plus the risk-limit state the swap module maintains
//! per recipient address.

use serde::{Deserialize, Serialize};

use crate::account::AccountRef;
use crate::types::{Address, Balance, ChainId, Timestamp};

/// A signed mint voucher, canonically encoded (sorted-key JSON per §6) and
/// hashed with keccak-256 before the 65-byte recoverable signature is
/// checked against it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MintVoucher {
    pub invoice_id: String,
    pub recipient: AccountRef,
    pub token: String,
    /// Decimal amount string, as carried on the wire (`amount(decimal)`).
    pub amount: String,
    pub chain_id: ChainId,
    pub expiry: Timestamp,
}

/// A signed fiat-onramp swap voucher submission.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SwapVoucherSubmission {
    pub domain: String,
    pub chain_id: ChainId,
    pub token: String,
    /// Amount in the token's smallest unit (wei-equivalent).
    pub amount: Balance,
    pub recipient: Address,
    pub fiat: String,
    /// Fiat amount, scaled by `fiat_decimals` (an integer to keep the
    /// voucher's canonical encoding free of floating point).
    pub fiat_amount: u128,
    pub fiat_decimals: u8,
    /// Oracle rate: token smallest-units per 1 unit of fiat, scaled by
    /// `10^rate_decimals`.
    pub rate: u128,
    pub rate_decimals: u8,
    pub nonce: String,
    pub order_id: String,
    pub expiry: Timestamp,
    pub provider: String,
    pub provider_tx_id: String,
}

/// A consumed swap voucher, recorded once minted so `provider_tx_id` and
/// `order_id` cannot be replayed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SwapVoucherRecord {
    pub order_id: String,
    pub provider_tx_id: String,
    pub recipient: Address,
    pub token: String,
    pub minted: Balance,
    pub minted_at: Timestamp,
    pub price_proof_id: String,
    pub reversed: bool,
}

/// Per-address risk counters the swap module consults before minting.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SwapRiskState {
    /// `(timestamp, amount)` pairs within the velocity window; pruned lazily.
    pub recent: Vec<(Timestamp, Balance)>,
    pub day_key: i64,
    pub day_total: Balance,
    pub month_key: i64,
    pub month_total: Balance,
}

/// Risk limits configuration, hot-swappable under its own lock alongside
/// the swap config and oracle handle.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SwapRiskLimits {
    pub min_per_tx: Balance,
    pub max_per_tx: Balance,
    pub daily_cap: Balance,
    pub monthly_cap: Balance,
    pub velocity_window_secs: i64,
    pub velocity_max_amount: Balance,
}

impl Default for SwapRiskLimits {
    fn default() -> Self {
        Self {
            min_per_tx: 0,
            max_per_tx: u128::MAX,
            daily_cap: u128::MAX,
            monthly_cap: u128::MAX,
            velocity_window_secs: crate::constants::DEFAULT_VELOCITY_WINDOW_SECS,
            velocity_max_amount: u128::MAX,
        }
    }
}

/// Swap module configuration, hot-swappable under its own read/write lock.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SwapConfig {
    pub allowed_providers: Vec<String>,
    pub supported_fiat: Vec<String>,
    pub max_quote_age_secs: i64,
    pub slippage_bps: u32,
    pub sanctions_enabled: bool,
    pub sanctioned_addresses: Vec<Address>,
    pub mint_paused: Vec<String>,
    pub risk_limits: SwapRiskLimits,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            allowed_providers: Vec::new(),
            supported_fiat: vec!["USD".to_string()],
            max_quote_age_secs: crate::constants::DEFAULT_MAX_QUOTE_AGE_SECS,
            slippage_bps: crate::constants::DEFAULT_SLIPPAGE_BPS,
            sanctions_enabled: false,
            sanctioned_addresses: Vec::new(),
            mint_paused: Vec::new(),
            risk_limits: SwapRiskLimits::default(),
        }
    }
}

/// A price quote returned by the (externally-supplied) price-oracle
/// adapter. `rate` is token smallest-units per 1 unit of fiat, scaled by
/// `10^rate_decimals`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PriceQuote {
    pub pair: String,
    pub rate: u128,
    pub rate_decimals: u8,
    pub observed_at: Timestamp,
    pub proof_id: String,
}
