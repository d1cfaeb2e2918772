//! Protocol-wide constants for the NHB permissioned chain.

// ── Tokens ───────────────────────────────────────────────────────────────────

/// Native fee/utility token symbol.
pub const TOKEN_NHB: &str = "NHB";

/// Native staking/governance token symbol.
pub const TOKEN_ZNHB: &str = "ZNHB";

/// Decimal places both native tokens are denominated in.
pub const NATIVE_DECIMALS: u8 = 18;

/// Maximum decimals a genesis-declared token may use.
pub const MAX_TOKEN_DECIMALS: u8 = 18;

/// 1 whole token expressed in its smallest unit, at `NATIVE_DECIMALS`.
pub const ONE_TOKEN: u128 = 1_000_000_000_000_000_000;

// ── Roles ────────────────────────────────────────────────────────────────────

/// Role entitled to mint NHB via a signed mint voucher.
pub const ROLE_MINTER_NHB: &str = "MINTER_NHB";

/// Role entitled to mint ZNHB via a signed mint voucher.
pub const ROLE_MINTER_ZNHB: &str = "MINTER_ZNHB";

/// Role entitled to resolve disputed escrows and trades.
pub const ROLE_ARBITRATOR: &str = "ARBITRATOR";

/// Role entitled to submit fiat-onramp swap vouchers as a mint authority.
pub const ROLE_SWAP_MINT_AUTHORITY: &str = "SWAP_MINT_AUTHORITY";

// ── Block / timestamp tolerance ───────────────────────────────────────────────

/// Maximum allowed drift (seconds) between a proposed block's timestamp and
/// the committing node's wall clock.
pub const BLOCK_TIMESTAMP_TOLERANCE_SECS: i64 = 5;

// ── Transaction structural limits ─────────────────────────────────────────────

/// Maximum bytes allowed in a transaction's free-form `data` field.
pub const MAX_TX_DATA_BYTES: usize = 32 * 1024;

/// Maximum `gas_limit` a transaction may declare.
pub const MAX_GAS_LIMIT: u64 = 10_000_000;

// ── Mempool ──────────────────────────────────────────────────────────────────

/// Default bounded mempool size (0 disables the bound).
pub const DEFAULT_MEMPOOL_LIMIT: usize = 8_192;

// ── Escrow / Trade ─────────────────────────────────────────────────────────────

/// Maximum escrow fee, expressed in basis points (10%).
pub const MAX_ESCROW_FEE_BPS: u32 = 1_000;

/// Basis-point denominator used throughout the protocol.
pub const BPS_DENOMINATOR: u32 = 10_000;

// ── Governance ────────────────────────────────────────────────────────────────

/// Default governance voting period (seconds). 7 days.
pub const DEFAULT_VOTING_PERIOD_SECS: i64 = 7 * 24 * 3600;

/// Default governance timelock before execution (seconds). 2 days.
pub const DEFAULT_TIMELOCK_SECS: i64 = 2 * 24 * 3600;

/// Default minimum proposal deposit, in ZNHB smallest units.
pub const DEFAULT_MIN_DEPOSIT: u128 = 1_000 * ONE_TOKEN;

/// Default quorum, in basis points of total staked ZNHB.
pub const DEFAULT_QUORUM_BPS: u32 = 3_000;

/// Default pass threshold, in basis points of votes cast.
pub const DEFAULT_PASS_THRESHOLD_BPS: u32 = 5_000;

// ── Engagement / POTSO ─────────────────────────────────────────────────────────

/// Seconds in one engagement/reward day.
pub const DAY_SECS: i64 = 86_400;

/// Default maximum minutes credited per heartbeat.
pub const DEFAULT_MAX_MINUTES_PER_HEARTBEAT: u64 = 60;

/// Default daily cap on raw engagement minutes before EMA decay.
pub const DEFAULT_DAILY_ENGAGEMENT_CAP: u64 = 1_000;

/// Default EMA smoothing numerator/denominator (lambda = 1/2).
pub const DEFAULT_LAMBDA_NUMERATOR: u64 = 1;
pub const DEFAULT_LAMBDA_DENOMINATOR: u64 = 2;

/// Default delay between an unbond request and funds becoming withdrawable.
pub const DEFAULT_UNBONDING_PERIOD_DAYS: i64 = 21;

// ── Rewards ───────────────────────────────────────────────────────────────────

/// Length of one reward epoch, in blocks.
pub const DEFAULT_EPOCH_LENGTH_BLOCKS: u64 = 100;

/// Sum of the three reward-split basis-point buckets must not exceed this.
pub const MAX_REWARD_SPLIT_BPS: u32 = BPS_DENOMINATOR;

// ── Swap vouchers ─────────────────────────────────────────────────────────────

/// Maximum age (seconds) of a price-oracle quote used for a swap mint.
pub const DEFAULT_MAX_QUOTE_AGE_SECS: i64 = 300;

/// Default slippage tolerance, in basis points.
pub const DEFAULT_SLIPPAGE_BPS: u32 = 100;

/// Default per-address velocity window (seconds). 10 minutes.
pub const DEFAULT_VELOCITY_WINDOW_SECS: i64 = 600;

/// Canonical domain-separation string prefixing every swap voucher digest.
pub const SWAP_VOUCHER_DOMAIN: &str = "nhb-swap-voucher-v1";

// ── Claimable (hash-time-locked payouts) ──────────────────────────────────────

/// Length of a hash-lock preimage, in bytes, before hashing.
pub const MAX_PREIMAGE_BYTES: usize = 256;
