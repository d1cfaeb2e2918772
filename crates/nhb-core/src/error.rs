use thiserror::Error;

/// The closed catalog of domain error kinds a validating node can produce.
/// Each variant is a distinct "kind" the rest of the system (RPC error
/// codes, test assertions, log messages) matches on by name.
#[derive(Debug, Error)]
pub enum NhbError {
    // ── Transaction / chain-id ───────────────────────────────────────────────
    #[error("invalid chain id: expected {expected}, got {got}")]
    InvalidChainId { expected: u64, got: u64 },

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid nonce: expected {expected}, got {got}")]
    InvalidNonce { expected: u64, got: u64 },

    #[error("insufficient funds: need {need}, have {have}")]
    InsufficientFunds { need: u128, have: u128 },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("paymaster not authorized for this transaction")]
    PaymasterUnauthorized,

    // ── Mempool ──────────────────────────────────────────────────────────────
    #[error("mempool is full (limit {limit})")]
    MempoolFull { limit: usize },

    // ── Block / chain linkage ────────────────────────────────────────────────
    #[error("block linkage invalid: expected prev hash {expected_prev}, height {expected_height}")]
    BlockLinkage {
        expected_prev: String,
        expected_height: u64,
    },

    #[error("tx root mismatch: expected {expected}, computed {computed}")]
    TxRootMismatch { expected: String, computed: String },

    #[error("state root mismatch: expected {expected}, computed {computed}")]
    StateRootMismatch { expected: String, computed: String },

    #[error("block timestamp {ts} out of window [{min}, {max}]")]
    BlockTimestampOutOfWindow { ts: i64, min: i64, max: i64 },

    // ── Identity ─────────────────────────────────────────────────────────────
    #[error("alias already taken: {0}")]
    AliasTaken(String),

    #[error("caller does not own this alias")]
    NotAliasOwner,

    // ── Escrow / Trade ───────────────────────────────────────────────────────
    #[error("escrow is not in a valid state for this transition")]
    EscrowInvalidState,

    #[error("escrow not found: {0}")]
    EscrowNotFound(String),

    #[error("trade not found: {0}")]
    TradeNotFound(String),

    // ── Mint voucher ─────────────────────────────────────────────────────────
    #[error("mint voucher signer lacks the required minter role")]
    MintInvalidSigner,

    #[error("mint invoice already used: {0}")]
    MintInvoiceUsed(String),

    #[error("mint voucher expired at {expiry}")]
    MintExpired { expiry: i64 },

    #[error("mint voucher chain id mismatch: expected {expected}, got {got}")]
    MintInvalidChainId { expected: u64, got: u64 },

    // ── Swap voucher ─────────────────────────────────────────────────────────
    #[error("swap voucher has an invalid domain string")]
    SwapInvalidDomain,

    #[error("swap voucher chain id mismatch: expected {expected}, got {got}")]
    SwapInvalidChainId { expected: u64, got: u64 },

    #[error("swap voucher expired at {expiry}")]
    SwapExpired { expiry: i64 },

    #[error("swap voucher references an unsupported token: {0}")]
    SwapInvalidToken(String),

    #[error("swap voucher signer is not the configured mint authority for this token")]
    SwapInvalidSigner,

    #[error("swap voucher nonce already used: {0}")]
    SwapNonceUsed(String),

    #[error("minting is paused for this token")]
    SwapMintPaused,

    #[error("unsupported fiat currency: {0}")]
    SwapUnsupportedFiat(String),

    #[error("price oracle unavailable for pair {0}")]
    SwapOracleUnavailable(String),

    #[error("price oracle quote is stale (age {age_secs}s > max {max_secs}s)")]
    SwapQuoteStale { age_secs: i64, max_secs: i64 },

    #[error("swap slippage exceeded: {actual_bps} bps > {max_bps} bps")]
    SwapSlippageExceeded { actual_bps: u32, max_bps: u32 },

    #[error("duplicate provider transaction id: {0}")]
    SwapDuplicateProviderTx(String),

    #[error("provider is not on the allow-list: {0}")]
    SwapProviderNotAllowed(String),

    #[error("swap amount below minimum: {amount} < {min}")]
    SwapAmountBelowMinimum { amount: u128, min: u128 },

    #[error("swap amount above maximum: {amount} > {max}")]
    SwapAmountAboveMaximum { amount: u128, max: u128 },

    #[error("swap daily cap exceeded: {amount} + {already} > {cap}")]
    SwapDailyCapExceeded {
        amount: u128,
        already: u128,
        cap: u128,
    },

    #[error("swap monthly cap exceeded: {amount} + {already} > {cap}")]
    SwapMonthlyCapExceeded {
        amount: u128,
        already: u128,
        cap: u128,
    },

    #[error("swap velocity limit exceeded")]
    SwapVelocityExceeded,

    #[error("recipient is sanctioned: {0}")]
    SwapSanctioned(String),

    #[error("swap voucher was never minted: {0}")]
    SwapVoucherNotMinted(String),

    #[error("swap voucher was already reversed: {0}")]
    SwapVoucherAlreadyReversed(String),

    // ── Claimable ────────────────────────────────────────────────────────────
    #[error("claimable not found: {0}")]
    ClaimableNotFound(String),

    #[error("preimage does not match the stored hash-lock")]
    ClaimableInvalidPreimage,

    #[error("claimable is not in a valid state for this transition")]
    ClaimableInvalidState,

    // ── Governance ───────────────────────────────────────────────────────────
    #[error("governance proposal not found: {0}")]
    ProposalNotFound(String),

    #[error("governance proposal is not in a valid state for this transition")]
    ProposalInvalidState,

    #[error("deposit below minimum required: {min}")]
    ProposalDepositTooLow { min: u128 },

    #[error("parameter not in the allowed set: {0}")]
    ProposalParamNotAllowed(String),

    // ── POTSO staking ────────────────────────────────────────────────────────
    #[error("stake lock not found: {0}")]
    StakeLockNotFound(String),

    #[error("stake lock has not matured")]
    StakeNotMatured,

    // ── Serialization / storage (ambient, not a spec-named kind) ────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    // ── Genesis ──────────────────────────────────────────────────────────────
    #[error("genesis supply mismatch for {token}: expected {expected}, got {got}")]
    GenesisSupplyMismatch {
        token: String,
        expected: u128,
        got: u128,
    },

    #[error("invalid genesis spec: {0}")]
    InvalidGenesis(String),

    // ── Catch-all (ambient, matches the source's own escape hatch) ──────────
    #[error("{0}")]
    Other(String),
}

impl From<bincode::Error> for NhbError {
    fn from(e: bincode::Error) -> Self {
        NhbError::Serialization(e.to_string())
    }
}
