//! Fiat-onramp swap vouchers: a provider-signed submission is admitted once
//! a chain of checks passes — domain, chain id, expiry, provider allow-list,
//! sanctions, risk limits, signer authority, mint-pause, oracle freshness
//! and slippage — then mints to the recipient and records the voucher so
//! `order_id`/`provider_tx_id` cannot be replayed.
//!
//! The price oracle itself is an external collaborator (§1); this module
//! only names the contract it needs from one (`OracleClient`).

use nhb_core::types::{Address, Balance, ChainId, Timestamp};
use nhb_core::{Event, NhbError, PriceQuote, SwapVoucherRecord, SwapVoucherSubmission};
use nhb_crypto::recover_swap_voucher_signer;

use crate::manager::StateManager;

/// The boundary the swap module needs from the (externally supplied)
/// price-oracle adapter: the latest quote for a fiat/token pair.
pub trait OracleClient {
    fn quote(&self, pair: &str) -> Result<PriceQuote, NhbError>;
}

fn day_key(ts: Timestamp) -> i64 {
    ts.div_euclid(nhb_core::constants::DAY_SECS)
}

fn month_key(ts: Timestamp) -> i64 {
    day_key(ts) / 30
}

/// Recompute the expected minted amount from the fiat leg and the oracle
/// rate: `round(fiat_amount * rate * 10^(token_decimals - fiat_decimals - rate_decimals))`,
/// using integer multiply-then-divide so the result is exact and
/// reproducible across nodes.
fn expected_mint_amount(
    fiat_amount: u128,
    fiat_decimals: u8,
    rate: u128,
    rate_decimals: u8,
    token_decimals: u8,
) -> Balance {
    let numerator = fiat_amount.saturating_mul(rate);
    let shift = token_decimals as i32 - fiat_decimals as i32 - rate_decimals as i32;
    if shift >= 0 {
        numerator.saturating_mul(10u128.saturating_pow(shift as u32))
    } else {
        let divisor = 10u128.saturating_pow((-shift) as u32);
        if divisor == 0 {
            0
        } else {
            numerator / divisor
        }
    }
}

fn bps_deviation(actual: Balance, expected: Balance) -> u32 {
    if expected == 0 {
        return if actual == 0 { 0 } else { u32::MAX };
    }
    let diff = actual.abs_diff(expected);
    let scaled = diff.saturating_mul(nhb_core::constants::BPS_DENOMINATOR as u128);
    (scaled / expected).min(u32::MAX as u128) as u32
}

#[allow(clippy::too_many_arguments)]
pub fn submit_voucher(
    sm: &mut StateManager,
    oracle: &dyn OracleClient,
    submission: &SwapVoucherSubmission,
    signature: &nhb_core::types::Signature,
    chain_id: ChainId,
    token_decimals: u8,
    now: Timestamp,
) -> Result<(Balance, Vec<Event>), NhbError> {
    if submission.domain != nhb_core::constants::SWAP_VOUCHER_DOMAIN {
        return Err(NhbError::SwapInvalidDomain);
    }
    if submission.chain_id != chain_id {
        return Err(NhbError::SwapInvalidChainId {
            expected: chain_id,
            got: submission.chain_id,
        });
    }
    if submission.expiry <= now {
        return Err(NhbError::SwapExpired { expiry: submission.expiry });
    }
    if submission.amount == 0 {
        return Err(NhbError::InvalidPayload("swap amount must be non-zero".into()));
    }
    if submission.nonce.is_empty() || submission.order_id.is_empty() {
        return Err(NhbError::InvalidPayload("swap nonce/order id must be non-empty".into()));
    }

    let config = sm.swap_config()?;
    if !config.allowed_providers.iter().any(|p| p == &submission.provider) {
        return Err(NhbError::SwapProviderNotAllowed(submission.provider.clone()));
    }
    if !config.supported_fiat.iter().any(|f| f == &submission.fiat) {
        return Err(NhbError::SwapUnsupportedFiat(submission.fiat.clone()));
    }
    if config.sanctions_enabled
        && config.sanctioned_addresses.iter().any(|a| *a == submission.recipient)
    {
        return Err(NhbError::SwapSanctioned(submission.recipient.to_bech32()));
    }
    if config.mint_paused.iter().any(|t| t == &submission.token) {
        return Err(NhbError::SwapMintPaused);
    }

    let limits = &config.risk_limits;
    if submission.amount < limits.min_per_tx {
        return Err(NhbError::SwapAmountBelowMinimum {
            amount: submission.amount,
            min: limits.min_per_tx,
        });
    }
    if submission.amount > limits.max_per_tx {
        return Err(NhbError::SwapAmountAboveMaximum {
            amount: submission.amount,
            max: limits.max_per_tx,
        });
    }

    if sm.order_id_used(&submission.order_id)? {
        return Err(NhbError::SwapDuplicateProviderTx(submission.order_id.clone()));
    }
    if sm.swap_voucher(&submission.provider_tx_id)?.is_some() {
        return Err(NhbError::SwapDuplicateProviderTx(submission.provider_tx_id.clone()));
    }

    if signature.as_bytes().len() != 65 {
        return Err(NhbError::InvalidSignature);
    }
    let signer = recover_swap_voucher_signer(submission, signature)?;
    if !sm
        .account(&signer)?
        .has_role(nhb_core::constants::ROLE_SWAP_MINT_AUTHORITY)
    {
        return Err(NhbError::SwapInvalidSigner);
    }

    let mut risk = sm.swap_risk_state(&submission.recipient)?;
    let day = day_key(now);
    let month = month_key(now);
    if risk.day_key != day {
        risk.day_key = day;
        risk.day_total = 0;
    }
    if risk.month_key != month {
        risk.month_key = month;
        risk.month_total = 0;
    }
    risk.recent
        .retain(|(ts, _)| now - *ts <= limits.velocity_window_secs);
    let velocity_total: Balance = risk.recent.iter().map(|(_, amt)| *amt).sum::<Balance>()
        + submission.amount;
    if velocity_total > limits.velocity_max_amount {
        return Err(NhbError::SwapVelocityExceeded);
    }
    let new_day_total = risk.day_total.saturating_add(submission.amount);
    if new_day_total > limits.daily_cap {
        return Err(NhbError::SwapDailyCapExceeded {
            amount: submission.amount,
            already: risk.day_total,
            cap: limits.daily_cap,
        });
    }
    let new_month_total = risk.month_total.saturating_add(submission.amount);
    if new_month_total > limits.monthly_cap {
        return Err(NhbError::SwapMonthlyCapExceeded {
            amount: submission.amount,
            already: risk.month_total,
            cap: limits.monthly_cap,
        });
    }

    let pair = format!("{}/{}", submission.token, submission.fiat);
    let quote = oracle
        .quote(&pair)
        .map_err(|_| NhbError::SwapOracleUnavailable(pair.clone()))?;
    let quote_age = now - quote.observed_at;
    if quote_age > config.max_quote_age_secs {
        return Err(NhbError::SwapQuoteStale {
            age_secs: quote_age,
            max_secs: config.max_quote_age_secs,
        });
    }

    let expected = expected_mint_amount(
        submission.fiat_amount,
        submission.fiat_decimals,
        quote.rate,
        quote.rate_decimals,
        token_decimals,
    );
    let deviation_bps = bps_deviation(submission.amount, expected);
    if deviation_bps > config.slippage_bps {
        return Err(NhbError::SwapSlippageExceeded {
            actual_bps: deviation_bps,
            max_bps: config.slippage_bps,
        });
    }

    sm.credit(&submission.recipient, &submission.token, submission.amount)?;
    sm.mark_order_id_used(&submission.order_id)?;

    risk.day_total = new_day_total;
    risk.month_total = new_month_total;
    risk.recent.push((now, submission.amount));
    sm.put_swap_risk_state(&submission.recipient, &risk)?;

    let record = SwapVoucherRecord {
        order_id: submission.order_id.clone(),
        provider_tx_id: submission.provider_tx_id.clone(),
        recipient: submission.recipient,
        token: submission.token.clone(),
        minted: submission.amount,
        minted_at: now,
        price_proof_id: quote.proof_id.clone(),
        reversed: false,
    };
    sm.put_swap_voucher(&record)?;

    let events = vec![
        Event::new("swap_minted")
            .attr("order_id", submission.order_id.clone())
            .addr_attr("recipient", submission.recipient)
            .attr("token", submission.token.clone())
            .amount_attr("amount", submission.amount)
            .addr_attr("signer", signer),
        Event::new("swap_mint_proof")
            .attr("order_id", submission.order_id.clone())
            .attr("price_proof_id", quote.proof_id),
    ];
    Ok((submission.amount, events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::{Trie, EMPTY_TRIE_ROOT};
    use nhb_core::constants::{ROLE_SWAP_MINT_AUTHORITY, SWAP_VOUCHER_DOMAIN, TOKEN_NHB};
    use nhb_core::SwapConfig;
    use nhb_crypto::KeyPair;
    use std::sync::Arc;
    use tempfile::tempdir;

    struct FixedOracle(PriceQuote);
    impl OracleClient for FixedOracle {
        fn quote(&self, _pair: &str) -> Result<PriceQuote, NhbError> {
            Ok(self.0.clone())
        }
    }

    fn manager() -> (tempfile::TempDir, Trie) {
        let dir = tempdir().unwrap();
        let storage = Arc::new(crate::storage::Storage::open(dir.path()).unwrap());
        (dir, Trie::open(storage, EMPTY_TRIE_ROOT))
    }

    fn sample(recipient: Address) -> SwapVoucherSubmission {
        SwapVoucherSubmission {
            domain: SWAP_VOUCHER_DOMAIN.to_string(),
            chain_id: 7,
            token: TOKEN_NHB.to_string(),
            amount: 100,
            recipient,
            fiat: "USD".to_string(),
            fiat_amount: 100,
            fiat_decimals: 0,
            rate: 1,
            rate_decimals: 0,
            nonce: "n1".to_string(),
            order_id: "o1".to_string(),
            expiry: 2_000_000_000,
            provider: "acme".to_string(),
            provider_tx_id: "ptx-1".to_string(),
        }
    }

    fn configured_manager() -> (tempfile::TempDir, Trie, KeyPair) {
        let (dir, mut trie) = manager();
        let authority = KeyPair::generate();
        {
            let mut sm = StateManager::new(&mut trie);
            let mut config = SwapConfig::default();
            config.allowed_providers.push("acme".to_string());
            sm.put_swap_config(&config).unwrap();
            let mut acct = sm.account(&authority.address).unwrap();
            acct.grant_role(ROLE_SWAP_MINT_AUTHORITY);
            sm.put_account(&authority.address, &acct).unwrap();
        }
        (dir, trie, authority)
    }

    #[test]
    fn exact_rate_mints_expected_amount() {
        let (_dir, mut trie, authority) = configured_manager();
        let mut sm = StateManager::new(&mut trie);
        let recipient = Address::from_bytes([5u8; 20]);
        let voucher = sample(recipient);
        let digest = nhb_crypto::hash_swap_voucher(&voucher).unwrap();
        let sig = authority.sign_digest(&digest);
        let oracle = FixedOracle(PriceQuote {
            pair: "NHB/USD".to_string(),
            rate: 1,
            rate_decimals: 0,
            observed_at: 0,
            proof_id: "proof-1".to_string(),
        });

        let (amount, _events) =
            submit_voucher(&mut sm, &oracle, &voucher, &sig, 7, 0, 0).unwrap();
        assert_eq!(amount, 100);
        assert_eq!(sm.account(&recipient).unwrap().balance_nhb, 100);
    }

    #[test]
    fn slippage_beyond_tolerance_is_rejected() {
        let (_dir, mut trie, authority) = configured_manager();
        let mut sm = StateManager::new(&mut trie);
        let recipient = Address::from_bytes([5u8; 20]);
        let mut voucher = sample(recipient);
        voucher.amount = 200; // expected 100, 100% deviation
        let digest = nhb_crypto::hash_swap_voucher(&voucher).unwrap();
        let sig = authority.sign_digest(&digest);
        let oracle = FixedOracle(PriceQuote {
            pair: "NHB/USD".to_string(),
            rate: 1,
            rate_decimals: 0,
            observed_at: 0,
            proof_id: "proof-1".to_string(),
        });

        let err = submit_voucher(&mut sm, &oracle, &voucher, &sig, 7, 0, 0).unwrap_err();
        assert!(matches!(err, NhbError::SwapSlippageExceeded { .. }));
    }

    #[test]
    fn duplicate_order_id_is_rejected() {
        let (_dir, mut trie, authority) = configured_manager();
        let mut sm = StateManager::new(&mut trie);
        let recipient = Address::from_bytes([5u8; 20]);
        let voucher = sample(recipient);
        let digest = nhb_crypto::hash_swap_voucher(&voucher).unwrap();
        let sig = authority.sign_digest(&digest);
        let oracle = FixedOracle(PriceQuote {
            pair: "NHB/USD".to_string(),
            rate: 1,
            rate_decimals: 0,
            observed_at: 0,
            proof_id: "proof-1".to_string(),
        });
        submit_voucher(&mut sm, &oracle, &voucher, &sig, 7, 0, 0).unwrap();

        let mut replay = voucher.clone();
        replay.provider_tx_id = "ptx-2".to_string();
        let digest2 = nhb_crypto::hash_swap_voucher(&replay).unwrap();
        let sig2 = authority.sign_digest(&digest2);
        let err = submit_voucher(&mut sm, &oracle, &replay, &sig2, 7, 0, 0).unwrap_err();
        assert!(matches!(err, NhbError::SwapDuplicateProviderTx(_)));
    }
}
