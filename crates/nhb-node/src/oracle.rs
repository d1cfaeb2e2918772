//! HTTP price-oracle adapter: the node's real-world implementation of
//! `nhb_state::modules::swap::OracleClient`. Swap vouchers are validated
//! against whatever this returns; the price feed itself lives outside this
//! repository's trust boundary.

use nhb_core::types::Timestamp;
use nhb_core::{NhbError, PriceQuote};
use nhb_state::modules::swap::OracleClient;

/// Queries a price feed over HTTP, GET `{base_url}/quote/{pair}` returning a
/// JSON body shaped like `PriceQuote`. Blocking by design: `OracleClient` is
/// called from inside `StateProcessor::apply_transaction`, itself always
/// run on a `spawn_blocking` thread (§5), so an async client would gain
/// nothing here but a runtime-nesting headache.
pub struct HttpOracle {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpOracle {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl OracleClient for HttpOracle {
    fn quote(&self, pair: &str) -> Result<PriceQuote, NhbError> {
        let url = format!("{}/quote/{}", self.base_url, pair);
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| NhbError::Storage(format!("oracle request failed: {e}")))?;
        resp.json::<PriceQuote>()
            .map_err(|e| NhbError::Storage(format!("oracle response malformed: {e}")))
    }
}

/// Fixed-quote oracle for local development and tests: never makes a network
/// call, always reports the same rate as of the moment it's asked.
pub struct FixedOracle {
    pub pair: String,
    pub rate: u128,
    pub rate_decimals: u8,
}

impl OracleClient for FixedOracle {
    fn quote(&self, pair: &str) -> Result<PriceQuote, NhbError> {
        if pair != self.pair {
            return Err(NhbError::InvalidPayload(format!(
                "no oracle quote configured for pair {pair}"
            )));
        }
        Ok(PriceQuote {
            pair: self.pair.clone(),
            rate: self.rate,
            rate_decimals: self.rate_decimals,
            observed_at: now(),
            proof_id: "fixed-oracle".to_string(),
        })
    }
}

fn now() -> Timestamp {
    chrono::Utc::now().timestamp()
}
