//! The genesis spec document: the JSON shape an operator hands a fresh node
//! on first start. Unknown fields are rejected so a typo in a config file
//! fails loudly instead of being silently ignored.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nhb_core::types::{Balance, ChainId};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NativeTokenSpec {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    #[serde(default)]
    pub mint_authority: Option<String>,
    #[serde(default)]
    pub initial_mint_paused: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ValidatorSpec {
    #[serde(default)]
    pub address: Option<String>,
    pub power: Balance,
    #[serde(default)]
    pub pub_key: Option<String>,
    #[serde(default)]
    pub moniker: Option<String>,
    #[serde(default)]
    pub auto_populate_local: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoyaltyGlobalSpec {
    #[serde(default)]
    pub heartbeat_weight: Option<u64>,
    #[serde(default)]
    pub tx_weight: Option<u64>,
    #[serde(default)]
    pub escrow_weight: Option<u64>,
    #[serde(default)]
    pub gov_weight: Option<u64>,
    #[serde(default)]
    pub daily_cap: Option<u64>,
    #[serde(default)]
    pub max_minutes_per_heartbeat: Option<u64>,
    #[serde(default)]
    pub lambda_numerator: Option<u64>,
    #[serde(default)]
    pub lambda_denominator: Option<u64>,
}

/// The top-level genesis document. `alloc` maps a bech32 address to a map of
/// token symbol to a decimal-string amount (smallest-unit integer, matching
/// the mint voucher's `amount` convention). `roles` maps a role name to the
/// bech32 addresses holding it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GenesisSpec {
    pub genesis_time: DateTime<Utc>,
    #[serde(default)]
    pub chain_id: Option<ChainId>,
    pub native_tokens: Vec<NativeTokenSpec>,
    pub validators: Vec<ValidatorSpec>,
    #[serde(default)]
    pub alloc: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub roles: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub loyalty_global: Option<LoyaltyGlobalSpec>,
}

/// A fixed, deterministic genesis used when an operator starts a node with
/// no genesis file and `allow_auto` set: one auto-populated validator (its
/// address filled in from the node's local key at bootstrap time), no
/// allocations, no roles. Not meant to be shared between nodes — each node
/// that synthesises it ends up with a different chain id, since the chain
/// id is derived from the local validator's address embedded nowhere in the
/// genesis block, but from the genesis hash the empty state produces.
pub fn dev_genesis() -> GenesisSpec {
    GenesisSpec {
        genesis_time: DateTime::from_timestamp(1_767_225_600, 0)
            .expect("fixed dev genesis timestamp is valid")
            .with_timezone(&Utc),
        chain_id: None,
        native_tokens: vec![
            NativeTokenSpec {
                symbol: nhb_core::constants::TOKEN_NHB.to_string(),
                name: "NHB".to_string(),
                decimals: nhb_core::constants::NATIVE_DECIMALS,
                mint_authority: None,
                initial_mint_paused: false,
            },
            NativeTokenSpec {
                symbol: nhb_core::constants::TOKEN_ZNHB.to_string(),
                name: "ZNHB".to_string(),
                decimals: nhb_core::constants::NATIVE_DECIMALS,
                mint_authority: None,
                initial_mint_paused: false,
            },
        ],
        validators: vec![ValidatorSpec {
            address: None,
            power: 1,
            pub_key: None,
            moniker: Some("dev".to_string()),
            auto_populate_local: true,
        }],
        alloc: BTreeMap::new(),
        roles: BTreeMap::new(),
        loyalty_global: None,
    }
}
