//! The event type every module transition emits: a small closed sum type,
//! not an open-ended subtype hierarchy, per the design notes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Address, Balance};

/// One module-transition event. `attributes` is ordered (`BTreeMap`) so two
/// identically-built events serialise identically.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    #[serde(rename = "type")]
    pub ty: String,
    pub attributes: BTreeMap<String, String>,
}

impl Event {
    pub fn new(ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Addresses are encoded as bech32 per the attribute-encoding rule.
    pub fn addr_attr(self, key: impl Into<String>, addr: Address) -> Self {
        self.attr(key, addr.to_bech32())
    }

    /// Amounts are encoded as decimal strings.
    pub fn amount_attr(self, key: impl Into<String>, amount: Balance) -> Self {
        self.attr(key, amount.to_string())
    }

    /// Binary identifiers are encoded as `0x`-prefixed lower-hex.
    pub fn hex_attr(self, key: impl Into<String>, bytes: &[u8]) -> Self {
        self.attr(key, format!("0x{}", hex::encode(bytes)))
    }
}
