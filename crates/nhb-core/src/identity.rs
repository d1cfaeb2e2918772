//! Identity/alias record types: a forward index (alias → primary address)
//! and a reverse index (address → alias), kept consistent by the identity
//! module on every rename.

use serde::{Deserialize, Serialize};

use crate::types::Address;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IdentityRecord {
    /// Normalised (trimmed, lowercased) alias string — the forward-index key.
    pub alias: String,
    pub primary: Address,
    pub secondary: Vec<Address>,
    pub avatar_ref: Option<String>,
}

impl IdentityRecord {
    pub fn new(alias: String, primary: Address) -> Self {
        Self {
            alias,
            primary,
            secondary: Vec::new(),
            avatar_ref: None,
        }
    }
}

/// Normalise a raw alias string: trim whitespace, lowercase.
pub fn normalize_alias(raw: &str) -> String {
    raw.trim().to_lowercase()
}
