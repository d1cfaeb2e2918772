//! The active validator set: who is eligible to propose/vote in the
//! external BFT engine and how much weight each carries. Finality itself is
//! the BFT engine's concern; this crate only tracks the roster it consults.

use std::collections::BTreeMap;

use nhb_core::types::{Address, Balance};

/// Per-validator bookkeeping the node controller tracks alongside stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorInfo {
    pub power: Balance,
}

/// The current validator roster, ordered by address so iteration and
/// `ranked()` output are deterministic across nodes.
#[derive(Debug, Clone, Default)]
pub struct ValidatorSet {
    validators: BTreeMap<Address, ValidatorInfo>,
}

impl ValidatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, addr: Address, power: Balance) {
        self.validators.insert(addr, ValidatorInfo { power });
    }

    pub fn remove(&mut self, addr: &Address) {
        self.validators.remove(addr);
    }

    pub fn get(&self, addr: &Address) -> Option<&ValidatorInfo> {
        self.validators.get(addr)
    }

    pub fn is_validator(&self, addr: &Address) -> bool {
        self.validators.contains_key(addr)
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.validators.keys().copied().collect()
    }

    /// `GetValidatorSet()`'s wire shape: a deep copy, never an alias into the
    /// set the node holds internally.
    pub fn power_map(&self) -> BTreeMap<Address, Balance> {
        self.validators.iter().map(|(addr, info)| (*addr, info.power)).collect()
    }

    /// Validators ordered by power descending, ties broken by address for a
    /// deterministic total order.
    pub fn ranked(&self) -> Vec<(Address, Balance)> {
        let mut list: Vec<_> = self.validators.iter().map(|(a, i)| (*a, i.power)).collect();
        list.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    #[test]
    fn ranked_by_power_descending() {
        let mut vs = ValidatorSet::new();
        vs.add(addr(1), 100);
        vs.add(addr(2), 500);
        vs.add(addr(3), 250);
        let ranked = vs.ranked();
        assert_eq!(ranked[0], (addr(2), 500));
        assert_eq!(ranked[1], (addr(3), 250));
        assert_eq!(ranked[2], (addr(1), 100));
    }

    #[test]
    fn power_map_is_a_deep_copy() {
        let mut vs = ValidatorSet::new();
        vs.add(addr(1), 10);
        let mut snapshot = vs.power_map();
        snapshot.insert(addr(2), 20);
        assert_eq!(vs.len(), 1);
    }
}
