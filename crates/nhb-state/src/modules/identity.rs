//! Identity/alias registration. `SetAlias` is atomic across the forward
//! (alias -> record) and reverse (address -> alias) indexes so a rename
//! never leaves the two views inconsistent.

use nhb_core::types::Address;
use nhb_core::{normalize_alias, Event, IdentityRecord, NhbError};

use crate::manager::StateManager;

pub fn set_alias(sm: &mut StateManager, addr: Address, raw: &str) -> Result<Vec<Event>, NhbError> {
    let alias = normalize_alias(raw);
    if let Some(existing) = sm.identity_by_alias(&alias)? {
        if existing.primary != addr {
            return Err(NhbError::AliasTaken(alias));
        }
    }

    let old_alias = sm.reverse_alias(&addr)?;
    if let Some(ref old) = old_alias {
        if old != &alias {
            sm.remove_identity_alias(old)?;
        }
    }

    let record = IdentityRecord::new(alias.clone(), addr);
    sm.put_identity(&record)?;
    sm.set_reverse_alias(&addr, &alias)?;

    let mut account = sm.account(&addr)?;
    account.username = Some(alias.clone());
    sm.put_account(&addr, &account)?;

    let mut event = Event::new("identity_alias_set")
        .addr_attr("address", addr)
        .attr("alias", alias.clone());
    if let Some(old) = old_alias.filter(|o| o != &alias) {
        event = event.attr("previous_alias", old);
    }
    Ok(vec![event])
}

pub fn resolve(sm: &StateManager, alias: &str) -> Result<Address, NhbError> {
    let normalized = normalize_alias(alias);
    sm.identity_by_alias(&normalized)?
        .map(|r| r.primary)
        .ok_or_else(|| NhbError::InvalidPayload(format!("no such alias: {normalized}")))
}

pub fn reverse(sm: &StateManager, addr: Address) -> Result<Option<String>, NhbError> {
    sm.reverse_alias(&addr)
}

pub fn add_secondary(
    sm: &mut StateManager,
    alias: &str,
    caller: Address,
    secondary: Address,
) -> Result<Vec<Event>, NhbError> {
    let normalized = normalize_alias(alias);
    let mut record = sm
        .identity_by_alias(&normalized)?
        .ok_or_else(|| NhbError::InvalidPayload(format!("no such alias: {normalized}")))?;
    if record.primary != caller {
        return Err(NhbError::NotAliasOwner);
    }
    if !record.secondary.contains(&secondary) {
        record.secondary.push(secondary);
    }
    sm.put_identity(&record)?;
    Ok(vec![Event::new("identity_secondary_added")
        .attr("alias", normalized)
        .addr_attr("secondary", secondary)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::{Trie, EMPTY_TRIE_ROOT};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn manager() -> (tempfile::TempDir, Trie) {
        let dir = tempdir().unwrap();
        let storage = Arc::new(crate::storage::Storage::open(dir.path()).unwrap());
        (dir, Trie::open(storage, EMPTY_TRIE_ROOT))
    }

    #[test]
    fn set_and_resolve_alias() {
        let (_dir, mut trie) = manager();
        let mut sm = StateManager::new(&mut trie);
        let a = Address::from_bytes([1u8; 20]);
        set_alias(&mut sm, a, "FrankRocks").unwrap();
        assert_eq!(resolve(&sm, "frankrocks").unwrap(), a);
    }

    #[test]
    fn rename_updates_reverse_index_and_frees_old_alias() {
        let (_dir, mut trie) = manager();
        let mut sm = StateManager::new(&mut trie);
        let a = Address::from_bytes([1u8; 20]);
        set_alias(&mut sm, a, "FrankRocks").unwrap();
        set_alias(&mut sm, a, "frankiE").unwrap();

        assert!(resolve(&sm, "frankrocks").is_err());
        assert_eq!(reverse(&sm, a).unwrap(), Some("frankie".to_string()));
    }

    #[test]
    fn second_owner_cannot_take_existing_alias() {
        let (_dir, mut trie) = manager();
        let mut sm = StateManager::new(&mut trie);
        let b = Address::from_bytes([2u8; 20]);
        let c = Address::from_bytes([3u8; 20]);
        set_alias(&mut sm, b, "shared").unwrap();
        let err = set_alias(&mut sm, c, "shared").unwrap_err();
        assert!(matches!(err, NhbError::AliasTaken(_)));
    }
}
