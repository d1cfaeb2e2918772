//! Builds the genesis state a fresh node bootstraps from: an empty trie
//! seeded with `alloc` balances and `roles` grants, wrapped in a height-0
//! block, handed to `nhb_chain::Chain::init_with_genesis`.
//!
//! The chain id is not a field chosen by the genesis document's author (a
//! typo there would fork every node that copies it verbatim) — it is derived
//! from the genesis block's own hash, the same way a regular block's hash
//! is derived from its header. If the document names a `chainId` anyway, it
//! must match the derived value or the genesis is rejected.

pub mod params;

pub use params::{dev_genesis, GenesisSpec, LoyaltyGlobalSpec, NativeTokenSpec, ValidatorSpec};

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use nhb_chain::Chain;
use nhb_consensus::ValidatorSet;
use nhb_core::types::{Address, Balance, ChainId};
use nhb_core::{constants, Block, BlockHeader, NhbError, EMPTY_TX_ROOT};
use nhb_state::{StateManager, Storage, Trie, EMPTY_TRIE_ROOT};

/// Read and parse a genesis document from disk.
pub fn load_spec(path: &Path) -> Result<GenesisSpec, NhbError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| NhbError::InvalidGenesis(format!("reading {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| NhbError::InvalidGenesis(format!("parsing {}: {e}", path.display())))
}

/// Load a genesis document from `path`, or synthesise the fixed "dev"
/// genesis when `path` is `None` and `allow_auto` is `true`. Fails outright
/// when no file is given and auto-synthesis is disabled — a node must never
/// silently start a throwaway chain in that case.
pub fn load_or_synthesize(path: Option<&Path>, allow_auto: bool) -> Result<GenesisSpec, NhbError> {
    match path {
        Some(path) => load_spec(path),
        None if allow_auto => {
            tracing::warn!("no genesis file given; synthesising the fixed dev genesis");
            Ok(dev_genesis())
        }
        None => Err(NhbError::InvalidGenesis(
            "no genesis file given and auto-genesis is disabled".into(),
        )),
    }
}

/// Business-rule validation beyond what `serde`'s `deny_unknown_fields`
/// already rejects: decimals within range, no duplicate token symbols, no
/// duplicate validator addresses, and exactly one `autoPopulateLocal`
/// validator when any validator requests it.
fn validate(spec: &GenesisSpec) -> Result<(), NhbError> {
    if spec.native_tokens.is_empty() {
        return Err(NhbError::InvalidGenesis("nativeTokens must not be empty".into()));
    }
    let mut symbols = BTreeSet::new();
    for token in &spec.native_tokens {
        if token.decimals > constants::MAX_TOKEN_DECIMALS {
            return Err(NhbError::InvalidGenesis(format!(
                "token {} declares {} decimals, maximum is {}",
                token.symbol, token.decimals, constants::MAX_TOKEN_DECIMALS
            )));
        }
        if token.symbol != constants::TOKEN_NHB && token.symbol != constants::TOKEN_ZNHB {
            return Err(NhbError::InvalidGenesis(format!(
                "unsupported native token symbol: {}",
                token.symbol
            )));
        }
        if !symbols.insert(token.symbol.clone()) {
            return Err(NhbError::InvalidGenesis(format!(
                "duplicate native token symbol: {}",
                token.symbol
            )));
        }
    }

    if spec.validators.is_empty() {
        return Err(NhbError::InvalidGenesis("validators must not be empty".into()));
    }
    let auto_count = spec.validators.iter().filter(|v| v.auto_populate_local).count();
    if auto_count > 1 {
        return Err(NhbError::InvalidGenesis(
            "at most one validator may be autoPopulateLocal".into(),
        ));
    }
    let mut seen_addrs = BTreeSet::new();
    for validator in &spec.validators {
        if let Some(addr) = &validator.address {
            let parsed = Address::from_bech32(addr)
                .map_err(|_| NhbError::InvalidGenesis(format!("invalid validator address: {addr}")))?;
            if !seen_addrs.insert(parsed) {
                return Err(NhbError::InvalidGenesis(format!(
                    "duplicate validator address: {addr}"
                )));
            }
        } else if !validator.auto_populate_local {
            return Err(NhbError::InvalidGenesis(
                "a validator with no address must be autoPopulateLocal".into(),
            ));
        }
    }
    Ok(())
}

/// Parse a decimal-string smallest-unit amount, the same convention
/// `MintVoucher::amount` uses.
fn parse_amount(raw: &str) -> Result<Balance, NhbError> {
    raw.parse()
        .map_err(|_| NhbError::InvalidGenesis(format!("malformed alloc amount: {raw}")))
}

/// The outcome of a successful genesis bootstrap: the chain, ready to accept
/// block 1, and the validator roster it started with.
pub struct Bootstrapped {
    pub chain: Chain,
    pub validators: ValidatorSet,
    pub chain_id: ChainId,
}

/// Build genesis state and bootstrap `storage` with it. `local_address`
/// resolves any validator marked `autoPopulateLocal`; it is required when
/// the spec names one, and ignored otherwise.
pub fn bootstrap(
    storage: Arc<Storage>,
    spec: &GenesisSpec,
    local_address: Option<Address>,
) -> Result<Bootstrapped, NhbError> {
    validate(spec)?;

    let mut trie = Trie::open(storage.clone(), EMPTY_TRIE_ROOT);
    {
        let mut sm = StateManager::new(&mut trie);
        for (addr_str, balances) in &spec.alloc {
            let addr = Address::from_bech32(addr_str)
                .map_err(|_| NhbError::InvalidGenesis(format!("invalid alloc address: {addr_str}")))?;
            for (symbol, amount_str) in balances {
                let amount = parse_amount(amount_str)?;
                sm.credit(&addr, symbol, amount)?;
            }
        }
        for (role, addrs) in &spec.roles {
            for addr_str in addrs {
                let addr = Address::from_bech32(addr_str).map_err(|_| {
                    NhbError::InvalidGenesis(format!("invalid role address: {addr_str}"))
                })?;
                let mut account = sm.account(&addr)?;
                account.grant_role(role);
                sm.put_account(&addr, &account)?;
            }
        }
    }
    let root = trie.commit()?;

    let header = BlockHeader {
        height: 0,
        timestamp: spec.genesis_time.timestamp(),
        prev_hash: nhb_core::types::BlockHash::ZERO,
        tx_root: EMPTY_TX_ROOT,
        state_root: root,
        validator: Address::zero(),
    };
    let hash = header.hash();
    let derived_chain_id = ChainId::from_be_bytes(hash.as_bytes()[..8].try_into().unwrap());
    if let Some(declared) = spec.chain_id {
        if declared != derived_chain_id {
            return Err(NhbError::InvalidGenesis(format!(
                "declared chainId {declared} does not match the genesis hash's derived id {derived_chain_id}"
            )));
        }
    }

    let genesis_block = Block {
        header,
        transactions: vec![],
    };
    let chain = Chain::init_with_genesis(storage, genesis_block)?;

    let mut validators = ValidatorSet::new();
    for validator in &spec.validators {
        let addr = if validator.auto_populate_local {
            local_address.ok_or_else(|| {
                NhbError::InvalidGenesis(
                    "genesis names an autoPopulateLocal validator but no local address was supplied"
                        .into(),
                )
            })?
        } else {
            let addr_str = validator
                .address
                .as_ref()
                .expect("validate() rejects addressless non-auto validators");
            Address::from_bech32(addr_str)
                .map_err(|_| NhbError::InvalidGenesis(format!("invalid validator address: {addr_str}")))?
        };
        validators.add(addr, validator.power);
    }

    tracing::info!(
        chain_id = derived_chain_id,
        validators = validators.len(),
        "genesis bootstrapped"
    );

    Ok(Bootstrapped {
        chain,
        validators,
        chain_id: derived_chain_id,
    })
}

/// Re-derive the validator roster and chain id a chain already on disk was
/// bootstrapped with, from the same genesis document. Used when a node
/// restarts: `nhb_chain::Chain::open` recovers the chain log itself, but the
/// validator set lives only in the genesis document (and any subsequent
/// governance changes, which the node layers on top of this).
pub fn validators_from_spec(
    spec: &GenesisSpec,
    local_address: Option<Address>,
) -> Result<ValidatorSet, NhbError> {
    validate(spec)?;
    let mut validators = ValidatorSet::new();
    for validator in &spec.validators {
        let addr = if validator.auto_populate_local {
            local_address.ok_or_else(|| {
                NhbError::InvalidGenesis(
                    "genesis names an autoPopulateLocal validator but no local address was supplied"
                        .into(),
                )
            })?
        } else {
            let addr_str = validator
                .address
                .as_ref()
                .expect("validate() rejects addressless non-auto validators");
            Address::from_bech32(addr_str)
                .map_err(|_| NhbError::InvalidGenesis(format!("invalid validator address: {addr_str}")))?
        };
        validators.add(addr, validator.power);
    }
    Ok(validators)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nhb_crypto::KeyPair;
    use tempfile::tempdir;

    fn storage() -> (tempfile::TempDir, Arc<Storage>) {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::open(dir.path()).unwrap());
        (dir, storage)
    }

    #[test]
    fn dev_genesis_bootstraps_with_local_validator() {
        let (_dir, storage) = storage();
        let local = KeyPair::generate();
        let spec = dev_genesis();
        let result = bootstrap(storage, &spec, Some(local.address)).unwrap();
        assert_eq!(result.chain.height(), 0);
        assert_eq!(result.validators.len(), 1);
        assert!(result.validators.is_validator(&local.address));
    }

    #[test]
    fn missing_local_address_for_auto_validator_fails() {
        let (_dir, storage) = storage();
        let spec = dev_genesis();
        assert!(bootstrap(storage, &spec, None).is_err());
    }

    #[test]
    fn alloc_credits_land_in_state() {
        let (_dir, storage) = storage();
        let local = KeyPair::generate();
        let recipient = KeyPair::generate();
        let mut spec = dev_genesis();
        let mut balances = std::collections::BTreeMap::new();
        balances.insert(constants::TOKEN_NHB.to_string(), "1000".to_string());
        spec.alloc.insert(recipient.address.to_bech32(), balances);

        let result = bootstrap(storage.clone(), &spec, Some(local.address)).unwrap();
        let genesis_block = result.chain.block_by_height(0).unwrap().unwrap();
        assert!(!genesis_block.header.state_root.is_zero());

        let mut verify_trie = Trie::open(storage, genesis_block.header.state_root);
        let sm = StateManager::new(&mut verify_trie);
        let account = sm.account(&recipient.address).unwrap();
        assert_eq!(account.balance_nhb, 1_000);
    }

    #[test]
    fn declared_chain_id_mismatch_is_rejected() {
        let (_dir, storage) = storage();
        let local = KeyPair::generate();
        let mut spec = dev_genesis();
        spec.chain_id = Some(1);
        let err = bootstrap(storage, &spec, Some(local.address)).unwrap_err();
        assert!(matches!(err, NhbError::InvalidGenesis(_)));
    }

    #[test]
    fn two_auto_populate_validators_are_rejected() {
        let (_dir, storage) = storage();
        let local = KeyPair::generate();
        let mut spec = dev_genesis();
        spec.validators.push(ValidatorSpec {
            address: None,
            power: 1,
            pub_key: None,
            moniker: Some("dev-2".to_string()),
            auto_populate_local: true,
        });
        let err = bootstrap(storage, &spec, Some(local.address)).unwrap_err();
        assert!(matches!(err, NhbError::InvalidGenesis(_)));
    }
}
