//! Typed accessor over the trie: every module keyspace is namespaced by a
//! short byte prefix so unrelated record kinds never collide, mirroring the
//! teacher's one-sled-tree-per-record-type layout but flattened onto a
//! single authenticated trie.

use nhb_core::types::{Address, Balance, ChainId, Hash32};
use nhb_core::{
    Account, Claimable, EngagementMeter, EngagementPolicy, Escrow, GovernancePolicy,
    IdentityRecord, NhbError, Proposal, RewardPolicy, StakeLock, SwapConfig, SwapRiskState,
    SwapVoucherRecord, Trade, UnbondingEntry,
};

use crate::storage::{deser, ser};
use crate::trie::Trie;

mod keys {
    pub const ACCOUNT: &[u8] = b"acct:";
    pub const ESCROW: &[u8] = b"escrow:";
    pub const TRADE: &[u8] = b"trade:";
    pub const IDENTITY_BY_ALIAS: &[u8] = b"ident:alias:";
    pub const IDENTITY_REVERSE: &[u8] = b"ident:rev:";
    pub const PROPOSAL: &[u8] = b"gov:prop:";
    pub const PROPOSAL_SEQ: &[u8] = b"gov:seq";
    pub const GOVERNANCE_POLICY: &[u8] = b"gov:policy";
    pub const CLAIMABLE: &[u8] = b"claim:";
    pub const MINT_INVOICE: &[u8] = b"mint:invoice:";
    pub const SWAP_VOUCHER: &[u8] = b"swap:voucher:";
    pub const SWAP_ORDER: &[u8] = b"swap:order:";
    pub const SWAP_RISK: &[u8] = b"swap:risk:";
    pub const SWAP_CONFIG: &[u8] = b"swap:config";
    pub const STAKE_LOCK: &[u8] = b"potso:lock:";
    pub const STAKE_LOCK_SEQ: &[u8] = b"potso:lockseq:";
    pub const UNBONDING_DAY: &[u8] = b"potso:unbond:";
    pub const ENGAGEMENT_METER: &[u8] = b"potso:engage:";
    pub const ENGAGEMENT_POLICY: &[u8] = b"potso:engage:policy";
    pub const REWARD_POLICY: &[u8] = b"potso:reward:policy";
    pub const LAST_PROCESSED_EPOCH: &[u8] = b"potso:reward:last_epoch";
    pub const ENGAGED_TODAY: &[u8] = b"potso:engage:dirty:";
    pub const LAST_PROCESSED_ENGAGEMENT_DAY: &[u8] = b"potso:engage:last_day";
    pub const TOTAL_STAKE: &[u8] = b"potso:total_stake";
    pub const CHAIN_ID: &[u8] = b"meta:chain_id";
}

fn prefixed(prefix: &[u8], suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + suffix.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(suffix);
    key
}

pub struct StateManager<'a> {
    trie: &'a mut Trie,
}

impl<'a> StateManager<'a> {
    pub fn new(trie: &'a mut Trie) -> Self {
        Self { trie }
    }

    fn get<T: serde::de::DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, NhbError> {
        match self.trie.get(key)? {
            Some(bytes) => Ok(Some(deser(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put<T: serde::Serialize>(&mut self, key: &[u8], value: &T) -> Result<(), NhbError> {
        self.trie.put(key, ser(value)?)
    }

    pub fn root(&self) -> Hash32 {
        self.trie.root()
    }

    // ── Chain id sentinel ────────────────────────────────────────────────

    pub fn chain_id(&self) -> Result<Option<ChainId>, NhbError> {
        self.get(keys::CHAIN_ID)
    }

    pub fn set_chain_id(&mut self, id: ChainId) -> Result<(), NhbError> {
        self.put(keys::CHAIN_ID, &id)
    }

    // ── Accounts ─────────────────────────────────────────────────────────

    pub fn account(&self, addr: &Address) -> Result<Account, NhbError> {
        Ok(self
            .get(&prefixed(keys::ACCOUNT, addr.as_bytes()))?
            .unwrap_or_default())
    }

    pub fn put_account(&mut self, addr: &Address, account: &Account) -> Result<(), NhbError> {
        self.put(&prefixed(keys::ACCOUNT, addr.as_bytes()), account)
    }

    // ── Escrow / Trade ───────────────────────────────────────────────────

    pub fn escrow(&self, id: &Hash32) -> Result<Option<Escrow>, NhbError> {
        self.get(&prefixed(keys::ESCROW, id.as_bytes()))
    }

    pub fn put_escrow(&mut self, escrow: &Escrow) -> Result<(), NhbError> {
        self.put(&prefixed(keys::ESCROW, escrow.id.as_bytes()), escrow)
    }

    pub fn trade(&self, id: &Hash32) -> Result<Option<Trade>, NhbError> {
        self.get(&prefixed(keys::TRADE, id.as_bytes()))
    }

    pub fn put_trade(&mut self, trade: &Trade) -> Result<(), NhbError> {
        self.put(&prefixed(keys::TRADE, trade.id.as_bytes()), trade)
    }

    // ── Identity ─────────────────────────────────────────────────────────

    pub fn identity_by_alias(&self, alias: &str) -> Result<Option<IdentityRecord>, NhbError> {
        self.get(&prefixed(keys::IDENTITY_BY_ALIAS, alias.as_bytes()))
    }

    pub fn put_identity(&mut self, record: &IdentityRecord) -> Result<(), NhbError> {
        self.put(
            &prefixed(keys::IDENTITY_BY_ALIAS, record.alias.as_bytes()),
            record,
        )
    }

    pub fn remove_identity_alias(&mut self, alias: &str) -> Result<(), NhbError> {
        self.trie
            .remove(&prefixed(keys::IDENTITY_BY_ALIAS, alias.as_bytes()))
    }

    pub fn reverse_alias(&self, addr: &Address) -> Result<Option<String>, NhbError> {
        self.get(&prefixed(keys::IDENTITY_REVERSE, addr.as_bytes()))
    }

    pub fn set_reverse_alias(&mut self, addr: &Address, alias: &str) -> Result<(), NhbError> {
        self.put(
            &prefixed(keys::IDENTITY_REVERSE, addr.as_bytes()),
            &alias.to_string(),
        )
    }

    // ── Governance ───────────────────────────────────────────────────────

    pub fn governance_policy(&self) -> Result<GovernancePolicy, NhbError> {
        Ok(self.get(keys::GOVERNANCE_POLICY)?.unwrap_or_default())
    }

    pub fn put_governance_policy(&mut self, policy: &GovernancePolicy) -> Result<(), NhbError> {
        self.put(keys::GOVERNANCE_POLICY, policy)
    }

    pub fn proposal(&self, id: u64) -> Result<Option<Proposal>, NhbError> {
        self.get(&prefixed(keys::PROPOSAL, &id.to_be_bytes()))
    }

    pub fn put_proposal(&mut self, proposal: &Proposal) -> Result<(), NhbError> {
        self.put(&prefixed(keys::PROPOSAL, &proposal.id.to_be_bytes()), proposal)
    }

    /// Allocate the next sequential proposal id.
    pub fn next_proposal_id(&mut self) -> Result<u64, NhbError> {
        let current: u64 = self.get(keys::PROPOSAL_SEQ)?.unwrap_or(0);
        self.put(keys::PROPOSAL_SEQ, &(current + 1))?;
        Ok(current + 1)
    }

    // ── Claimable ────────────────────────────────────────────────────────

    pub fn claimable(&self, id: &Hash32) -> Result<Option<Claimable>, NhbError> {
        self.get(&prefixed(keys::CLAIMABLE, id.as_bytes()))
    }

    pub fn put_claimable(&mut self, claimable: &Claimable) -> Result<(), NhbError> {
        self.put(&prefixed(keys::CLAIMABLE, claimable.id.as_bytes()), claimable)
    }

    // ── Mint voucher admission ───────────────────────────────────────────

    pub fn invoice_used(&self, invoice_id: &str) -> Result<bool, NhbError> {
        Ok(self
            .get::<bool>(&prefixed(keys::MINT_INVOICE, invoice_id.as_bytes()))?
            .unwrap_or(false))
    }

    pub fn mark_invoice_used(&mut self, invoice_id: &str) -> Result<(), NhbError> {
        self.put(&prefixed(keys::MINT_INVOICE, invoice_id.as_bytes()), &true)
    }

    // ── Swap voucher admission ───────────────────────────────────────────

    pub fn swap_voucher(&self, provider_tx_id: &str) -> Result<Option<SwapVoucherRecord>, NhbError> {
        self.get(&prefixed(keys::SWAP_VOUCHER, provider_tx_id.as_bytes()))
    }

    pub fn put_swap_voucher(&mut self, record: &SwapVoucherRecord) -> Result<(), NhbError> {
        self.put(
            &prefixed(keys::SWAP_VOUCHER, record.provider_tx_id.as_bytes()),
            record,
        )
    }

    pub fn order_id_used(&self, order_id: &str) -> Result<bool, NhbError> {
        Ok(self
            .get::<bool>(&prefixed(keys::SWAP_ORDER, order_id.as_bytes()))?
            .unwrap_or(false))
    }

    pub fn mark_order_id_used(&mut self, order_id: &str) -> Result<(), NhbError> {
        self.put(&prefixed(keys::SWAP_ORDER, order_id.as_bytes()), &true)
    }

    pub fn swap_risk_state(&self, addr: &Address) -> Result<SwapRiskState, NhbError> {
        Ok(self
            .get(&prefixed(keys::SWAP_RISK, addr.as_bytes()))?
            .unwrap_or_default())
    }

    pub fn put_swap_risk_state(
        &mut self,
        addr: &Address,
        state: &SwapRiskState,
    ) -> Result<(), NhbError> {
        self.put(&prefixed(keys::SWAP_RISK, addr.as_bytes()), state)
    }

    pub fn swap_config(&self) -> Result<SwapConfig, NhbError> {
        Ok(self.get(keys::SWAP_CONFIG)?.unwrap_or_default())
    }

    pub fn put_swap_config(&mut self, config: &SwapConfig) -> Result<(), NhbError> {
        self.put(keys::SWAP_CONFIG, config)
    }

    // ── POTSO: staking, unbonding, engagement ────────────────────────────

    pub fn stake_lock(&self, owner: &Address, nonce: u64) -> Result<Option<StakeLock>, NhbError> {
        self.get(&stake_lock_key(owner, nonce))
    }

    pub fn put_stake_lock(&mut self, lock: &StakeLock) -> Result<(), NhbError> {
        self.put(&stake_lock_key(&lock.owner, lock.lock_nonce), lock)
    }

    pub fn remove_stake_lock(&mut self, owner: &Address, nonce: u64) -> Result<(), NhbError> {
        self.trie.remove(&stake_lock_key(owner, nonce))
    }

    /// Allocate the next per-owner stake-lock nonce.
    pub fn next_lock_nonce(&mut self, owner: &Address) -> Result<u64, NhbError> {
        let key = prefixed(keys::STAKE_LOCK_SEQ, owner.as_bytes());
        let current: u64 = self.get(&key)?.unwrap_or(0);
        self.put(&key, &(current + 1))?;
        Ok(current + 1)
    }

    pub fn unbonding_for_day(&self, day: i64) -> Result<Vec<UnbondingEntry>, NhbError> {
        Ok(self
            .get(&prefixed(keys::UNBONDING_DAY, &day.to_be_bytes()))?
            .unwrap_or_default())
    }

    pub fn push_unbonding(&mut self, entry: UnbondingEntry) -> Result<(), NhbError> {
        let mut entries = self.unbonding_for_day(entry.withdraw_day)?;
        let key = prefixed(keys::UNBONDING_DAY, &entry.withdraw_day.to_be_bytes());
        entries.push(entry);
        self.put(&key, &entries)
    }

    /// Remove and return every unbonding entry scheduled for `day` (called
    /// once the day matures).
    pub fn drain_unbonding_for_day(&mut self, day: i64) -> Result<Vec<UnbondingEntry>, NhbError> {
        let entries = self.unbonding_for_day(day)?;
        if !entries.is_empty() {
            self.trie
                .remove(&prefixed(keys::UNBONDING_DAY, &day.to_be_bytes()))?;
        }
        Ok(entries)
    }

    pub fn engagement_meter(&self, addr: &Address) -> Result<EngagementMeter, NhbError> {
        Ok(self
            .get(&prefixed(keys::ENGAGEMENT_METER, addr.as_bytes()))?
            .unwrap_or_default())
    }

    pub fn put_engagement_meter(
        &mut self,
        addr: &Address,
        meter: &EngagementMeter,
    ) -> Result<(), NhbError> {
        self.put(&prefixed(keys::ENGAGEMENT_METER, addr.as_bytes()), meter)
    }

    pub fn engagement_policy(&self) -> Result<EngagementPolicy, NhbError> {
        Ok(self.get(keys::ENGAGEMENT_POLICY)?.unwrap_or_default())
    }

    pub fn put_engagement_policy(&mut self, policy: &EngagementPolicy) -> Result<(), NhbError> {
        self.put(keys::ENGAGEMENT_POLICY, policy)
    }

    pub fn reward_policy(&self) -> Result<RewardPolicy, NhbError> {
        Ok(self.get(keys::REWARD_POLICY)?.unwrap_or_default())
    }

    pub fn put_reward_policy(&mut self, policy: &RewardPolicy) -> Result<(), NhbError> {
        self.put(keys::REWARD_POLICY, policy)
    }

    pub fn last_processed_epoch(&self) -> Result<Option<u64>, NhbError> {
        self.get(keys::LAST_PROCESSED_EPOCH)
    }

    pub fn set_last_processed_epoch(&mut self, epoch: u64) -> Result<(), NhbError> {
        self.put(keys::LAST_PROCESSED_EPOCH, &epoch)
    }

    /// Addresses that earned engagement points on `day`, so day-rollover can
    /// visit exactly the accounts with something to decay instead of
    /// scanning the whole address space.
    pub fn engaged_addresses(&self, day: i64) -> Result<Vec<Address>, NhbError> {
        Ok(self
            .get(&prefixed(keys::ENGAGED_TODAY, &day.to_be_bytes()))?
            .unwrap_or_default())
    }

    pub fn mark_engaged(&mut self, day: i64, addr: Address) -> Result<(), NhbError> {
        let mut list = self.engaged_addresses(day)?;
        if !list.contains(&addr) {
            list.push(addr);
            self.put(&prefixed(keys::ENGAGED_TODAY, &day.to_be_bytes()), &list)?;
        }
        Ok(())
    }

    pub fn clear_engaged(&mut self, day: i64) -> Result<(), NhbError> {
        self.trie
            .remove(&prefixed(keys::ENGAGED_TODAY, &day.to_be_bytes()))
    }

    pub fn last_processed_engagement_day(&self) -> Result<Option<i64>, NhbError> {
        self.get(keys::LAST_PROCESSED_ENGAGEMENT_DAY)
    }

    pub fn set_last_processed_engagement_day(&mut self, day: i64) -> Result<(), NhbError> {
        self.put(keys::LAST_PROCESSED_ENGAGEMENT_DAY, &day)
    }

    /// Running total of ZNHB currently locked in POTSO stakes, maintained by
    /// `modules::potso` on every lock/unbond. Governance quorum needs a
    /// network-wide denominator and the trie can't enumerate all accounts to
    /// recompute it on demand.
    pub fn total_stake(&self) -> Result<Balance, NhbError> {
        Ok(self.get(keys::TOTAL_STAKE)?.unwrap_or(0))
    }

    pub fn set_total_stake(&mut self, total: Balance) -> Result<(), NhbError> {
        self.put(keys::TOTAL_STAKE, &total)
    }

    // ── Balance helpers shared by every module that moves funds ─────────

    pub fn credit(&mut self, addr: &Address, token: &str, amount: Balance) -> Result<(), NhbError> {
        let mut account = self.account(addr)?;
        account.credit(token, amount);
        self.put_account(addr, &account)
    }

    pub fn debit(&mut self, addr: &Address, token: &str, amount: Balance) -> Result<(), NhbError> {
        let mut account = self.account(addr)?;
        account.debit(token, amount)?;
        self.put_account(addr, &account)
    }
}

fn stake_lock_key(owner: &Address, nonce: u64) -> Vec<u8> {
    let mut key = prefixed(keys::STAKE_LOCK, owner.as_bytes());
    key.extend_from_slice(&nonce.to_be_bytes());
    key
}
