//! The state processor: the block-lifecycle engine every node runs to turn
//! a batch of transactions into a new state root. Owns a `Trie` view and
//! dispatches each transaction's kind-specific payload to the matching
//! module in `modules::`, in the fixed validation order: chain id, signature
//! recovery, structural limits, nonce, fee, type-specific preconditions
//! (checked inside the module itself), then nonce increment.
//!
//! `copy()`/`commit()`/`reset_to_root()` mirror the trie's own primitives so
//! a node can execute a speculative block proposal against an isolated view
//! and only fold it into the committed trie once the proposal is accepted.

use std::sync::Arc;

use nhb_core::payload::{
    ClaimableClaimPayload, ClaimableCreatePayload, ClaimableIdPayload, EscrowCreatePayload,
    EscrowIdPayload, GovernanceIdPayload, GovernanceProposePayload, GovernanceVotePayload,
    HeartbeatPayload, MintPayload, RegisterIdentityPayload, ResolveOutcomeWire, ResolvePayload,
    StakeLockPayload, StakeUnbondPayload, SwapPayload, TradeCreatePayload, TradeIdPayload,
};
use nhb_core::types::{Address, ChainId, Hash32, Timestamp};
use nhb_core::{constants, Event, NhbError, Transaction, TxKind};

use crate::manager::StateManager;
use crate::modules::{claimable, escrow, governance, identity, mint, potso, rewards, swap, trade};
use crate::storage::Storage;
use crate::trie::Trie;

fn day_of(ts: Timestamp) -> i64 {
    ts.div_euclid(constants::DAY_SECS)
}

fn decode<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T, NhbError> {
    Ok(bincode::deserialize(data)?)
}

fn resolve_outcome(wire: ResolveOutcomeWire) -> escrow::ResolveOutcome {
    match wire {
        ResolveOutcomeWire::Release => escrow::ResolveOutcome::Release,
        ResolveOutcomeWire::Refund => escrow::ResolveOutcome::Refund,
    }
}

pub struct StateProcessor {
    storage: Arc<Storage>,
    trie: Trie,
    chain_id: ChainId,
    oracle: Arc<dyn swap::OracleClient + Send + Sync>,
    events: Vec<Event>,
}

impl StateProcessor {
    pub fn new(
        storage: Arc<Storage>,
        root: Hash32,
        chain_id: ChainId,
        oracle: Arc<dyn swap::OracleClient + Send + Sync>,
    ) -> Self {
        let trie = Trie::open(storage.clone(), root);
        Self {
            storage,
            trie,
            chain_id,
            oracle,
            events: Vec::new(),
        }
    }

    pub fn begin_block(&mut self) {
        self.events.clear();
    }

    pub fn end_block(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_root(&self) -> Hash32 {
        self.trie.root()
    }

    pub fn current_root(&self) -> Hash32 {
        self.trie.root()
    }

    pub fn commit(&mut self) -> Result<Hash32, NhbError> {
        self.trie.commit()
    }

    pub fn reset_to_root(&mut self, root: Hash32) {
        self.trie.reset_to_root(root);
        self.events.clear();
    }

    /// An independent, isolated view sharing the same durable storage — used
    /// to execute a speculative block proposal without mutating committed
    /// state until the proposal is accepted.
    pub fn copy(&self) -> StateProcessor {
        StateProcessor {
            storage: self.storage.clone(),
            trie: self.trie.copy(),
            chain_id: self.chain_id,
            oracle: self.oracle.clone(),
            events: Vec::new(),
        }
    }

    fn recover_sender(tx: &Transaction) -> Result<Address, NhbError> {
        nhb_crypto::recover_signer(&tx.signing_bytes(), &tx.signature)
    }

    /// Decide who pays `tx`'s fee without debiting anything: the sender,
    /// unless a paymaster is named and can cover it.
    pub fn evaluate_sponsorship(&mut self, tx: &Transaction) -> Result<Address, NhbError> {
        let sender = Self::recover_sender(tx)?;
        match tx.paymaster {
            None => Ok(sender),
            Some(paymaster) => {
                let sm = StateManager::new(&mut self.trie);
                let fee = tx.fee();
                let account = sm.account(&paymaster)?;
                if account.balance_of(constants::TOKEN_NHB) < fee {
                    return Err(NhbError::PaymasterUnauthorized);
                }
                Ok(paymaster)
            }
        }
    }

    /// Apply one transaction against the pending view. On error the trie is
    /// left untouched by the failed dispatch (modules only mutate after
    /// their own checks pass), but callers that need a hard guarantee should
    /// snapshot `pending_root()` first and `reset_to_root()` on error.
    pub fn apply_transaction(&mut self, tx: &Transaction, now: Timestamp) -> Result<Vec<Event>, NhbError> {
        if tx.chain_id != self.chain_id {
            return Err(NhbError::InvalidChainId {
                expected: self.chain_id,
                got: tx.chain_id,
            });
        }
        if tx.data.len() > constants::MAX_TX_DATA_BYTES {
            return Err(NhbError::InvalidPayload("transaction data exceeds the maximum size".into()));
        }
        if tx.gas_limit > constants::MAX_GAS_LIMIT {
            return Err(NhbError::InvalidPayload("gas limit exceeds the maximum allowed".into()));
        }

        let sender = Self::recover_sender(tx)?;

        let mut sm = StateManager::new(&mut self.trie);
        let account = sm.account(&sender)?;
        if tx.nonce != account.nonce {
            return Err(NhbError::InvalidNonce {
                expected: account.nonce,
                got: tx.nonce,
            });
        }

        if tx.kind.is_fee_bearing() {
            let fee = tx.fee();
            let fee_payer = match tx.paymaster {
                Some(paymaster) => {
                    let payer_account = sm.account(&paymaster)?;
                    if payer_account.balance_of(constants::TOKEN_NHB) < fee {
                        return Err(NhbError::PaymasterUnauthorized);
                    }
                    paymaster
                }
                None => {
                    if account.balance_of(constants::TOKEN_NHB) < fee {
                        return Err(NhbError::InsufficientFunds {
                            need: fee,
                            have: account.balance_of(constants::TOKEN_NHB),
                        });
                    }
                    sender
                }
            };
            if fee > 0 {
                sm.debit(&fee_payer, constants::TOKEN_NHB, fee)?;
                sm.credit(&escrow::treasury_address(), constants::TOKEN_NHB, fee)?;
            }
        }

        let policy = sm.engagement_policy()?;
        let mut events = self.dispatch(&mut sm, tx, sender, now, &policy)?;

        let mut account = sm.account(&sender)?;
        account.nonce += 1;
        sm.put_account(&sender, &account)?;

        self.events.append(&mut events);
        Ok(self.events.clone())
    }

    #[allow(clippy::too_many_lines)]
    fn dispatch(
        &mut self,
        sm: &mut StateManager,
        tx: &Transaction,
        sender: Address,
        now: Timestamp,
        policy: &nhb_core::EngagementPolicy,
    ) -> Result<Vec<Event>, NhbError> {
        match tx.kind {
            TxKind::Transfer => {
                let to = tx
                    .to
                    .ok_or_else(|| NhbError::InvalidPayload("transfer requires `to`".into()))?;
                let value = tx.value.unwrap_or(0);
                sm.debit(&sender, constants::TOKEN_NHB, value)?;
                sm.credit(&to, constants::TOKEN_NHB, value)?;
                potso::credit_engagement(sm, sender, policy.tx_weight, now)?;
                Ok(vec![Event::new("transfer")
                    .addr_attr("from", sender)
                    .addr_attr("to", to)
                    .amount_attr("amount", value)])
            }
            TxKind::RegisterIdentity => {
                let payload: RegisterIdentityPayload = decode(&tx.data)?;
                identity::set_alias(sm, sender, &payload.alias)
            }
            TxKind::Heartbeat => {
                let payload: HeartbeatPayload = decode(&tx.data)?;
                potso::heartbeat(sm, sender, payload.delta_minutes, now)
            }
            TxKind::StakeLock => {
                let payload: StakeLockPayload = decode(&tx.data)?;
                potso::lock(sm, sender, payload.amount, now)
            }
            TxKind::StakeUnbond => {
                let payload: StakeUnbondPayload = decode(&tx.data)?;
                potso::unbond(
                    sm,
                    sender,
                    payload.lock_nonce,
                    payload.amount,
                    now,
                    constants::DEFAULT_UNBONDING_PERIOD_DAYS,
                )
            }
            TxKind::StakeWithdraw => potso::withdraw_matured(sm, day_of(now)),
            TxKind::EscrowCreate => {
                let payload: EscrowCreatePayload = decode(&tx.data)?;
                let events = escrow::create(
                    sm,
                    payload.id,
                    sender,
                    payload.payee,
                    payload.token,
                    payload.amount,
                    payload.fee_bps,
                    payload.deadline,
                    payload.mediator,
                    payload.meta,
                    payload.realm,
                )?;
                potso::credit_engagement(sm, sender, policy.escrow_weight, now)?;
                Ok(events)
            }
            TxKind::EscrowFund => {
                let payload: EscrowIdPayload = decode(&tx.data)?;
                escrow::fund(sm, payload.id, sender)
            }
            TxKind::EscrowRelease => {
                let payload: EscrowIdPayload = decode(&tx.data)?;
                escrow::release(sm, payload.id, sender)
            }
            TxKind::EscrowRefund => {
                let payload: EscrowIdPayload = decode(&tx.data)?;
                escrow::refund(sm, payload.id, sender)
            }
            TxKind::EscrowExpire => {
                let payload: EscrowIdPayload = decode(&tx.data)?;
                escrow::expire(sm, payload.id, now)
            }
            TxKind::EscrowDispute => {
                let payload: EscrowIdPayload = decode(&tx.data)?;
                escrow::dispute(sm, payload.id, sender)
            }
            TxKind::EscrowResolve => {
                let payload: ResolvePayload = decode(&tx.data)?;
                escrow::resolve(sm, payload.id, sender, resolve_outcome(payload.outcome))
            }
            TxKind::TradeCreate => {
                let payload: TradeCreatePayload = decode(&tx.data)?;
                trade::create_trade(
                    sm,
                    payload.id,
                    payload.offer_id,
                    sender,
                    payload.seller,
                    payload.escrow_base_id,
                    payload.escrow_quote_id,
                    payload.base_token,
                    payload.base_amount,
                    payload.quote_token,
                    payload.quote_amount,
                    payload.deadline,
                )
            }
            TxKind::TradeSettle => {
                let payload: TradeIdPayload = decode(&tx.data)?;
                trade::settle_atomic(sm, payload.id, sender)
            }
            TxKind::TradeDispute => {
                let payload: TradeIdPayload = decode(&tx.data)?;
                trade::dispute(sm, payload.id, sender)
            }
            TxKind::TradeResolve => {
                let payload: ResolvePayload = decode(&tx.data)?;
                trade::resolve(sm, payload.id, sender, resolve_outcome(payload.outcome))
            }
            TxKind::Mint => {
                let payload: MintPayload = decode(&tx.data)?;
                let (_amount, events) =
                    mint::mint_with_signature(sm, &payload.voucher, &payload.signature, self.chain_id, now)?;
                Ok(events)
            }
            TxKind::Swap => {
                let payload: SwapPayload = decode(&tx.data)?;
                let (_amount, events) = swap::submit_voucher(
                    sm,
                    self.oracle.as_ref(),
                    &payload.submission,
                    &payload.signature,
                    self.chain_id,
                    constants::NATIVE_DECIMALS,
                    now,
                )?;
                Ok(events)
            }
            TxKind::GovernancePropose => {
                let payload: GovernanceProposePayload = decode(&tx.data)?;
                let (_id, events) =
                    governance::propose(sm, sender, payload.kind, payload.payload, payload.deposit, now)?;
                Ok(events)
            }
            TxKind::GovernanceVote => {
                let payload: GovernanceVotePayload = decode(&tx.data)?;
                let voter_stake = sm.account(&sender)?.stake;
                let events = governance::vote(sm, payload.id, sender, payload.choice, voter_stake, now)?;
                potso::credit_engagement(sm, sender, policy.gov_weight, now)?;
                Ok(events)
            }
            TxKind::GovernanceFinalize => {
                let payload: GovernanceIdPayload = decode(&tx.data)?;
                let total_stake = sm.total_stake()?;
                governance::finalize(sm, payload.id, now, total_stake)
            }
            TxKind::GovernanceQueue => {
                let payload: GovernanceIdPayload = decode(&tx.data)?;
                governance::queue(sm, payload.id, now)
            }
            TxKind::GovernanceExecute => {
                let payload: GovernanceIdPayload = decode(&tx.data)?;
                governance::execute(sm, payload.id, now)
            }
            TxKind::ClaimableCreate => {
                let payload: ClaimableCreatePayload = decode(&tx.data)?;
                claimable::create(
                    sm,
                    payload.id,
                    sender,
                    payload.token,
                    payload.amount,
                    payload.hash_lock,
                    payload.deadline,
                    payload.recipient_hint,
                )
            }
            TxKind::ClaimableClaim => {
                let payload: ClaimableClaimPayload = decode(&tx.data)?;
                claimable::claim(sm, payload.id, &payload.preimage, sender)
            }
            TxKind::ClaimableExpire => {
                let payload: ClaimableIdPayload = decode(&tx.data)?;
                claimable::expire(sm, payload.id, now)
            }
            TxKind::ClaimableCancel => {
                let payload: ClaimableIdPayload = decode(&tx.data)?;
                claimable::cancel(sm, payload.id, sender)
            }
        }
    }

    /// End-of-block housekeeping: engagement day rollover, matured unbonding
    /// release, and (at an epoch boundary) reward settlement. Each step is
    /// independently idempotent so replaying the same height twice is safe.
    pub fn process_block_lifecycle(
        &mut self,
        height: u64,
        ts: Timestamp,
        validators: &[Address],
    ) -> Result<Vec<Event>, NhbError> {
        let mut sm = StateManager::new(&mut self.trie);
        let mut events = Vec::new();

        let today = day_of(ts);
        events.extend(rewards::rollover_engagement_day(&mut sm, today - 1)?);
        events.extend(potso::withdraw_matured(&mut sm, today)?);

        let reward_policy = sm.reward_policy()?;
        if rewards::is_epoch_boundary(height, reward_policy.epoch_length_blocks) {
            let epoch = rewards::epoch_for_height(height, reward_policy.epoch_length_blocks);
            events.extend(rewards::settle_epoch(&mut sm, epoch, validators)?);
        }

        // Returned only, not appended to `self.events` — `apply_transaction`
        // already populated that buffer with the block's transaction events,
        // and the caller is responsible for ordering these after those via
        // `end_block()` before appending this return value.
        Ok(events)
    }
}
