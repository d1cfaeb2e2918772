//! POTSO staking: locking moves ZNHB into a notional vault and records a
//! monotonically-allocated per-owner lock nonce; unbonding splits a lock and
//! schedules its release on a withdraw-day bucket; withdrawal releases
//! matured locks back to the owner's spendable balance.
//!
//! Heartbeats feed the engagement meter that `modules::rewards` settles at
//! day rollover; this module only records the raw per-day minutes.

use nhb_core::types::{Address, Balance, Timestamp};
use nhb_core::{Event, NhbError, StakeLock, UnbondingEntry};

use crate::manager::StateManager;

fn day_of(ts: Timestamp) -> i64 {
    ts.div_euclid(nhb_core::constants::DAY_SECS)
}

pub fn lock(sm: &mut StateManager, owner: Address, amount: Balance, now: Timestamp) -> Result<Vec<Event>, NhbError> {
    if amount == 0 {
        return Err(NhbError::InvalidPayload("stake lock amount must be non-zero".into()));
    }
    let mut account = sm.account(&owner)?;
    let spendable = account.spendable_znhb();
    if spendable < amount {
        return Err(NhbError::InsufficientFunds { need: amount, have: spendable });
    }
    // Locking narrows `spendable_znhb()` via `stake`; `balance_znhb` itself is
    // untouched so `withdraw_matured` has nothing left to credit back.
    account.stake = account.stake.saturating_add(amount);
    sm.put_account(&owner, &account)?;

    let nonce = sm.next_lock_nonce(&owner)?;
    let lock = StakeLock {
        lock_nonce: nonce,
        owner,
        amount,
        locked_at: now,
    };
    sm.put_stake_lock(&lock)?;
    sm.set_total_stake(sm.total_stake()?.saturating_add(amount))?;
    Ok(vec![Event::new("stake_locked")
        .addr_attr("owner", owner)
        .attr("lock_nonce", nonce.to_string())
        .amount_attr("amount", amount)])
}

/// Unbond `amount` (<= the lock's remaining amount) from `lock_nonce`,
/// scheduling release on `unbonding_period_days` from now. Splits the lock
/// if a partial amount is unbonded.
pub fn unbond(
    sm: &mut StateManager,
    owner: Address,
    lock_nonce: u64,
    amount: Balance,
    now: Timestamp,
    unbonding_period_days: i64,
) -> Result<Vec<Event>, NhbError> {
    let mut existing = sm
        .stake_lock(&owner, lock_nonce)?
        .ok_or_else(|| NhbError::StakeLockNotFound(lock_nonce.to_string()))?;
    if amount == 0 || amount > existing.amount {
        return Err(NhbError::InvalidPayload("unbond amount exceeds lock".into()));
    }

    let mut account = sm.account(&owner)?;
    account.stake = account.stake.saturating_sub(amount);
    sm.put_account(&owner, &account)?;

    existing.amount -= amount;
    if existing.amount == 0 {
        sm.remove_stake_lock(&owner, lock_nonce)?;
    } else {
        sm.put_stake_lock(&existing)?;
    }

    sm.set_total_stake(sm.total_stake()?.saturating_sub(amount))?;
    let withdraw_day = day_of(now) + unbonding_period_days;
    sm.push_unbonding(UnbondingEntry {
        owner,
        lock_nonce,
        amount,
        withdraw_day,
    })?;

    Ok(vec![Event::new("stake_unbonded")
        .addr_attr("owner", owner)
        .attr("lock_nonce", lock_nonce.to_string())
        .amount_attr("amount", amount)
        .attr("withdraw_day", withdraw_day.to_string())])
}

/// Called explicitly by an owner to claim a specific matured withdrawal, or
/// implicitly during `process_block_lifecycle` for the whole day bucket.
/// `unbond` already dropped the released amount out of `stake`, and `lock`
/// never moved it out of `balance_znhb`, so maturing a withdrawal is pure
/// bookkeeping: the funds have been sitting in the owner's spendable balance
/// since `unbond`, this just emits the record of it.
pub fn withdraw_matured(sm: &mut StateManager, day: i64) -> Result<Vec<Event>, NhbError> {
    let entries = sm.drain_unbonding_for_day(day)?;
    let mut events = Vec::with_capacity(entries.len());
    for entry in entries {
        events.push(
            Event::new("stake_withdrawn")
                .addr_attr("owner", entry.owner)
                .attr("lock_nonce", entry.lock_nonce.to_string())
                .amount_attr("amount", entry.amount),
        );
    }
    Ok(events)
}

/// Credit a heartbeat's raw minutes toward the address's current-day meter,
/// capped per-heartbeat and per-day. Day rollover (EMA decay into
/// `Account.engagement_score`) is handled by `modules::rewards`.
pub fn heartbeat(
    sm: &mut StateManager,
    addr: Address,
    delta_minutes: u64,
    now: Timestamp,
) -> Result<Vec<Event>, NhbError> {
    let policy = sm.engagement_policy()?;
    let mut meter = sm.engagement_meter(&addr)?;
    let today = day_of(now);
    if meter.day != today {
        meter.day = today;
        meter.raw_minutes = 0;
        meter.heartbeat_count = 0;
    }
    let minutes_credited = delta_minutes.min(policy.max_minutes_per_heartbeat);
    let points = minutes_credited.saturating_mul(policy.heartbeat_weight);
    let room = policy.daily_cap.saturating_sub(meter.raw_minutes);
    let points = points.min(room);
    meter.raw_minutes = meter.raw_minutes.saturating_add(points);
    meter.heartbeat_count += 1;
    sm.put_engagement_meter(&addr, &meter)?;

    let mut account = sm.account(&addr)?;
    account.last_engagement_day = today;
    account.engagement_minutes_today = meter.raw_minutes;
    sm.put_account(&addr, &account)?;
    crate::modules::rewards::mark_engaged_today(sm, addr, today)?;

    Ok(vec![Event::new("heartbeat_recorded")
        .addr_attr("address", addr)
        .attr("credited_points", points.to_string())
        .attr("day_total_points", meter.raw_minutes.to_string())])
}

/// Credit raw engagement points for a non-heartbeat activity (a transaction,
/// an escrow transition, a governance vote), weighted per `EngagementPolicy`.
/// Shares the same day-bucket and cap as heartbeat credit.
pub fn credit_engagement(
    sm: &mut StateManager,
    addr: Address,
    weight: u64,
    now: Timestamp,
) -> Result<(), NhbError> {
    let policy = sm.engagement_policy()?;
    let mut meter = sm.engagement_meter(&addr)?;
    let today = day_of(now);
    if meter.day != today {
        meter.day = today;
        meter.raw_minutes = 0;
        meter.heartbeat_count = 0;
    }
    let room = policy.daily_cap.saturating_sub(meter.raw_minutes);
    let points = weight.min(room);
    meter.raw_minutes = meter.raw_minutes.saturating_add(points);
    sm.put_engagement_meter(&addr, &meter)?;

    let mut account = sm.account(&addr)?;
    account.last_engagement_day = today;
    account.engagement_minutes_today = meter.raw_minutes;
    sm.put_account(&addr, &account)?;
    crate::modules::rewards::mark_engaged_today(sm, addr, today)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::{Trie, EMPTY_TRIE_ROOT};
    use nhb_core::constants::TOKEN_ZNHB;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn manager() -> (tempfile::TempDir, Trie) {
        let dir = tempdir().unwrap();
        let storage = Arc::new(crate::storage::Storage::open(dir.path()).unwrap());
        (dir, Trie::open(storage, EMPTY_TRIE_ROOT))
    }

    #[test]
    fn lock_unbond_withdraw_cycle_conserves_znhb() {
        let (_dir, mut trie) = manager();
        let mut sm = StateManager::new(&mut trie);
        let owner = Address::from_bytes([3u8; 20]);
        sm.credit(&owner, TOKEN_ZNHB, 1_000).unwrap();
        let before = sm.account(&owner).unwrap().balance_znhb;

        lock(&mut sm, owner, 30, 0).unwrap();
        let locked = sm.account(&owner).unwrap();
        assert_eq!(locked.balance_znhb, before, "locking must not change the total ZNHB balance");
        assert_eq!(locked.stake, 30);
        assert_eq!(locked.spendable_znhb(), before - 30);

        unbond(&mut sm, owner, 1, 30, 0, 1).unwrap();
        assert_eq!(sm.account(&owner).unwrap().stake, 0);

        let withdraw_day = day_of(0) + 1;
        withdraw_matured(&mut sm, withdraw_day).unwrap();

        let after = sm.account(&owner).unwrap();
        assert_eq!(after.balance_znhb, before, "a full lock/unbond/withdraw cycle must not mint or burn ZNHB");
        assert_eq!(after.stake, 0);
        assert_eq!(after.spendable_znhb(), before);
    }

    #[test]
    fn lock_rejects_amount_beyond_spendable_balance() {
        let (_dir, mut trie) = manager();
        let mut sm = StateManager::new(&mut trie);
        let owner = Address::from_bytes([4u8; 20]);
        sm.credit(&owner, TOKEN_ZNHB, 10).unwrap();
        let err = lock(&mut sm, owner, 11, 0).unwrap_err();
        assert!(matches!(err, NhbError::InsufficientFunds { .. }));
    }
}
