//! Governance: propose -> vote -> finalize -> queue -> execute, each gated
//! by a hot-swappable policy. Tally is stake-weighted; the caller supplies
//! the voter's stake-weight (read from their account by the processor
//! before dispatch, since the module itself never reaches outside the
//! proposal/policy keyspace).

use nhb_core::types::{Address, Balance, Timestamp};
use nhb_core::{Event, NhbError, Proposal, ProposalStatus, Tally, VoteChoice};

use crate::manager::StateManager;

pub fn propose(
    sm: &mut StateManager,
    proposer: Address,
    kind: String,
    payload: Vec<u8>,
    deposit: Balance,
    now: Timestamp,
) -> Result<(u64, Vec<Event>), NhbError> {
    let policy = sm.governance_policy()?;
    if deposit < policy.min_deposit {
        return Err(NhbError::ProposalDepositTooLow { min: policy.min_deposit });
    }
    if !policy.allowed_params.is_empty() && !policy.allowed_params.contains(&kind) {
        return Err(NhbError::ProposalParamNotAllowed(kind));
    }
    sm.debit(&proposer, nhb_core::constants::TOKEN_ZNHB, deposit)?;

    let id = sm.next_proposal_id()?;
    let proposal = Proposal {
        id,
        kind: kind.clone(),
        payload,
        proposer,
        deposit,
        status: ProposalStatus::Voting,
        voting_end: now + policy.voting_period_secs,
        timelock_end: 0,
        tally: Tally::default(),
        voters: Default::default(),
    };
    sm.put_proposal(&proposal)?;
    Ok((
        id,
        vec![Event::new("proposal_created")
            .attr("id", id.to_string())
            .attr("kind", kind)
            .addr_attr("proposer", proposer)],
    ))
}

fn load(sm: &StateManager, id: u64) -> Result<Proposal, NhbError> {
    sm.proposal(id)?.ok_or_else(|| NhbError::ProposalNotFound(id.to_string()))
}

pub fn vote(
    sm: &mut StateManager,
    id: u64,
    voter: Address,
    choice: VoteChoice,
    voter_stake: Balance,
    now: Timestamp,
) -> Result<Vec<Event>, NhbError> {
    let mut proposal = load(sm, id)?;
    if proposal.status != ProposalStatus::Voting || now > proposal.voting_end {
        return Err(NhbError::ProposalInvalidState);
    }
    if proposal.voters.contains_key(&voter) {
        return Err(NhbError::ProposalInvalidState);
    }
    match choice {
        VoteChoice::Yes => proposal.tally.yes += voter_stake,
        VoteChoice::No => proposal.tally.no += voter_stake,
        VoteChoice::Abstain => proposal.tally.abstain += voter_stake,
    }
    proposal.voters.insert(voter, choice);
    sm.put_proposal(&proposal)?;
    Ok(vec![Event::new("proposal_voted")
        .attr("id", id.to_string())
        .addr_attr("voter", voter)])
}

/// Tally the vote once `voting_end` has passed: `total_stake` is the
/// denominator for quorum (total ZNHB staked at finalize time).
pub fn finalize(
    sm: &mut StateManager,
    id: u64,
    now: Timestamp,
    total_stake: Balance,
) -> Result<Vec<Event>, NhbError> {
    let policy = sm.governance_policy()?;
    let mut proposal = load(sm, id)?;
    if proposal.status != ProposalStatus::Voting || now <= proposal.voting_end {
        return Err(NhbError::ProposalInvalidState);
    }
    let total_votes = proposal.tally.total();
    let quorum_met = total_stake > 0
        && total_votes.saturating_mul(nhb_core::constants::BPS_DENOMINATOR as u128)
            / total_stake.max(1)
            >= policy.quorum_bps as u128;
    let passed = quorum_met
        && total_votes > 0
        && proposal.tally.yes.saturating_mul(nhb_core::constants::BPS_DENOMINATOR as u128)
            / total_votes
            >= policy.pass_threshold_bps as u128;

    proposal.status = if passed {
        ProposalStatus::Passed
    } else {
        ProposalStatus::Rejected
    };
    if !passed {
        sm.credit(&proposal.proposer, nhb_core::constants::TOKEN_ZNHB, proposal.deposit)?;
    }
    sm.put_proposal(&proposal)?;
    Ok(vec![Event::new("proposal_finalized")
        .attr("id", id.to_string())
        .attr("passed", passed.to_string())])
}

pub fn queue(sm: &mut StateManager, id: u64, now: Timestamp) -> Result<Vec<Event>, NhbError> {
    let policy = sm.governance_policy()?;
    let mut proposal = load(sm, id)?;
    if proposal.status != ProposalStatus::Passed {
        return Err(NhbError::ProposalInvalidState);
    }
    proposal.status = ProposalStatus::Queued;
    proposal.timelock_end = now + policy.timelock_secs;
    sm.put_proposal(&proposal)?;
    Ok(vec![Event::new("proposal_queued").attr("id", id.to_string())])
}

pub fn execute(sm: &mut StateManager, id: u64, now: Timestamp) -> Result<Vec<Event>, NhbError> {
    let mut proposal = load(sm, id)?;
    if proposal.status != ProposalStatus::Queued || now < proposal.timelock_end {
        return Err(NhbError::ProposalInvalidState);
    }
    proposal.status = ProposalStatus::Executed;
    sm.credit(&proposal.proposer, nhb_core::constants::TOKEN_ZNHB, proposal.deposit)?;
    sm.put_proposal(&proposal)?;
    Ok(vec![Event::new("proposal_executed").attr("id", id.to_string())])
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
    fn full_lifecycle_passes_and_executes() {
        let (_dir, mut trie) = manager();
        let mut sm = StateManager::new(&mut trie);
        let proposer = Address::from_bytes([1u8; 20]);
        let voter = Address::from_bytes([2u8; 20]);
        sm.credit(&proposer, TOKEN_ZNHB, 2_000 * nhb_core::constants::ONE_TOKEN)
            .unwrap();

        let (id, _) = propose(
            &mut sm,
            proposer,
            "param.change".to_string(),
            vec![],
            1_000 * nhb_core::constants::ONE_TOKEN,
            0,
        )
        .unwrap();

        vote(&mut sm, id, voter, VoteChoice::Yes, 10_000, 10).unwrap();
        finalize(&mut sm, id, 8 * 24 * 3600, 10_000).unwrap();
        let proposal = sm.proposal(id).unwrap().unwrap();
        assert_eq!(proposal.status, ProposalStatus::Passed);

        queue(&mut sm, id, 8 * 24 * 3600).unwrap();
        let executed_at = 8 * 24 * 3600 + nhb_core::constants::DEFAULT_TIMELOCK_SECS;
        execute(&mut sm, id, executed_at).unwrap();
        let proposal = sm.proposal(id).unwrap().unwrap();
        assert_eq!(proposal.status, ProposalStatus::Executed);
    }
}
