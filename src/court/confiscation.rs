//! The confiscation court
//!
//! Any havven holder with enough standing can open a motion against an
//! account. Holders then vote with their average havven balance from the
//! last completed fee period. Once voting closes the owner may approve a
//! motion that met both the participation and majority thresholds, which
//! confiscates the target's nomins and freezes the account. The owner can
//! veto at any point before that, and anyone can close a motion whose
//! confirmation window has lapsed.

use std::collections::{BTreeMap, HashMap};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use crate::constants::{
    DEFAULT_CONFIRMATION_PERIOD, DEFAULT_MIN_STANDING_BALANCE, DEFAULT_REQUIRED_MAJORITY,
    DEFAULT_REQUIRED_PARTICIPATION, DEFAULT_VOTING_PERIOD, MAX_CONFIRMATION_PERIOD, MAX_VOTING_PERIOD,
    MIN_CONFIRMATION_PERIOD, MIN_REQUIRED_MAJORITY, MIN_REQUIRED_PARTICIPATION, MIN_VOTING_PERIOD,
};
use crate::crypto::Address;
use crate::error::{LedgerError, Result};
use crate::events::Event;
use crate::math::{safe_add, safe_sub, Amount};
use crate::nomin::Nomin;
use crate::owned::Owned;
use crate::token::Havven;
use super::{Ballot, Motion, MotionId, MotionState, ThresholdBoundary, Vote};

/// Tunable court parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourtParams {
    pub voting_period: u64,
    pub confirmation_period: u64,
    /// Fraction of havven supply that must vote
    pub required_participation: Amount,
    /// Fraction of votes cast that must be in favour
    pub required_majority: Amount,
    /// Havven balance needed to begin a motion
    pub min_standing_balance: Amount,
    pub boundary: ThresholdBoundary,
}

impl Default for CourtParams {
    fn default() -> Self {
        Self {
            voting_period: DEFAULT_VOTING_PERIOD,
            confirmation_period: DEFAULT_CONFIRMATION_PERIOD,
            required_participation: DEFAULT_REQUIRED_PARTICIPATION,
            required_majority: DEFAULT_REQUIRED_MAJORITY,
            min_standing_balance: DEFAULT_MIN_STANDING_BALANCE,
            boundary: ThresholdBoundary::Inclusive,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Court {
    owned: Owned,
    params: CourtParams,
    next_motion_id: MotionId,
    /// Unresolved motions (open, or lapsed but not yet closed)
    motions: BTreeMap<MotionId, Motion>,
    target_motion_id: HashMap<Address, MotionId>,
    /// Kept past resolution so voters can still cancel afterwards
    ballots: HashMap<(MotionId, Address), Ballot>,
}

impl Court {
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            owned: Owned::new(address, owner),
            params: CourtParams::default(),
            next_motion_id: 1,
            motions: BTreeMap::new(),
            target_motion_id: HashMap::new(),
            ballots: HashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.owned.contract()
    }

    pub fn owned(&self) -> &Owned {
        &self.owned
    }

    pub fn owned_mut(&mut self) -> &mut Owned {
        &mut self.owned
    }

    pub fn params(&self) -> &CourtParams {
        &self.params
    }

    pub fn motion(&self, id: MotionId) -> Option<&Motion> {
        self.motions.get(&id)
    }

    pub fn motions(&self) -> impl Iterator<Item = &Motion> {
        self.motions.values()
    }

    /// The open motion against `target`, if any
    pub fn target_motion_id(&self, target: &Address) -> Option<MotionId> {
        self.target_motion_id.get(target).copied()
    }

    pub fn ballot(&self, id: MotionId, voter: &Address) -> Option<Ballot> {
        self.ballots.get(&(id, *voter)).copied()
    }

    pub fn motion_state(&self, id: MotionId, now: u64) -> MotionState {
        match self.motions.get(&id) {
            Some(motion) => motion.state(now, self.params.voting_period, self.params.confirmation_period),
            None => MotionState::Waiting,
        }
    }

    pub fn motion_voting(&self, id: MotionId, now: u64) -> bool {
        self.motion_state(id, now) == MotionState::Voting
    }

    pub fn motion_confirming(&self, id: MotionId, now: u64) -> bool {
        self.motion_state(id, now) == MotionState::Confirming
    }

    /// Quorum and majority, both measured against the havven supply at call time
    pub fn motion_passes(&self, id: MotionId, havven: &Havven) -> bool {
        let Some(motion) = self.motions.get(&id) else {
            return false;
        };
        let total = motion.total_votes();
        if total == 0 {
            return false;
        }
        let boundary = self.params.boundary;
        boundary.meets(total, self.params.required_participation, havven.total_supply())
            && boundary.meets(motion.votes_for, self.params.required_majority, total)
    }

    fn get_motion(&self, id: MotionId) -> Result<&Motion> {
        self.motions.get(&id).ok_or(LedgerError::MotionNotFound(id))
    }

    // ------------------------------------------------------------------
    // Motion lifecycle
    // ------------------------------------------------------------------

    pub fn begin_motion(
        &mut self,
        initiator: Address,
        target: Address,
        havven: &Havven,
        nomin: &Nomin,
        now: u64,
        events: &mut Vec<Event>,
    ) -> Result<MotionId> {
        if self.target_motion_id.contains_key(&target) {
            return Err(LedgerError::AlreadyUnderMotion(target));
        }
        let standing = havven.balance_of(&initiator) >= self.params.min_standing_balance;
        if !(standing || self.owned.is_owner(initiator)) {
            return Err(LedgerError::InsufficientStanding);
        }
        if self.params.voting_period > havven.fee_period().target_duration {
            return Err(LedgerError::VotingPeriodExceedsFeePeriod);
        }
        if nomin.is_frozen(&target) {
            return Err(LedgerError::AlreadyFrozen(target));
        }

        let motion_id = self.next_motion_id;
        self.next_motion_id += 1;
        self.motions.insert(motion_id, Motion::new(motion_id, target, now));
        self.target_motion_id.insert(target, motion_id);

        info!(motion_id, %initiator, %target, "motion begun");
        events.push(Event::MotionBegun {
            initiator,
            target,
            motion_id,
        });
        Ok(motion_id)
    }

    /// Checks common to both vote directions; returns the voter's weight
    fn setup_vote(&self, voter: Address, id: MotionId, havven: &mut Havven, now: u64) -> Result<Amount> {
        let motion = self.get_motion(id)?;
        if !self.motion_voting(id, now) {
            return Err(LedgerError::NotVoting(id));
        }
        if voter == motion.target {
            return Err(LedgerError::TargetCannotVote);
        }
        if self.ballots.contains_key(&(id, voter)) {
            return Err(LedgerError::AlreadyVoted(id));
        }
        let start_time = motion.start_time;

        havven.recompute_last_average_balance(voter, now)?;
        // A motion begun before the current fee period weighs votes by the period it began in
        let weight = if start_time < havven.fee_period().start_time {
            havven.penultimate_average_balance(&voter)
        } else {
            havven.last_average_balance(&voter)
        };
        if weight == 0 {
            return Err(LedgerError::ZeroWeight);
        }
        Ok(weight)
    }

    fn cast(
        &mut self,
        voter: Address,
        id: MotionId,
        vote: Vote,
        havven: &mut Havven,
        now: u64,
        events: &mut Vec<Event>,
    ) -> Result<Amount> {
        let weight = self.setup_vote(voter, id, havven, now)?;
        let motion = self.motions.get_mut(&id).ok_or(LedgerError::MotionNotFound(id))?;
        match vote {
            Vote::For => {
                motion.votes_for = safe_add(motion.votes_for, weight)?;
                events.push(Event::VotedFor {
                    voter,
                    motion_id: id,
                    weight,
                });
            }
            Vote::Against => {
                motion.votes_against = safe_add(motion.votes_against, weight)?;
                events.push(Event::VotedAgainst {
                    voter,
                    motion_id: id,
                    weight,
                });
            }
        }
        self.ballots.insert((id, voter), Ballot { vote, weight });
        debug!(motion_id = id, %voter, ?vote, weight, "vote cast");
        Ok(weight)
    }

    pub fn vote_for(
        &mut self,
        voter: Address,
        id: MotionId,
        havven: &mut Havven,
        now: u64,
        events: &mut Vec<Event>,
    ) -> Result<Amount> {
        self.cast(voter, id, Vote::For, havven, now, events)
    }

    pub fn vote_against(
        &mut self,
        voter: Address,
        id: MotionId,
        havven: &mut Havven,
        now: u64,
        events: &mut Vec<Event>,
    ) -> Result<Amount> {
        self.cast(voter, id, Vote::Against, havven, now, events)
    }

    /// Withdraw a ballot. Tallies only change while the motion is still voting.
    pub fn cancel_vote(&mut self, voter: Address, id: MotionId, now: u64, events: &mut Vec<Event>) -> Result<()> {
        let state = self.motion_state(id, now);
        if state == MotionState::Confirming {
            return Err(LedgerError::CannotCancelDuringConfirmation);
        }
        let ballot = self.ballots.get(&(id, voter)).copied().ok_or(LedgerError::NotVoted(id))?;

        if state == MotionState::Voting {
            let motion = self.motions.get_mut(&id).ok_or(LedgerError::MotionNotFound(id))?;
            match ballot.vote {
                Vote::For => motion.votes_for = safe_sub(motion.votes_for, ballot.weight)?,
                Vote::Against => motion.votes_against = safe_sub(motion.votes_against, ballot.weight)?,
            }
        }
        self.ballots.remove(&(id, voter));
        events.push(Event::VoteCancelled { voter, motion_id: id });
        Ok(())
    }

    /// Drop the motion and free its target
    fn resolve(&mut self, id: MotionId) -> Option<Motion> {
        let motion = self.motions.remove(&id)?;
        self.target_motion_id.remove(&motion.target);
        Some(motion)
    }

    /// Carry out a passed motion: confiscate and freeze the target's nomins
    pub fn approve_motion(
        &mut self,
        caller: Address,
        id: MotionId,
        havven: &Havven,
        nomin: &mut Nomin,
        now: u64,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        self.owned.only_owner(caller)?;
        let target = self.get_motion(id)?.target;
        if !self.motion_confirming(id, now) {
            return Err(LedgerError::NotConfirming(id));
        }
        if !self.motion_passes(id, havven) {
            return Err(LedgerError::MotionFailed(id));
        }
        nomin.confiscate_balance(self.address(), target, events)?;
        self.resolve(id);

        info!(motion_id = id, %target, "motion approved");
        events.push(Event::MotionApproved { motion_id: id });
        Ok(())
    }

    pub fn veto_motion(&mut self, caller: Address, id: MotionId, now: u64, events: &mut Vec<Event>) -> Result<()> {
        self.owned.only_owner(caller)?;
        self.get_motion(id)?;
        if self.motion_state(id, now) == MotionState::Waiting {
            return Err(LedgerError::MotionNotActive(id));
        }
        self.resolve(id);
        info!(motion_id = id, "motion vetoed");
        events.push(Event::MotionVetoed { motion_id: id });
        Ok(())
    }

    /// Clean up a motion whose confirmation window has run out; open to anyone
    pub fn close_motion(&mut self, id: MotionId, now: u64, events: &mut Vec<Event>) -> Result<()> {
        self.get_motion(id)?;
        if self.motion_state(id, now) != MotionState::Waiting {
            return Err(LedgerError::StillConfirming(id));
        }
        self.resolve(id);
        info!(motion_id = id, "motion closed");
        events.push(Event::MotionClosed { motion_id: id });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Owner settings
    // ------------------------------------------------------------------

    pub fn set_voting_period(&mut self, caller: Address, period: u64, havven: &Havven) -> Result<()> {
        self.owned.only_owner(caller)?;
        if !(MIN_VOTING_PERIOD..=MAX_VOTING_PERIOD).contains(&period) {
            return Err(LedgerError::PeriodOutOfRange {
                period,
                min: MIN_VOTING_PERIOD,
                max: MAX_VOTING_PERIOD,
            });
        }
        if period > havven.fee_period().target_duration {
            return Err(LedgerError::VotingPeriodExceedsFeePeriod);
        }
        self.params.voting_period = period;
        Ok(())
    }

    pub fn set_confirmation_period(&mut self, caller: Address, period: u64) -> Result<()> {
        self.owned.only_owner(caller)?;
        if !(MIN_CONFIRMATION_PERIOD..=MAX_CONFIRMATION_PERIOD).contains(&period) {
            return Err(LedgerError::PeriodOutOfRange {
                period,
                min: MIN_CONFIRMATION_PERIOD,
                max: MAX_CONFIRMATION_PERIOD,
            });
        }
        self.params.confirmation_period = period;
        Ok(())
    }

    pub fn set_required_participation(&mut self, caller: Address, fraction: Amount) -> Result<()> {
        self.owned.only_owner(caller)?;
        if fraction < MIN_REQUIRED_PARTICIPATION {
            return Err(LedgerError::ParticipationTooLow(fraction));
        }
        self.params.required_participation = fraction;
        Ok(())
    }

    pub fn set_required_majority(&mut self, caller: Address, fraction: Amount) -> Result<()> {
        self.owned.only_owner(caller)?;
        if fraction < MIN_REQUIRED_MAJORITY {
            return Err(LedgerError::MajorityTooLow(fraction));
        }
        self.params.required_majority = fraction;
        Ok(())
    }

    pub fn set_min_standing_balance(&mut self, caller: Address, balance: Amount) -> Result<()> {
        self.owned.only_owner(caller)?;
        self.params.min_standing_balance = balance;
        Ok(())
    }

    pub fn set_threshold_boundary(&mut self, caller: Address, boundary: ThresholdBoundary) -> Result<()> {
        self.owned.only_owner(caller)?;
        self.params.boundary = boundary;
        Ok(())
    }
}
