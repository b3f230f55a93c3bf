//! Motion records and the voting-threshold rule

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use crate::constants::UNIT;
use crate::crypto::Address;
use crate::math::Amount;

/// Sequential motion identifier; 0 is never issued
pub type MotionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vote {
    For,
    Against,
}

/// A voter's recorded choice on one motion, with the weight it was cast with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub vote: Vote,
    pub weight: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionState {
    /// No open motion: never begun, resolved, or timed out
    Waiting,
    Voting,
    Confirming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Motion {
    pub id: MotionId,
    pub target: Address,
    pub start_time: u64,
    pub votes_for: Amount,
    pub votes_against: Amount,
}

impl Motion {
    pub fn new(id: MotionId, target: Address, start_time: u64) -> Self {
        Self {
            id,
            target,
            start_time,
            votes_for: 0,
            votes_against: 0,
        }
    }

    pub fn total_votes(&self) -> Amount {
        self.votes_for.saturating_add(self.votes_against)
    }

    /// Voting is `[start, start + voting)`, confirming the `confirmation` seconds after
    pub fn state(&self, now: u64, voting_period: u64, confirmation_period: u64) -> MotionState {
        let voting_end = self.start_time.saturating_add(voting_period);
        let confirming_end = voting_end.saturating_add(confirmation_period);
        if now < self.start_time {
            MotionState::Waiting
        } else if now < voting_end {
            MotionState::Voting
        } else if now < confirming_end {
            MotionState::Confirming
        } else {
            MotionState::Waiting
        }
    }
}

/// Whether a tally sitting exactly on a required fraction counts as meeting it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdBoundary {
    /// `value >= fraction * base`
    #[default]
    Inclusive,
    /// `value > fraction * base`
    Strict,
}

impl ThresholdBoundary {
    /// Compare `value` against `fraction * base`, `fraction` being 18-decimal.
    ///
    /// Evaluated exactly in 256 bits so no rounding moves the boundary.
    pub fn meets(&self, value: Amount, fraction: Amount, base: Amount) -> bool {
        let lhs = U256::from(value) * U256::from(UNIT);
        let rhs = U256::from(fraction) * U256::from(base);
        match self {
            ThresholdBoundary::Inclusive => lhs >= rhs,
            ThresholdBoundary::Strict => lhs > rhs,
        }
    }
}
