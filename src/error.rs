//! Ledger error types
//!
//! Every failure aborts the whole call. Variants are grouped into the four
//! kinds reported to callers plus the terminal `Destroyed` condition.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use crate::court::MotionId;
use crate::crypto::Address;
use crate::math::{Amount, MathError};

/// The capability a caller was missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Owner,
    NominatedOwner,
    AssociatedContract,
    FeeAuthority,
    Court,
    Oracle,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Owner => "owner",
            Role::NominatedOwner => "nominated owner",
            Role::AssociatedContract => "associated contract",
            Role::FeeAuthority => "fee authority",
            Role::Court => "court",
            Role::Oracle => "oracle",
        };
        f.write_str(name)
    }
}

/// Coarse classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Authorization,
    Arithmetic,
    StatePrecondition,
    ParameterBounds,
    Terminal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Unauthorized: caller is not the {0}")]
    Unauthorized(Role),

    #[error(transparent)]
    Math(#[from] MathError),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Amount, available: Amount },
    #[error("Insufficient allowance: required {required}, available {available}")]
    InsufficientAllowance { required: Amount, available: Amount },
    #[error("Insufficient pool: required {required}, available {available}")]
    InsufficientPool { required: Amount, available: Amount },
    #[error("Insufficient native balance: required {required}, available {available}")]
    InsufficientNativeBalance { required: Amount, available: Amount },
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(Address),
    #[error("Fees for the last period already withdrawn")]
    AlreadyWithdrawn,

    #[error("Price is stale")]
    StalePrice,
    #[error("Price update rejected: sent at {sent_time}, last update {last_update}")]
    StaleUpdate { sent_time: u64, last_update: u64 },
    #[error("Wrong payment: expected {expected}, received {received}")]
    WrongPayment { expected: Amount, received: Amount },
    #[error("Insufficient collateral")]
    InsufficientCollateral,
    #[error("Purchase below minimum of {minimum}")]
    PurchaseTooSmall { minimum: Amount },
    #[error("Not permitted while liquidating")]
    Liquidating,
    #[error("Not liquidating")]
    NotLiquidating,
    #[error("Already liquidating")]
    AlreadyLiquidating,
    #[error("Collateralisation ratio below 100%")]
    Undercollateralized,
    #[error("Self-destruct conditions not met")]
    CannotSelfDestruct,
    #[error("Contract has self-destructed")]
    Destroyed,
    #[error("Account is frozen: {0}")]
    AccountFrozen(Address),
    #[error("Account already frozen: {0}")]
    AlreadyFrozen(Address),

    #[error("Account already under motion: {0}")]
    AlreadyUnderMotion(Address),
    #[error("Insufficient standing to begin a motion")]
    InsufficientStanding,
    #[error("Motion not found: {0}")]
    MotionNotFound(MotionId),
    #[error("Motion {0} is not in its voting period")]
    NotVoting(MotionId),
    #[error("Motion {0} is not in its confirmation period")]
    NotConfirming(MotionId),
    #[error("Motion {0} is neither voting nor confirming")]
    MotionNotActive(MotionId),
    #[error("Motion {0} is still open")]
    StillConfirming(MotionId),
    #[error("Motion {0} did not pass")]
    MotionFailed(MotionId),
    #[error("Target of a motion cannot vote on it")]
    TargetCannotVote,
    #[error("Voter has zero weight")]
    ZeroWeight,
    #[error("Already voted on motion {0}")]
    AlreadyVoted(MotionId),
    #[error("No vote recorded on motion {0}")]
    NotVoted(MotionId),
    #[error("Votes cannot be cancelled during confirmation")]
    CannotCancelDuringConfirmation,

    #[error("Clock moved backwards: last {last}, now {now}")]
    ClockRegression { last: u64, now: u64 },

    #[error("Rate {rate} exceeds maximum {max}")]
    RateTooHigh { rate: Amount, max: Amount },
    #[error("Period {period} exceeds maximum {max}")]
    PeriodTooLong { period: u64, max: u64 },
    #[error("Period {period} outside [{min}, {max}]")]
    PeriodOutOfRange { period: u64, min: u64, max: u64 },
    #[error("Voting period exceeds the fee period")]
    VotingPeriodExceedsFeePeriod,
    #[error("Required participation {0} below minimum")]
    ParticipationTooLow(Amount),
    #[error("Required majority {0} below minimum")]
    MajorityTooLow(Amount),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        use LedgerError::*;
        match self {
            Unauthorized(_) => ErrorKind::Authorization,
            Math(_) => ErrorKind::Arithmetic,
            RateTooHigh { .. }
            | PeriodTooLong { .. }
            | PeriodOutOfRange { .. }
            | VotingPeriodExceedsFeePeriod
            | ParticipationTooLow(_)
            | MajorityTooLow(_) => ErrorKind::ParameterBounds,
            Destroyed => ErrorKind::Terminal,
            _ => ErrorKind::StatePrecondition,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Failures of the node around the engine: disk, encoding, configuration
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("Invalid config: {0}")]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
