//! Event stream
//!
//! Contracts append events to the transaction's buffer as they act; the
//! engine commits them to the log only if the whole call succeeds.

use serde::{Deserialize, Serialize};
use crate::court::MotionId;
use crate::crypto::Address;
use crate::math::Amount;

/// Which fee token an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Havven,
    Nomin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    // Ledger and fee token
    Transfer { token: TokenKind, from: Address, to: Address, value: Amount },
    Approval { token: TokenKind, owner: Address, spender: Address, value: Amount },
    TransferFeePaid { token: TokenKind, account: Address, fee: Amount },
    FeesWithdrawn { token: TokenKind, account: Address, value: Amount },
    FeesDonated { token: TokenKind, donor: Address, value: Amount },
    TransferFeeRateUpdated { token: TokenKind, rate: Amount },
    FeeAuthorityUpdated { token: TokenKind, authority: Address },
    AssociatedContractUpdated { token: TokenKind, contract: Address },

    // Ownership
    OwnerNominated { contract: Address, nominee: Address },
    OwnerChanged { contract: Address, old_owner: Address, new_owner: Address },

    // Havven fee periods
    FeePeriodRollover { start_time: u64, last_fees_collected: Amount },
    FeePeriodDurationUpdated { duration: u64 },

    // Nomin
    PriceUpdated { price: Amount, sent_time: u64 },
    Issued { quantity: Amount, collateral: Amount },
    Burned { quantity: Amount },
    Purchased { buyer: Address, quantity: Amount, payment: Amount },
    Sold { seller: Address, quantity: Amount, proceeds: Amount },
    CollateralDeposited { from: Address, amount: Amount },
    Liquidation { period: u64 },
    LiquidationExtended { extension: u64, period: u64 },
    LiquidationTerminated,
    SelfDestructed { beneficiary: Address, payout: Amount },
    AccountFrozen { account: Address, balance: Amount },
    AccountUnfrozen { account: Address },
    OracleUpdated { oracle: Address },
    CourtUpdated { court: Address },
    BeneficiaryUpdated { beneficiary: Address },
    PoolFeeRateUpdated { rate: Amount },
    StalePeriodUpdated { period: u64 },

    // Court
    MotionBegun { initiator: Address, target: Address, motion_id: MotionId },
    VotedFor { voter: Address, motion_id: MotionId, weight: Amount },
    VotedAgainst { voter: Address, motion_id: MotionId, weight: Amount },
    VoteCancelled { voter: Address, motion_id: MotionId },
    MotionClosed { motion_id: MotionId },
    MotionApproved { motion_id: MotionId },
    MotionVetoed { motion_id: MotionId },
}

/// A committed event with its position in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub timestamp: u64,
    pub event: Event,
}
