//! Nomin Core Library
//!
//! A deterministic ledger engine for the Havven / Nomin system:
//! a collateral-backed stablecoin (nomin), a fee-entitling stake token
//! (havven) with time-weighted balances, and a court that can freeze and
//! confiscate the balances of malicious accounts.
//!
//! Every public entrypoint runs as an atomic transaction through
//! [`node::Engine`]; time only moves when a transaction carries it forward.

pub mod math;
pub mod crypto;
pub mod owned;
pub mod storage;
pub mod token;
pub mod nomin;
pub mod court;
pub mod events;
pub mod error;
pub mod node;
pub mod rpc;

/// Protocol constants - HARD-CODED, NEVER CONFIGURABLE
pub mod constants {
    /// Fixed-point scale: every monetary value is an integer multiple of 10^-18
    pub const UNIT: u128 = 1_000_000_000_000_000_000;

    pub const MINUTE: u64 = 60;
    pub const HOUR: u64 = 60 * MINUTE;
    pub const DAY: u64 = 24 * HOUR;
    pub const WEEK: u64 = 7 * DAY;

    /// Transfer fees may never exceed 10%
    pub const MAX_TRANSFER_FEE_RATE: u128 = UNIT / 10;

    /// Default nomin transfer fee (15 basis points)
    pub const NOMIN_TRANSFER_FEE_RATE: u128 = 15 * UNIT / 10_000;

    /// Default pool fee charged on buys and sells (0.5%)
    pub const DEFAULT_POOL_FEE_RATE: u128 = UNIT / 200;

    /// Smallest quantity of nomins that can be bought from the pool
    pub const MINIMUM_PURCHASE: u128 = UNIT / 100;

    /// Issuance must leave the system at least 200% collateralised
    pub const MINIMUM_ISSUANCE_RATIO: u128 = 2 * UNIT;

    /// Falling below 100% collateralisation triggers liquidation
    pub const AUTO_LIQUIDATION_RATIO: u128 = UNIT;

    pub const DEFAULT_LIQUIDATION_PERIOD: u64 = 90 * DAY;
    pub const MAX_LIQUIDATION_PERIOD: u64 = 180 * DAY;

    /// A price older than this is stale
    pub const DEFAULT_STALE_PERIOD: u64 = 2 * DAY;

    /// Oracle updates may not be timestamped further than this into the future
    pub const MAX_PRICE_UPDATE_DRIFT: u64 = 10 * MINUTE;

    /// Havven supply minted to the owner at genesis (10^8 havvens)
    pub const INITIAL_HAVVEN_SUPPLY: u128 = 100_000_000 * UNIT;

    pub const DEFAULT_FEE_PERIOD_DURATION: u64 = 4 * WEEK;
    pub const MIN_FEE_PERIOD_DURATION: u64 = DAY;
    pub const MAX_FEE_PERIOD_DURATION: u64 = 26 * WEEK;

    pub const DEFAULT_MIN_STANDING_BALANCE: u128 = 100 * UNIT;

    pub const DEFAULT_VOTING_PERIOD: u64 = WEEK;
    pub const MIN_VOTING_PERIOD: u64 = 3 * DAY;
    pub const MAX_VOTING_PERIOD: u64 = 4 * WEEK;

    pub const DEFAULT_CONFIRMATION_PERIOD: u64 = WEEK;
    pub const MIN_CONFIRMATION_PERIOD: u64 = DAY;
    pub const MAX_CONFIRMATION_PERIOD: u64 = 2 * WEEK;

    pub const DEFAULT_REQUIRED_PARTICIPATION: u128 = 3 * UNIT / 10;
    pub const MIN_REQUIRED_PARTICIPATION: u128 = UNIT / 10;

    pub const DEFAULT_REQUIRED_MAJORITY: u128 = 2 * UNIT / 3;
    pub const MIN_REQUIRED_MAJORITY: u128 = UNIT / 2;
}

pub use error::{LedgerError, Result};
pub use node::{Call, Engine, Receipt, Transaction};
