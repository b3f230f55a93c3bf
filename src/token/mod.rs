//! Token module - fee-charging tokens and time-weighted stake accounting

mod fee_token;
mod stake;
mod havven;

pub use fee_token::*;
pub use stake::*;
pub use havven::*;
