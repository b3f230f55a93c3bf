//! Nomin module - oracle price feed and the collateral-backed stablecoin

mod price;
mod stablecoin;

pub use price::*;
pub use stablecoin::*;
