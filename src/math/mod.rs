//! Math module - fixed-point decimal arithmetic

mod fixed;
mod units;

pub use fixed::*;
pub use units::*;
