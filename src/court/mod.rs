//! Court module - stake-weighted confiscation motions

mod motion;
mod confiscation;

pub use motion::*;
pub use confiscation::*;
