//! Node module - the transaction engine and its genesis deployment

mod engine;
mod genesis;

pub use engine::*;
pub use genesis::*;
