//! Storage module - token ledgers, native-asset balances and persistence

mod ledger;
mod native;
mod db;

pub use ledger::*;
pub use native::*;
pub use db::*;
