//! JSON-RPC API Module
//!
//! Provides an HTTP interface for querying contract state and submitting transactions.

mod methods;
mod server;

pub use methods::*;
pub use server::*;
