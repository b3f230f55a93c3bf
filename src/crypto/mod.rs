//! Cryptography module - BLAKE3-derived account addresses

mod address;

pub use address::*;
