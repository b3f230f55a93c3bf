//! Oracle price feed
//!
//! Holds the last accepted ether price (fiat per native unit, 18 decimals)
//! and decides when it has gone stale.

use serde::{Deserialize, Serialize};
use crate::constants::{DEFAULT_STALE_PERIOD, MAX_PRICE_UPDATE_DRIFT};
use crate::error::{LedgerError, Result};
use crate::math::Amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFeed {
    ether_price: Amount,
    /// Send time of the last accepted update
    last_price_update: u64,
    stale_period: u64,
}

impl PriceFeed {
    pub fn new(ether_price: Amount, now: u64) -> Self {
        Self {
            ether_price,
            last_price_update: now,
            stale_period: DEFAULT_STALE_PERIOD,
        }
    }

    pub fn ether_price(&self) -> Amount {
        self.ether_price
    }

    pub fn last_price_update(&self) -> u64 {
        self.last_price_update
    }

    pub fn stale_period(&self) -> u64 {
        self.stale_period
    }

    pub fn set_stale_period(&mut self, period: u64) {
        self.stale_period = period;
    }

    pub fn is_stale(&self, now: u64) -> bool {
        now.saturating_sub(self.last_price_update) > self.stale_period
    }

    /// The current price, refusing to quote a stale one
    pub fn fresh_price(&self, now: u64) -> Result<Amount> {
        if self.is_stale(now) {
            return Err(LedgerError::StalePrice);
        }
        Ok(self.ether_price)
    }

    /// Accept an update sent at `sent_time`.
    ///
    /// Updates must arrive in order and may not claim to come from more
    /// than ten minutes in the future.
    pub fn accept(&mut self, price: Amount, sent_time: u64, now: u64) -> Result<()> {
        let in_order = sent_time > self.last_price_update;
        let not_ahead = sent_time <= now.saturating_add(MAX_PRICE_UPDATE_DRIFT);
        if !(in_order && not_ahead) {
            return Err(LedgerError::StaleUpdate {
                sent_time,
                last_update: self.last_price_update,
            });
        }
        self.ether_price = price;
        self.last_price_update = sent_time;
        Ok(())
    }
}
