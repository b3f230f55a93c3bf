//! Fee periods and time-weighted balances
//!
//! A stake snapshot integrates balance over time (`balance * seconds`)
//! within the current fee period. When a period closes, the integral is
//! turned into the average balance held over that period. Nothing is
//! rolled over eagerly: each snapshot catches up the next time it is
//! touched, using the start times of the last three periods.

use serde::{Deserialize, Serialize};
use crate::math::{safe_add, safe_div, safe_mul, Amount, MathError};

/// The current fee period and the two before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePeriod {
    pub start_time: u64,
    pub last_start_time: u64,
    pub penultimate_start_time: u64,
    pub target_duration: u64,
    /// Actual length of the last completed period
    pub last_duration: u64,
    /// Fee pool value captured when the last period closed
    pub last_fees_collected: Amount,
}

impl FeePeriod {
    /// Open the first period at `now`, pretending the two before it ran to target
    pub fn new(now: u64, target_duration: u64) -> Self {
        Self {
            start_time: now,
            last_start_time: now.saturating_sub(target_duration),
            penultimate_start_time: now.saturating_sub(2 * target_duration),
            target_duration,
            last_duration: target_duration,
            last_fees_collected: 0,
        }
    }

    pub fn has_elapsed(&self, now: u64) -> bool {
        self.start_time.saturating_add(self.target_duration) <= now
    }

    /// The period that should be current at `now`, if it differs from this one
    pub fn rolled_over(&self, now: u64, fees_collected: Amount) -> Option<FeePeriod> {
        if !self.has_elapsed(now) {
            return None;
        }
        Some(FeePeriod {
            start_time: now,
            last_start_time: self.start_time,
            penultimate_start_time: self.last_start_time,
            target_duration: self.target_duration,
            last_duration: now - self.start_time,
            last_fees_collected: fees_collected,
        })
    }
}

/// Time-weighted balance record for one account (or the whole supply)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeSnapshot {
    /// Integral of balance over time since the current period began
    pub current_balance_sum: Amount,
    pub last_average_balance: Amount,
    pub penultimate_average_balance: Amount,
    pub last_transfer_timestamp: u64,
    pub has_withdrawn_last_period_fees: bool,
}

impl StakeSnapshot {
    /// Close out any periods that ended since this snapshot was last touched.
    ///
    /// `pre_balance` is the balance held, unchanged, since
    /// `last_transfer_timestamp`. Returns whether a rollover happened.
    pub fn roll_over(&mut self, period: &FeePeriod, pre_balance: Amount) -> Result<bool, MathError> {
        let last_transfer = self.last_transfer_timestamp;
        if last_transfer >= period.start_time {
            return Ok(false);
        }

        if last_transfer < period.last_start_time {
            // Untouched for the whole of the last period: its average is just the balance.
            self.penultimate_average_balance = if last_transfer < period.penultimate_start_time {
                pre_balance
            } else {
                let held = safe_mul(pre_balance, (period.last_start_time - last_transfer) as Amount)?;
                safe_div(
                    safe_add(self.current_balance_sum, held)?,
                    (period.last_start_time - period.penultimate_start_time) as Amount,
                )?
            };
            self.last_average_balance = pre_balance;
        } else {
            let held = safe_mul(pre_balance, (period.start_time - last_transfer) as Amount)?;
            self.penultimate_average_balance = self.last_average_balance;
            self.last_average_balance = safe_div(
                safe_add(self.current_balance_sum, held)?,
                (period.start_time - period.last_start_time) as Amount,
            )?;
        }

        self.current_balance_sum = 0;
        self.has_withdrawn_last_period_fees = false;
        self.last_transfer_timestamp = period.start_time;
        Ok(true)
    }

    /// Account for `pre_balance` having been held up to `now`; call before every balance change
    pub fn accrue(&mut self, period: &FeePeriod, pre_balance: Amount, now: u64) -> Result<bool, MathError> {
        let rolled = self.roll_over(period, pre_balance)?;
        let elapsed = now.saturating_sub(self.last_transfer_timestamp);
        let held = safe_mul(pre_balance, elapsed as Amount)?;
        self.current_balance_sum = safe_add(self.current_balance_sum, held)?;
        self.last_transfer_timestamp = now;
        Ok(rolled)
    }
}
