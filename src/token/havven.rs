//! Havven - the fee-entitling stake token
//!
//! A fee token whose holders earn a share of the nomin transfer fees. The
//! share is proportional to the holder's average balance over the last
//! completed fee period, so stake only counts for as long as it is held.
//! Average balances also serve as vote weights in the court.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use crate::constants::{MAX_FEE_PERIOD_DURATION, MIN_FEE_PERIOD_DURATION};
use crate::crypto::Address;
use crate::error::{LedgerError, Result};
use crate::events::{Event, TokenKind};
use crate::math::{mul_div, Amount};
use crate::nomin::Nomin;
use super::{FeePeriod, FeeToken, StakeSnapshot};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Havven {
    token: FeeToken,
    fee_period: FeePeriod,
    stakes: HashMap<Address, StakeSnapshot>,
    /// The same record kept for the sum of all holder balances
    total_stake: StakeSnapshot,
}

impl Havven {
    /// Deploy the token and endow `owner` with the initial supply
    pub fn new(
        address: Address,
        state_address: Address,
        owner: Address,
        initial_supply: Amount,
        fee_period_duration: u64,
        now: u64,
        events: &mut Vec<Event>,
    ) -> Result<Self> {
        check_fee_period_duration(fee_period_duration)?;
        let token = FeeToken::new(TokenKind::Havven, address, state_address, owner, 0, owner)?;
        let mut havven = Self {
            token,
            fee_period: FeePeriod::new(now, fee_period_duration),
            stakes: HashMap::new(),
            total_stake: StakeSnapshot {
                last_transfer_timestamp: now,
                ..Default::default()
            },
        };
        if initial_supply > 0 {
            havven.mint(owner, owner, initial_supply, now, events)?;
        }
        Ok(havven)
    }

    pub fn address(&self) -> Address {
        self.token.address()
    }

    pub fn token(&self) -> &FeeToken {
        &self.token
    }

    /// Direct access for owner-level settings; balance changes must go through `Havven`
    pub(crate) fn token_mut(&mut self) -> &mut FeeToken {
        &mut self.token
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.token.balance_of(account)
    }

    pub fn total_supply(&self) -> Amount {
        self.token.total_supply()
    }

    /// Supply held by accounts (everything but the havven fee pool)
    pub fn staked_supply(&self) -> Amount {
        self.token.total_supply().saturating_sub(self.token.fee_pool())
    }

    pub fn fee_period(&self) -> &FeePeriod {
        &self.fee_period
    }

    pub fn stake_snapshot(&self, account: &Address) -> StakeSnapshot {
        self.stakes.get(account).copied().unwrap_or_default()
    }

    pub fn total_stake_snapshot(&self) -> StakeSnapshot {
        self.total_stake
    }

    /// `account`'s snapshot as it reads once caught up to the current fee period
    pub fn current_stake_snapshot(&self, account: &Address) -> Result<StakeSnapshot> {
        let mut snapshot = self.stake_snapshot(account);
        if *account != self.token.address() {
            snapshot.roll_over(&self.fee_period, self.token.balance_of(account))?;
        }
        Ok(snapshot)
    }

    pub fn current_total_stake_snapshot(&self) -> Result<StakeSnapshot> {
        let mut snapshot = self.total_stake;
        snapshot.roll_over(&self.fee_period, self.staked_supply())?;
        Ok(snapshot)
    }

    pub fn last_average_balance(&self, account: &Address) -> Amount {
        self.stake_snapshot(account).last_average_balance
    }

    pub fn penultimate_average_balance(&self, account: &Address) -> Amount {
        self.stake_snapshot(account).penultimate_average_balance
    }

    pub fn has_withdrawn_last_period_fees(&self, account: &Address) -> bool {
        self.stake_snapshot(account).has_withdrawn_last_period_fees
    }

    /// Start a new fee period if the current one has run its course.
    ///
    /// `fees_collected` is the nomin fee pool at this moment; it becomes the
    /// amount distributable for the period just closed.
    pub fn check_fee_period_rollover(&mut self, now: u64, fees_collected: Amount, events: &mut Vec<Event>) -> bool {
        match self.fee_period.rolled_over(now, fees_collected) {
            Some(next) => {
                info!(
                    start_time = next.start_time,
                    last_duration = next.last_duration,
                    fees_collected,
                    "fee period rolled over"
                );
                self.fee_period = next;
                events.push(Event::FeePeriodRollover {
                    start_time: now,
                    last_fees_collected: fees_collected,
                });
                true
            }
            None => false,
        }
    }

    /// Bring `account`'s time-weighted sum up to `now` before its balance changes
    fn adjust_stake(&mut self, account: Address, now: u64) -> Result<()> {
        if account == self.token.address() {
            return Ok(());
        }
        let pre_balance = self.token.balance_of(&account);
        let period = self.fee_period;
        self.stakes
            .entry(account)
            .or_default()
            .accrue(&period, pre_balance, now)?;
        Ok(())
    }

    fn adjust_total_stake(&mut self, now: u64) -> Result<()> {
        let pre_balance = self.staked_supply();
        let period = self.fee_period;
        self.total_stake.accrue(&period, pre_balance, now)?;
        Ok(())
    }

    fn adjust_parties(&mut self, from: Address, to: Address, now: u64) -> Result<()> {
        self.adjust_total_stake(now)?;
        self.adjust_stake(from, now)?;
        if to != from {
            self.adjust_stake(to, now)?;
        }
        Ok(())
    }

    pub fn transfer(&mut self, sender: Address, to: Address, value: Amount, now: u64, events: &mut Vec<Event>) -> Result<Amount> {
        self.adjust_parties(sender, to, now)?;
        self.token.transfer(sender, to, value, events)
    }

    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        value: Amount,
        now: u64,
        events: &mut Vec<Event>,
    ) -> Result<Amount> {
        self.adjust_parties(from, to, now)?;
        self.token.transfer_from(spender, from, to, value, events)
    }

    pub fn approve(&mut self, owner: Address, spender: Address, value: Amount, events: &mut Vec<Event>) -> Result<()> {
        self.token.approve(owner, spender, value, events)
    }

    /// Endow `to` with newly created havvens (owner only)
    pub fn mint(&mut self, caller: Address, to: Address, value: Amount, now: u64, events: &mut Vec<Event>) -> Result<()> {
        self.token.owned().only_owner(caller)?;
        self.adjust_parties(to, to, now)?;
        self.token.mint(to, value, events)
    }

    /// Pay out of the havven fee pool (fee authority only)
    pub fn withdraw_fee(&mut self, caller: Address, to: Address, value: Amount, now: u64, events: &mut Vec<Event>) -> Result<()> {
        self.adjust_parties(to, to, now)?;
        self.token.withdraw_fee(caller, to, value, events)
    }

    pub fn donate_to_fee_pool(&mut self, donor: Address, value: Amount, now: u64, events: &mut Vec<Event>) -> Result<()> {
        self.adjust_parties(donor, donor, now)?;
        self.token.donate_to_fee_pool(donor, value, events)
    }

    /// Catch `account` up to the current fee period and return its last average balance
    pub fn recompute_last_average_balance(&mut self, account: Address, now: u64) -> Result<Amount> {
        self.adjust_parties(account, account, now)?;
        Ok(self.last_average_balance(&account))
    }

    /// Fees owed to `account` for the last completed period, rounded down
    pub fn fee_entitlement(&self, account: &Address) -> Result<Amount> {
        let average = self.current_stake_snapshot(account)?.last_average_balance;
        if average == 0 {
            return Ok(0);
        }
        Ok(mul_div(
            self.fee_period.last_fees_collected,
            average,
            self.current_total_stake_snapshot()?.last_average_balance,
        )?)
    }

    /// Collect this account's share of last period's nomin fees, once per period
    pub fn withdraw_fee_entitlement(
        &mut self,
        account: Address,
        now: u64,
        nomin: &mut Nomin,
        events: &mut Vec<Event>,
    ) -> Result<Amount> {
        if nomin.is_frozen(&account) {
            return Err(LedgerError::AccountFrozen(account));
        }
        self.adjust_parties(account, account, now)?;
        if self.has_withdrawn_last_period_fees(&account) {
            return Err(LedgerError::AlreadyWithdrawn);
        }

        let owed = self.fee_entitlement(&account)?;
        self.stakes.entry(account).or_default().has_withdrawn_last_period_fees = true;
        if owed > 0 {
            nomin.withdraw_fee(self.address(), account, owed, events)?;
        }
        debug!(%account, owed, "fee entitlement withdrawn");
        Ok(owed)
    }

    pub fn set_target_fee_period_duration(&mut self, caller: Address, duration: u64, events: &mut Vec<Event>) -> Result<()> {
        self.token.owned().only_owner(caller)?;
        check_fee_period_duration(duration)?;
        self.fee_period.target_duration = duration;
        events.push(Event::FeePeriodDurationUpdated { duration });
        Ok(())
    }
}

fn check_fee_period_duration(duration: u64) -> Result<()> {
    if !(MIN_FEE_PERIOD_DURATION..=MAX_FEE_PERIOD_DURATION).contains(&duration) {
        return Err(LedgerError::PeriodOutOfRange {
            period: duration,
            min: MIN_FEE_PERIOD_DURATION,
            max: MAX_FEE_PERIOD_DURATION,
        });
    }
    Ok(())
}
