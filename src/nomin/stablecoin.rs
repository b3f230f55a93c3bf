//! Nomin - the collateral-backed stablecoin
//!
//! The owner issues nomins into a pool against native-asset collateral held
//! at the nomin address. Anyone can buy from the pool at the oracle price
//! plus a pool fee, and sell back at the price minus the fee. Collateral is
//! pooled; there is no per-user position.
//!
//! The contract is either running normally or liquidating. Liquidation is
//! entered by the owner or automatically when a price update leaves the
//! system under-collateralised. While liquidating nothing new can be issued
//! or bought, but holders can still sell. Once the liquidation period has
//! run out (or every circulating nomin has come back) the owner can
//! self-destruct the contract, paying all remaining collateral to the
//! beneficiary.

use std::collections::HashSet;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use crate::constants::{
    AUTO_LIQUIDATION_RATIO, DEFAULT_LIQUIDATION_PERIOD, DEFAULT_POOL_FEE_RATE, MAX_LIQUIDATION_PERIOD,
    MINIMUM_ISSUANCE_RATIO, MINIMUM_PURCHASE, UNIT,
};
use crate::crypto::Address;
use crate::error::{LedgerError, Result, Role};
use crate::events::{Event, TokenKind};
use crate::math::{divide_decimal, multiply_decimal, safe_add, safe_sub, Amount};
use crate::storage::NativeLedger;
use crate::token::FeeToken;
use super::PriceFeed;

/// Deployment parameters
#[derive(Debug, Clone)]
pub struct NominParams {
    pub address: Address,
    pub state_address: Address,
    pub owner: Address,
    /// Receives transfer fees on behalf of havven holders
    pub fee_authority: Address,
    pub oracle: Address,
    pub court: Address,
    pub beneficiary: Address,
    pub ether_price: Amount,
    pub transfer_fee_rate: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nomin {
    token: FeeToken,
    price: PriceFeed,
    oracle: Address,
    court: Address,
    beneficiary: Address,
    /// Issued but unsold nomins
    nomin_pool: Amount,
    pool_fee_rate: Amount,
    liquidation_timestamp: Option<u64>,
    liquidation_period: u64,
    frozen: HashSet<Address>,
    destroyed: bool,
}

impl Nomin {
    pub fn new(params: NominParams, now: u64, events: &mut Vec<Event>) -> Result<Self> {
        let token = FeeToken::new(
            TokenKind::Nomin,
            params.address,
            params.state_address,
            params.owner,
            params.transfer_fee_rate,
            params.fee_authority,
        )?;
        events.push(Event::PriceUpdated {
            price: params.ether_price,
            sent_time: now,
        });
        Ok(Self {
            token,
            price: PriceFeed::new(params.ether_price, now),
            oracle: params.oracle,
            court: params.court,
            beneficiary: params.beneficiary,
            nomin_pool: 0,
            pool_fee_rate: DEFAULT_POOL_FEE_RATE,
            liquidation_timestamp: None,
            liquidation_period: DEFAULT_LIQUIDATION_PERIOD,
            frozen: HashSet::new(),
            destroyed: false,
        })
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.token.address()
    }

    pub fn token(&self) -> &FeeToken {
        &self.token
    }

    pub(crate) fn token_mut(&mut self) -> &mut FeeToken {
        &mut self.token
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.token.balance_of(account)
    }

    /// Every nomin in existence, pooled or circulating
    pub fn total_supply(&self) -> Amount {
        self.token.total_supply()
    }

    pub fn nomin_pool(&self) -> Amount {
        self.nomin_pool
    }

    /// Nomins held outside the issuance pool (including the fee pool)
    pub fn circulating_supply(&self) -> Amount {
        self.total_supply().saturating_sub(self.nomin_pool)
    }

    pub fn fee_pool(&self) -> Amount {
        self.token.fee_pool()
    }

    pub fn price_feed(&self) -> &PriceFeed {
        &self.price
    }

    pub fn ether_price(&self) -> Amount {
        self.price.ether_price()
    }

    pub fn oracle(&self) -> Address {
        self.oracle
    }

    pub fn court(&self) -> Address {
        self.court
    }

    pub fn beneficiary(&self) -> Address {
        self.beneficiary
    }

    pub fn pool_fee_rate(&self) -> Amount {
        self.pool_fee_rate
    }

    pub fn liquidation_timestamp(&self) -> Option<u64> {
        self.liquidation_timestamp
    }

    pub fn liquidation_period(&self) -> u64 {
        self.liquidation_period
    }

    pub fn is_liquidating(&self) -> bool {
        self.liquidation_timestamp.is_some()
    }

    pub fn is_frozen(&self, account: &Address) -> bool {
        self.frozen.contains(account)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn price_is_stale(&self, now: u64) -> bool {
        self.price.is_stale(now)
    }

    /// Holder balances + fee pool + issuance pool == total supply
    pub fn is_conserved(&self) -> bool {
        self.token.is_conserved(self.nomin_pool)
    }

    // ------------------------------------------------------------------
    // Pricing
    // ------------------------------------------------------------------

    fn ensure_live(&self) -> Result<()> {
        if self.destroyed {
            return Err(LedgerError::Destroyed);
        }
        Ok(())
    }

    fn only_owner(&self, caller: Address) -> Result<()> {
        self.ensure_live()?;
        self.token.owned().only_owner(caller)
    }

    fn not_liquidating(&self) -> Result<()> {
        if self.is_liquidating() {
            return Err(LedgerError::Liquidating);
        }
        Ok(())
    }

    /// Fiat value of a native quantity at the current (fresh) price
    pub fn fiat_value(&self, ether: Amount, now: u64) -> Result<Amount> {
        self.ensure_live()?;
        Ok(multiply_decimal(ether, self.price.fresh_price(now)?)?)
    }

    pub fn ether_value(&self, fiat: Amount, now: u64) -> Result<Amount> {
        self.ensure_live()?;
        Ok(divide_decimal(fiat, self.price.fresh_price(now)?)?)
    }

    fn ether_value_allow_stale(&self, fiat: Amount) -> Result<Amount> {
        Ok(divide_decimal(fiat, self.price.ether_price())?)
    }

    pub fn fiat_balance(&self, native: &NativeLedger, now: u64) -> Result<Amount> {
        self.fiat_value(native.balance_of(&self.address()), now)
    }

    /// Collateral value over total supply; undefined (divide-by-zero) with no supply
    pub fn collateralisation_ratio(&self, native: &NativeLedger, now: u64) -> Result<Amount> {
        let fiat = self.fiat_balance(native, now)?;
        Ok(divide_decimal(fiat, self.total_supply())?)
    }

    pub fn pool_fee_incurred(&self, quantity: Amount) -> Result<Amount> {
        Ok(multiply_decimal(quantity, self.pool_fee_rate)?)
    }

    pub fn purchase_cost_fiat(&self, quantity: Amount) -> Result<Amount> {
        Ok(safe_add(quantity, self.pool_fee_incurred(quantity)?)?)
    }

    pub fn purchase_cost_ether(&self, quantity: Amount, now: u64) -> Result<Amount> {
        self.ether_value(self.purchase_cost_fiat(quantity)?, now)
    }

    pub fn sale_proceeds_fiat(&self, quantity: Amount) -> Result<Amount> {
        Ok(safe_sub(quantity, self.pool_fee_incurred(quantity)?)?)
    }

    pub fn sale_proceeds_ether(&self, quantity: Amount, now: u64) -> Result<Amount> {
        self.ether_value(self.sale_proceeds_fiat(quantity)?, now)
    }

    fn sale_proceeds_ether_allow_stale(&self, quantity: Amount) -> Result<Amount> {
        self.ether_value_allow_stale(self.sale_proceeds_fiat(quantity)?)
    }

    pub fn can_self_destruct(&self, now: u64) -> bool {
        match self.liquidation_timestamp {
            Some(started) => {
                let period_elapsed = started.saturating_add(self.liquidation_period) < now;
                period_elapsed || self.total_supply() == 0
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Issuance and the pool
    // ------------------------------------------------------------------

    /// Mint `quantity` into the pool, optionally posting more collateral.
    ///
    /// The system must stay at least 200% collateralised afterwards.
    pub fn issue(
        &mut self,
        caller: Address,
        quantity: Amount,
        collateral: Amount,
        native: &mut NativeLedger,
        now: u64,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        self.only_owner(caller)?;
        self.not_liquidating()?;

        let backing = safe_add(native.balance_of(&self.address()), collateral)?;
        let new_supply = safe_add(self.total_supply(), quantity)?;
        let required = multiply_decimal(new_supply, MINIMUM_ISSUANCE_RATIO)?;
        if self.fiat_value(backing, now)? < required {
            return Err(LedgerError::InsufficientCollateral);
        }

        native.transfer(caller, self.address(), collateral)?;
        self.nomin_pool = safe_add(self.nomin_pool, quantity)?;
        self.token.set_total_supply(new_supply)?;
        events.push(Event::Issued { quantity, collateral });
        Ok(())
    }

    /// Destroy unsold nomins from the pool
    pub fn burn(&mut self, caller: Address, quantity: Amount, events: &mut Vec<Event>) -> Result<()> {
        self.only_owner(caller)?;
        if quantity > self.nomin_pool {
            return Err(LedgerError::InsufficientPool {
                required: quantity,
                available: self.nomin_pool,
            });
        }
        self.nomin_pool -= quantity;
        let supply = safe_sub(self.total_supply(), quantity)?;
        self.token.set_total_supply(supply)?;
        events.push(Event::Burned { quantity });
        Ok(())
    }

    /// Buy from the pool. The payment must match the quoted cost exactly.
    pub fn buy(
        &mut self,
        buyer: Address,
        quantity: Amount,
        payment: Amount,
        native: &mut NativeLedger,
        now: u64,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        self.ensure_live()?;
        self.not_liquidating()?;
        if quantity < MINIMUM_PURCHASE {
            return Err(LedgerError::PurchaseTooSmall {
                minimum: MINIMUM_PURCHASE,
            });
        }
        if quantity > self.nomin_pool {
            return Err(LedgerError::InsufficientPool {
                required: quantity,
                available: self.nomin_pool,
            });
        }
        let cost = self.purchase_cost_ether(quantity, now)?;
        if payment != cost {
            return Err(LedgerError::WrongPayment {
                expected: cost,
                received: payment,
            });
        }

        native.transfer(buyer, self.address(), payment)?;
        self.nomin_pool -= quantity;
        self.token.credit(buyer, quantity)?;
        events.push(Event::Purchased {
            buyer,
            quantity,
            payment,
        });
        events.push(Event::Transfer {
            token: TokenKind::Nomin,
            from: Address::zero(),
            to: buyer,
            value: quantity,
        });
        Ok(())
    }

    /// Sell back to the pool. Always open, even on a stale price.
    pub fn sell(
        &mut self,
        seller: Address,
        quantity: Amount,
        native: &mut NativeLedger,
        events: &mut Vec<Event>,
    ) -> Result<Amount> {
        self.ensure_live()?;
        if self.is_frozen(&seller) {
            return Err(LedgerError::AccountFrozen(seller));
        }
        let balance = self.balance_of(&seller);
        if balance < quantity {
            return Err(LedgerError::InsufficientBalance {
                required: quantity,
                available: balance,
            });
        }
        let proceeds = self.sale_proceeds_ether_allow_stale(quantity)?;
        if native.balance_of(&self.address()) < proceeds {
            return Err(LedgerError::InsufficientCollateral);
        }

        self.token.debit(seller, quantity)?;
        self.nomin_pool = safe_add(self.nomin_pool, quantity)?;
        native.transfer(self.address(), seller, proceeds)?;
        events.push(Event::Sold {
            seller,
            quantity,
            proceeds,
        });
        events.push(Event::Transfer {
            token: TokenKind::Nomin,
            from: seller,
            to: Address::zero(),
            value: quantity,
        });
        Ok(proceeds)
    }

    /// Send native collateral to the contract
    pub fn deposit_collateral(
        &mut self,
        from: Address,
        amount: Amount,
        native: &mut NativeLedger,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        self.ensure_live()?;
        native.transfer(from, self.address(), amount)?;
        events.push(Event::CollateralDeposited { from, amount });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Price and liquidation
    // ------------------------------------------------------------------

    /// Oracle price push; liquidates automatically if collateral no longer covers supply
    pub fn update_price(
        &mut self,
        caller: Address,
        price: Amount,
        sent_time: u64,
        native: &NativeLedger,
        now: u64,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        self.ensure_live()?;
        if caller != self.oracle {
            return Err(LedgerError::Unauthorized(Role::Oracle));
        }
        if let Err(err) = self.price.accept(price, sent_time, now) {
            warn!(sent_time, now, "rejected out-of-order price update");
            return Err(err);
        }
        events.push(Event::PriceUpdated { price, sent_time });

        if !self.is_liquidating()
            && self.total_supply() != 0
            && self.collateralisation_ratio(native, now)? < AUTO_LIQUIDATION_RATIO
        {
            self.begin_liquidation(now, events);
        }
        Ok(())
    }

    fn begin_liquidation(&mut self, now: u64, events: &mut Vec<Event>) {
        warn!(period = self.liquidation_period, "liquidation begun");
        self.liquidation_timestamp = Some(now);
        events.push(Event::Liquidation {
            period: self.liquidation_period,
        });
    }

    pub fn force_liquidation(&mut self, caller: Address, now: u64, events: &mut Vec<Event>) -> Result<()> {
        self.only_owner(caller)?;
        if self.is_liquidating() {
            return Err(LedgerError::AlreadyLiquidating);
        }
        self.begin_liquidation(now, events);
        Ok(())
    }

    /// Return to normal operation; requires a fresh price and full collateralisation
    pub fn terminate_liquidation(
        &mut self,
        caller: Address,
        native: &NativeLedger,
        now: u64,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        self.only_owner(caller)?;
        self.price.fresh_price(now)?;
        if !self.is_liquidating() {
            return Err(LedgerError::NotLiquidating);
        }
        if self.total_supply() != 0 && self.collateralisation_ratio(native, now)? < AUTO_LIQUIDATION_RATIO {
            return Err(LedgerError::Undercollateralized);
        }
        self.liquidation_timestamp = None;
        self.liquidation_period = DEFAULT_LIQUIDATION_PERIOD;
        info!("liquidation terminated");
        events.push(Event::LiquidationTerminated);
        Ok(())
    }

    pub fn extend_liquidation_period(&mut self, caller: Address, extension: u64, events: &mut Vec<Event>) -> Result<()> {
        self.only_owner(caller)?;
        if !self.is_liquidating() {
            return Err(LedgerError::NotLiquidating);
        }
        let period = self.liquidation_period.saturating_add(extension);
        if period > MAX_LIQUIDATION_PERIOD {
            return Err(LedgerError::PeriodTooLong {
                period,
                max: MAX_LIQUIDATION_PERIOD,
            });
        }
        self.liquidation_period = period;
        events.push(Event::LiquidationExtended { extension, period });
        Ok(())
    }

    /// Wind down: pay all collateral to the beneficiary. Irreversible.
    pub fn self_destruct(
        &mut self,
        caller: Address,
        native: &mut NativeLedger,
        now: u64,
        events: &mut Vec<Event>,
    ) -> Result<Amount> {
        self.only_owner(caller)?;
        if !self.can_self_destruct(now) {
            return Err(LedgerError::CannotSelfDestruct);
        }
        let payout = native.balance_of(&self.address());
        native.transfer(self.address(), self.beneficiary, payout)?;
        self.destroyed = true;
        warn!(beneficiary = %self.beneficiary, payout, "nomin contract self-destructed");
        events.push(Event::SelfDestructed {
            beneficiary: self.beneficiary,
            payout,
        });
        Ok(payout)
    }

    // ------------------------------------------------------------------
    // Freezing
    // ------------------------------------------------------------------

    /// Seize `target`'s whole balance into the fee pool and freeze the account (court only)
    pub fn confiscate_balance(&mut self, caller: Address, target: Address, events: &mut Vec<Event>) -> Result<Amount> {
        self.ensure_live()?;
        if caller != self.court {
            return Err(LedgerError::Unauthorized(Role::Court));
        }
        if self.is_frozen(&target) {
            return Err(LedgerError::AlreadyFrozen(target));
        }
        let pool = self.address();
        let balance = self.balance_of(&target);
        self.token.debit(target, balance)?;
        self.token.credit(pool, balance)?;
        self.frozen.insert(target);

        info!(%target, balance, "account frozen");
        events.push(Event::AccountFrozen {
            account: target,
            balance,
        });
        events.push(Event::Transfer {
            token: TokenKind::Nomin,
            from: target,
            to: pool,
            value: balance,
        });
        Ok(balance)
    }

    pub fn unfreeze_account(&mut self, caller: Address, target: Address, events: &mut Vec<Event>) -> Result<()> {
        self.only_owner(caller)?;
        if self.frozen.remove(&target) {
            events.push(Event::AccountUnfrozen { account: target });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Token operations
    // ------------------------------------------------------------------

    fn ensure_can_send(&self, account: Address, value: Amount) -> Result<()> {
        if value > 0 && self.is_frozen(&account) {
            return Err(LedgerError::AccountFrozen(account));
        }
        Ok(())
    }

    pub fn transfer(&mut self, sender: Address, to: Address, value: Amount, events: &mut Vec<Event>) -> Result<Amount> {
        self.ensure_live()?;
        self.ensure_can_send(sender, value)?;
        self.token.transfer(sender, to, value, events)
    }

    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        value: Amount,
        events: &mut Vec<Event>,
    ) -> Result<Amount> {
        self.ensure_live()?;
        self.ensure_can_send(from, value)?;
        self.token.transfer_from(spender, from, to, value, events)
    }

    pub fn approve(&mut self, owner: Address, spender: Address, value: Amount, events: &mut Vec<Event>) -> Result<()> {
        self.ensure_live()?;
        self.token.approve(owner, spender, value, events)
    }

    pub fn donate_to_fee_pool(&mut self, donor: Address, value: Amount, events: &mut Vec<Event>) -> Result<()> {
        self.ensure_live()?;
        self.ensure_can_send(donor, value)?;
        self.token.donate_to_fee_pool(donor, value, events)
    }

    pub fn withdraw_fee(&mut self, caller: Address, to: Address, value: Amount, events: &mut Vec<Event>) -> Result<()> {
        self.ensure_live()?;
        self.token.withdraw_fee(caller, to, value, events)
    }

    // ------------------------------------------------------------------
    // Owner settings
    // ------------------------------------------------------------------

    pub fn set_transfer_fee_rate(&mut self, caller: Address, rate: Amount, events: &mut Vec<Event>) -> Result<()> {
        self.ensure_live()?;
        self.token.set_transfer_fee_rate(caller, rate, events)
    }

    pub fn set_fee_authority(&mut self, caller: Address, authority: Address, events: &mut Vec<Event>) -> Result<()> {
        self.ensure_live()?;
        self.token.set_fee_authority(caller, authority, events)
    }

    pub fn set_oracle(&mut self, caller: Address, oracle: Address, events: &mut Vec<Event>) -> Result<()> {
        self.only_owner(caller)?;
        self.oracle = oracle;
        events.push(Event::OracleUpdated { oracle });
        Ok(())
    }

    pub fn set_court(&mut self, caller: Address, court: Address, events: &mut Vec<Event>) -> Result<()> {
        self.only_owner(caller)?;
        self.court = court;
        events.push(Event::CourtUpdated { court });
        Ok(())
    }

    pub fn set_beneficiary(&mut self, caller: Address, beneficiary: Address, events: &mut Vec<Event>) -> Result<()> {
        self.only_owner(caller)?;
        self.beneficiary = beneficiary;
        events.push(Event::BeneficiaryUpdated { beneficiary });
        Ok(())
    }

    pub fn set_pool_fee_rate(&mut self, caller: Address, rate: Amount, events: &mut Vec<Event>) -> Result<()> {
        self.only_owner(caller)?;
        if rate > UNIT {
            return Err(LedgerError::RateTooHigh { rate, max: UNIT });
        }
        self.pool_fee_rate = rate;
        events.push(Event::PoolFeeRateUpdated { rate });
        Ok(())
    }

    pub fn set_stale_period(&mut self, caller: Address, period: u64, events: &mut Vec<Event>) -> Result<()> {
        self.only_owner(caller)?;
        self.price.set_stale_period(period);
        events.push(Event::StalePeriodUpdated { period });
        Ok(())
    }
}
