//! Transfer-with-fee token
//!
//! Every transfer charges `value * rate` on top of the value sent. The fee
//! lands in the fee pool, which is the ledger balance held by the token's
//! own address, so balances plus pool always equal the total supply.
//! Only the fee authority can draw the pool down.

use serde::{Deserialize, Serialize};
use crate::constants::{MAX_TRANSFER_FEE_RATE, UNIT};
use crate::crypto::Address;
use crate::error::{LedgerError, Result, Role};
use crate::events::{Event, TokenKind};
use crate::math::{divide_decimal, multiply_decimal, safe_add, Amount};
use crate::owned::Owned;
use crate::storage::TokenState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeToken {
    kind: TokenKind,
    address: Address,
    owned: Owned,
    state: TokenState,
    transfer_fee_rate: Amount,
    fee_authority: Address,
}

impl FeeToken {
    /// Create a token together with its ledger.
    ///
    /// The ledger is owned by the token owner and writable by the token.
    pub fn new(
        kind: TokenKind,
        address: Address,
        state_address: Address,
        owner: Address,
        transfer_fee_rate: Amount,
        fee_authority: Address,
    ) -> Result<Self> {
        check_fee_rate(transfer_fee_rate)?;
        Ok(Self {
            kind,
            address,
            owned: Owned::new(address, owner),
            state: TokenState::new(state_address, owner, address),
            transfer_fee_rate,
            fee_authority,
        })
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owned(&self) -> &Owned {
        &self.owned
    }

    pub fn owned_mut(&mut self) -> &mut Owned {
        &mut self.owned
    }

    pub fn state(&self) -> &TokenState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut TokenState {
        &mut self.state
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.state.balance_of(account)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.state.allowance(owner, spender)
    }

    pub fn total_supply(&self) -> Amount {
        self.state.total_supply()
    }

    pub fn fee_pool(&self) -> Amount {
        self.state.balance_of(&self.address)
    }

    pub fn transfer_fee_rate(&self) -> Amount {
        self.transfer_fee_rate
    }

    pub fn fee_authority(&self) -> Address {
        self.fee_authority
    }

    /// Sum of every balance except the fee pool
    pub fn holder_balances(&self) -> Amount {
        self.state
            .balances()
            .filter(|(account, _)| **account != self.address)
            .map(|(_, balance)| *balance)
            .sum()
    }

    pub fn transfer_fee_incurred(&self, value: Amount) -> Result<Amount> {
        Ok(multiply_decimal(value, self.transfer_fee_rate)?)
    }

    pub fn transfer_plus_fee(&self, value: Amount) -> Result<Amount> {
        Ok(safe_add(value, self.transfer_fee_incurred(value)?)?)
    }

    /// What a recipient gets if the sender parts with `value` in total
    pub fn amount_received(&self, value: Amount) -> Result<Amount> {
        Ok(divide_decimal(value, safe_add(UNIT, self.transfer_fee_rate)?)?)
    }

    fn check_recipient(&self, to: Address) -> Result<()> {
        if to.is_zero() || to == self.address {
            return Err(LedgerError::InvalidRecipient(to));
        }
        Ok(())
    }

    pub(crate) fn credit(&mut self, account: Address, value: Amount) -> Result<()> {
        let balance = safe_add(self.state.balance_of(&account), value)?;
        self.state.set_balance(self.address, account, balance)
    }

    pub(crate) fn debit(&mut self, account: Address, value: Amount) -> Result<()> {
        let available = self.state.balance_of(&account);
        if available < value {
            return Err(LedgerError::InsufficientBalance {
                required: value,
                available,
            });
        }
        self.state.set_balance(self.address, account, available - value)
    }

    pub(crate) fn set_total_supply(&mut self, value: Amount) -> Result<()> {
        self.state.set_total_supply(self.address, value)
    }

    /// Create `value` new tokens in `to`'s balance
    pub(crate) fn mint(&mut self, to: Address, value: Amount, events: &mut Vec<Event>) -> Result<()> {
        self.check_recipient(to)?;
        let supply = safe_add(self.total_supply(), value)?;
        self.credit(to, value)?;
        self.set_total_supply(supply)?;
        events.push(Event::Transfer {
            token: self.kind,
            from: Address::zero(),
            to,
            value,
        });
        Ok(())
    }

    /// Move `value` plus the fee out of `from`. Returns the fee charged.
    fn move_with_fee(&mut self, from: Address, to: Address, value: Amount, events: &mut Vec<Event>) -> Result<Amount> {
        self.check_recipient(to)?;
        let fee = self.transfer_fee_incurred(value)?;
        let total_charge = safe_add(value, fee)?;

        self.debit(from, total_charge)?;
        self.credit(to, value)?;
        self.credit(self.address, fee)?;

        events.push(Event::Transfer {
            token: self.kind,
            from,
            to,
            value,
        });
        if fee > 0 {
            events.push(Event::TransferFeePaid {
                token: self.kind,
                account: from,
                fee,
            });
            events.push(Event::Transfer {
                token: self.kind,
                from,
                to: self.address,
                value: fee,
            });
        }
        Ok(fee)
    }

    pub fn transfer(&mut self, sender: Address, to: Address, value: Amount, events: &mut Vec<Event>) -> Result<Amount> {
        self.move_with_fee(sender, to, value, events)
    }

    /// Spend from `from`'s allowance to `spender`. The allowance covers the fee too.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        value: Amount,
        events: &mut Vec<Event>,
    ) -> Result<Amount> {
        let total_charge = self.transfer_plus_fee(value)?;
        let allowance = self.state.allowance(&from, &spender);
        if allowance < total_charge {
            return Err(LedgerError::InsufficientAllowance {
                required: total_charge,
                available: allowance,
            });
        }
        let fee = self.move_with_fee(from, to, value, events)?;
        self.state
            .set_allowance(self.address, from, spender, allowance - total_charge)?;
        Ok(fee)
    }

    pub fn approve(&mut self, owner: Address, spender: Address, value: Amount, events: &mut Vec<Event>) -> Result<()> {
        self.state.set_allowance(self.address, owner, spender, value)?;
        events.push(Event::Approval {
            token: self.kind,
            owner,
            spender,
            value,
        });
        Ok(())
    }

    /// Pay `value` out of the fee pool. Zero-value withdrawals do nothing.
    pub fn withdraw_fee(&mut self, caller: Address, to: Address, value: Amount, events: &mut Vec<Event>) -> Result<()> {
        if caller != self.fee_authority {
            return Err(LedgerError::Unauthorized(Role::FeeAuthority));
        }
        if to.is_zero() {
            return Err(LedgerError::InvalidRecipient(to));
        }
        if value == 0 {
            return Ok(());
        }
        let pool = self.fee_pool();
        if value > pool {
            return Err(LedgerError::InsufficientPool {
                required: value,
                available: pool,
            });
        }
        self.state.set_balance(self.address, self.address, pool - value)?;
        self.credit(to, value)?;

        events.push(Event::FeesWithdrawn {
            token: self.kind,
            account: to,
            value,
        });
        events.push(Event::Transfer {
            token: self.kind,
            from: self.address,
            to,
            value,
        });
        Ok(())
    }

    /// Move part of the donor's balance straight into the pool, fee-free
    pub fn donate_to_fee_pool(&mut self, donor: Address, value: Amount, events: &mut Vec<Event>) -> Result<()> {
        let balance = self.state.balance_of(&donor);
        if balance == 0 || balance < value {
            return Err(LedgerError::InsufficientBalance {
                required: value,
                available: balance,
            });
        }
        self.debit(donor, value)?;
        self.credit(self.address, value)?;

        events.push(Event::FeesDonated {
            token: self.kind,
            donor,
            value,
        });
        events.push(Event::Transfer {
            token: self.kind,
            from: donor,
            to: self.address,
            value,
        });
        Ok(())
    }

    pub fn set_transfer_fee_rate(&mut self, caller: Address, rate: Amount, events: &mut Vec<Event>) -> Result<()> {
        self.owned.only_owner(caller)?;
        check_fee_rate(rate)?;
        self.transfer_fee_rate = rate;
        events.push(Event::TransferFeeRateUpdated {
            token: self.kind,
            rate,
        });
        Ok(())
    }

    pub fn set_fee_authority(&mut self, caller: Address, authority: Address, events: &mut Vec<Event>) -> Result<()> {
        self.owned.only_owner(caller)?;
        self.fee_authority = authority;
        events.push(Event::FeeAuthorityUpdated {
            token: self.kind,
            authority,
        });
        Ok(())
    }

    /// Re-point the ledger at another logic contract (ledger owner only)
    pub fn set_associated_contract(&mut self, caller: Address, contract: Address, events: &mut Vec<Event>) -> Result<()> {
        self.state.set_associated_contract(caller, contract)?;
        events.push(Event::AssociatedContractUpdated {
            token: self.kind,
            contract,
        });
        Ok(())
    }

    /// Supply-side checks used by invariant tests: holders + pool (+ extra) == supply
    pub fn is_conserved(&self, extra: Amount) -> bool {
        safe_add(self.holder_balances(), self.fee_pool())
            .and_then(|sum| safe_add(sum, extra))
            .map(|sum| sum == self.total_supply())
            .unwrap_or(false)
    }
}

fn check_fee_rate(rate: Amount) -> Result<()> {
    if rate > MAX_TRANSFER_FEE_RATE {
        return Err(LedgerError::RateTooHigh {
            rate,
            max: MAX_TRANSFER_FEE_RATE,
        });
    }
    Ok(())
}
