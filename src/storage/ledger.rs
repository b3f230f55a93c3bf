//! Token ledger
//!
//! Balances, allowances and total supply for one token, kept apart from the
//! logic that moves them. Only the associated contract may mutate the
//! ledger; the ledger's owner can point it at a different contract, which
//! takes effect on the very next call with no migration step.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use crate::crypto::Address;
use crate::error::{LedgerError, Result, Role};
use crate::math::Amount;
use crate::owned::Owned;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenState {
    owned: Owned,
    associated_contract: Address,
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
    total_supply: Amount,
}

impl TokenState {
    /// Create an empty ledger owned by `owner` and writable by `associated_contract`
    pub fn new(address: Address, owner: Address, associated_contract: Address) -> Self {
        Self {
            owned: Owned::new(address, owner),
            associated_contract,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            total_supply: 0,
        }
    }

    pub fn owned(&self) -> &Owned {
        &self.owned
    }

    pub fn owned_mut(&mut self) -> &mut Owned {
        &mut self.owned
    }

    pub fn associated_contract(&self) -> Address {
        self.associated_contract
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// All non-zero balances
    pub fn balances(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter()
    }

    fn only_associated_contract(&self, caller: Address) -> Result<()> {
        if caller != self.associated_contract {
            return Err(LedgerError::Unauthorized(Role::AssociatedContract));
        }
        Ok(())
    }

    pub fn set_balance(&mut self, caller: Address, account: Address, value: Amount) -> Result<()> {
        self.only_associated_contract(caller)?;
        if value == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, value);
        }
        Ok(())
    }

    pub fn set_allowance(&mut self, caller: Address, owner: Address, spender: Address, value: Amount) -> Result<()> {
        self.only_associated_contract(caller)?;
        if value == 0 {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), value);
        }
        Ok(())
    }

    pub fn set_total_supply(&mut self, caller: Address, value: Amount) -> Result<()> {
        self.only_associated_contract(caller)?;
        self.total_supply = value;
        Ok(())
    }

    /// Hand mutation rights to another contract (owner only)
    pub fn set_associated_contract(&mut self, caller: Address, contract: Address) -> Result<()> {
        self.owned.only_owner(caller)?;
        self.associated_contract = contract;
        Ok(())
    }
}
