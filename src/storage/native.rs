//! Native-asset balances
//!
//! The substrate's own currency (ether, in the original deployment). Nomin
//! collateral is simply the native balance held at the nomin address.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use crate::crypto::Address;
use crate::error::{LedgerError, Result};
use crate::math::{safe_add, Amount};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NativeLedger {
    balances: HashMap<Address, Amount>,
}

impl NativeLedger {
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
        }
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Mint native units to an account (genesis allocations)
    pub fn credit(&mut self, account: Address, amount: Amount) -> Result<()> {
        let balance = safe_add(self.balance_of(&account), amount)?;
        self.balances.insert(account, balance);
        Ok(())
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<()> {
        let available = self.balance_of(&from);
        if available < amount {
            return Err(LedgerError::InsufficientNativeBalance {
                required: amount,
                available,
            });
        }
        if amount == 0 || from == to {
            return Ok(());
        }
        self.balances.insert(from, available - amount);
        let credited = safe_add(self.balance_of(&to), amount)?;
        self.balances.insert(to, credited);
        Ok(())
    }

    /// Sum of every native balance
    pub fn total(&self) -> Result<Amount> {
        Ok(self
            .balances
            .values()
            .try_fold(0, |sum: Amount, balance| safe_add(sum, *balance))?)
    }
}
