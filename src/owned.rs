//! Two-step contract ownership
//!
//! The owner nominates a successor, who must accept before ownership moves.

use serde::{Deserialize, Serialize};
use crate::crypto::Address;
use crate::error::{LedgerError, Result, Role};
use crate::events::Event;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Owned {
    /// Address of the contract this ownership guards
    contract: Address,
    owner: Address,
    nominated_owner: Option<Address>,
}

impl Owned {
    pub fn new(contract: Address, owner: Address) -> Self {
        Self {
            contract,
            owner,
            nominated_owner: None,
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn nominated_owner(&self) -> Option<Address> {
        self.nominated_owner
    }

    pub fn is_owner(&self, caller: Address) -> bool {
        caller == self.owner
    }

    pub fn only_owner(&self, caller: Address) -> Result<()> {
        if !self.is_owner(caller) {
            return Err(LedgerError::Unauthorized(Role::Owner));
        }
        Ok(())
    }

    pub fn nominate_owner(&mut self, caller: Address, nominee: Address, events: &mut Vec<Event>) -> Result<()> {
        self.only_owner(caller)?;
        self.nominated_owner = Some(nominee);
        events.push(Event::OwnerNominated {
            contract: self.contract,
            nominee,
        });
        Ok(())
    }

    pub fn accept_ownership(&mut self, caller: Address, events: &mut Vec<Event>) -> Result<()> {
        if self.nominated_owner != Some(caller) {
            return Err(LedgerError::Unauthorized(Role::NominatedOwner));
        }
        let old_owner = self.owner;
        self.owner = caller;
        self.nominated_owner = None;
        events.push(Event::OwnerChanged {
            contract: self.contract,
            old_owner,
            new_owner: caller,
        });
        Ok(())
    }
}
