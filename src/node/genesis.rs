//! Genesis deployment
//!
//! Deploys the three contracts, wires them to each other and seeds the
//! native-asset balances. Parameters come from a TOML file; amounts are
//! written as decimal strings (`"100000000"`, `"0.0015"`) since TOML
//! integers stop at 64 bits.

use std::path::Path;
use serde::{Deserialize, Serialize};
use tracing::info;
use crate::constants::{DEFAULT_FEE_PERIOD_DURATION, INITIAL_HAVVEN_SUPPLY, NOMIN_TRANSFER_FEE_RATE, UNIT};
use crate::court::Court;
use crate::crypto::Address;
use crate::error::{NodeError, Result};
use crate::events::EventRecord;
use crate::math::Amount;
use crate::nomin::{Nomin, NominParams};
use crate::storage::NativeLedger;
use crate::token::Havven;
use super::{Engine, EngineState};

/// 2018-03-01 00:00:00 UTC
const DEFAULT_GENESIS_TIME: u64 = 1_519_862_400;

/// Amounts as decimal strings in base units of `UNIT`
mod decimal {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use crate::math::{format_units, parse_units, Amount};

    pub fn serialize<S: Serializer>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_units(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_units(&text).map_err(D::Error::custom)
    }
}

/// A native-asset balance present at genesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub account: Address,
    #[serde(with = "decimal")]
    pub amount: Amount,
}

/// Deployment parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    pub genesis_time: u64,
    pub owner: Address,
    pub oracle: Address,
    pub beneficiary: Address,
    #[serde(with = "decimal")]
    pub initial_havven_supply: Amount,
    /// Fiat per native unit
    #[serde(with = "decimal")]
    pub ether_price: Amount,
    #[serde(with = "decimal")]
    pub nomin_transfer_fee_rate: Amount,
    pub fee_period_duration: u64,
    pub allocations: Vec<Allocation>,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        let owner = Address::from_label("owner");
        Self {
            genesis_time: DEFAULT_GENESIS_TIME,
            owner,
            oracle: Address::from_label("oracle"),
            beneficiary: owner,
            initial_havven_supply: INITIAL_HAVVEN_SUPPLY,
            ether_price: 1_000 * UNIT,
            nomin_transfer_fee_rate: NOMIN_TRANSFER_FEE_RATE,
            fee_period_duration: DEFAULT_FEE_PERIOD_DURATION,
            allocations: vec![Allocation {
                account: owner,
                amount: 1_000_000 * UNIT,
            }],
        }
    }
}

/// Where each contract lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub havven: Address,
    pub havven_state: Address,
    pub nomin: Address,
    pub nomin_state: Address,
    pub court: Address,
}

impl ContractAddresses {
    pub fn derive() -> Self {
        Self {
            havven: Address::from_label("havven"),
            havven_state: Address::from_label("havven-state"),
            nomin: Address::from_label("nomin"),
            nomin_state: Address::from_label("nomin-state"),
            court: Address::from_label("court"),
        }
    }
}

impl GenesisConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> std::result::Result<Self, NodeError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> std::result::Result<Self, NodeError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn addresses(&self) -> ContractAddresses {
        ContractAddresses::derive()
    }

    /// Deploy and wire every contract; the deployment events open the log
    pub fn build(&self) -> Result<Engine> {
        let addresses = self.addresses();
        let now = self.genesis_time;
        let mut events = Vec::new();

        let havven = Havven::new(
            addresses.havven,
            addresses.havven_state,
            self.owner,
            self.initial_havven_supply,
            self.fee_period_duration,
            now,
            &mut events,
        )?;
        let nomin = Nomin::new(
            NominParams {
                address: addresses.nomin,
                state_address: addresses.nomin_state,
                owner: self.owner,
                fee_authority: addresses.havven,
                oracle: self.oracle,
                court: addresses.court,
                beneficiary: self.beneficiary,
                ether_price: self.ether_price,
                transfer_fee_rate: self.nomin_transfer_fee_rate,
            },
            now,
            &mut events,
        )?;
        let court = Court::new(addresses.court, self.owner);

        let mut native = NativeLedger::new();
        for allocation in &self.allocations {
            native.credit(allocation.account, allocation.amount)?;
        }

        let log: Vec<EventRecord> = events
            .into_iter()
            .enumerate()
            .map(|(i, event)| EventRecord {
                sequence: i as u64,
                timestamp: now,
                event,
            })
            .collect();
        let state = EngineState {
            havven,
            nomin,
            court,
            native,
            last_timestamp: now,
            next_event_sequence: log.len() as u64,
            transaction_count: 0,
        };

        info!(
            havven = %addresses.havven,
            nomin = %addresses.nomin,
            court = %addresses.court,
            "genesis deployed"
        );
        Ok(Engine::restore(state, log))
    }
}
