//! Atomic transaction engine
//!
//! The single writer over all contract state. Each transaction names its
//! sender, the time it executes at, and one contract call. The call runs
//! against a copy of the state; only if it succeeds does the copy replace
//! the live state and its events join the log. A failed call leaves no
//! trace.
//!
//! Time never moves on its own. Every transaction must be at least as late
//! as the last committed one, and the fee-period rollover check runs at the
//! start of each call.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::court::{Court, MotionId, ThresholdBoundary};
use crate::crypto::Address;
use crate::error::{LedgerError, Result};
use crate::events::{Event, EventRecord, TokenKind};
use crate::math::Amount;
use crate::nomin::Nomin;
use crate::owned::Owned;
use crate::storage::{NativeLedger, TokenState};
use crate::token::{FeeToken, Havven};

/// A contract whose ownership can change hands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractKind {
    Havven,
    HavvenState,
    Nomin,
    NominState,
    Court,
}

/// One public entrypoint, with its arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    // Havven
    HavvenTransfer { to: Address, value: Amount },
    HavvenTransferFrom { from: Address, to: Address, value: Amount },
    HavvenApprove { spender: Address, value: Amount },
    HavvenMint { to: Address, value: Amount },
    HavvenWithdrawFee { to: Address, value: Amount },
    HavvenDonateToFeePool { value: Amount },
    HavvenSetTransferFeeRate { rate: Amount },
    HavvenSetFeeAuthority { authority: Address },
    WithdrawFeeEntitlement,
    RecomputeLastAverageBalance { account: Address },
    CheckFeePeriodRollover,
    SetTargetFeePeriodDuration { duration: u64 },

    // Nomin
    NominTransfer { to: Address, value: Amount },
    NominTransferFrom { from: Address, to: Address, value: Amount },
    NominApprove { spender: Address, value: Amount },
    NominDonateToFeePool { value: Amount },
    NominWithdrawFee { to: Address, value: Amount },
    NominSetTransferFeeRate { rate: Amount },
    NominSetFeeAuthority { authority: Address },
    Issue { quantity: Amount, collateral: Amount },
    Burn { quantity: Amount },
    Buy { quantity: Amount, payment: Amount },
    Sell { quantity: Amount },
    DepositCollateral { amount: Amount },
    UpdatePrice { price: Amount, sent_time: u64 },
    ForceLiquidation,
    TerminateLiquidation,
    ExtendLiquidationPeriod { extension: u64 },
    SelfDestruct,
    ConfiscateBalance { target: Address },
    UnfreezeAccount { account: Address },
    SetOracle { oracle: Address },
    SetCourt { court: Address },
    SetBeneficiary { beneficiary: Address },
    SetPoolFeeRate { rate: Amount },
    SetStalePeriod { period: u64 },

    // Court
    BeginMotion { target: Address },
    VoteFor { motion_id: MotionId },
    VoteAgainst { motion_id: MotionId },
    CancelVote { motion_id: MotionId },
    ApproveMotion { motion_id: MotionId },
    VetoMotion { motion_id: MotionId },
    CloseMotion { motion_id: MotionId },
    SetVotingPeriod { period: u64 },
    SetConfirmationPeriod { period: u64 },
    SetRequiredParticipation { fraction: Amount },
    SetRequiredMajority { fraction: Amount },
    SetMinStandingBalance { balance: Amount },
    SetThresholdBoundary { boundary: ThresholdBoundary },

    // Ownership
    NominateOwner { contract: ContractKind, nominee: Address },
    AcceptOwnership { contract: ContractKind },

    // Token ledgers, written directly by their associated contract
    SetAssociatedContract { token: TokenKind, contract: Address },
    SetBalance { token: TokenKind, account: Address, value: Amount },
    SetAllowance { token: TokenKind, owner: Address, spender: Address, value: Amount },
    SetTotalSupply { token: TokenKind, value: Amount },

    // Native asset
    NativeTransfer { to: Address, amount: Amount },
}

impl Call {
    /// Whether the call may run against a self-destructed nomin contract
    fn touches_nomin(&self) -> bool {
        !matches!(
            self,
            Call::HavvenTransfer { .. }
                | Call::HavvenTransferFrom { .. }
                | Call::HavvenApprove { .. }
                | Call::HavvenMint { .. }
                | Call::HavvenWithdrawFee { .. }
                | Call::HavvenDonateToFeePool { .. }
                | Call::HavvenSetTransferFeeRate { .. }
                | Call::HavvenSetFeeAuthority { .. }
                | Call::RecomputeLastAverageBalance { .. }
                | Call::CheckFeePeriodRollover
                | Call::SetTargetFeePeriodDuration { .. }
                | Call::NativeTransfer { .. }
        )
    }
}

/// A call made by `sender` at `timestamp`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Address,
    pub timestamp: u64,
    pub call: Call,
}

impl Transaction {
    pub fn new(sender: Address, timestamp: u64, call: Call) -> Self {
        Self { sender, timestamp, call }
    }
}

/// Value returned by a call, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutput {
    None,
    Amount(Amount),
    Motion(MotionId),
    Rolled(bool),
}

/// Outcome of a committed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Index of this transaction among all committed ones
    pub sequence: u64,
    pub timestamp: u64,
    pub output: CallOutput,
    pub events: Vec<EventRecord>,
}

/// Everything the engine commits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineState {
    pub havven: Havven,
    pub nomin: Nomin,
    pub court: Court,
    pub native: NativeLedger,
    /// Timestamp of the last committed transaction
    pub last_timestamp: u64,
    pub next_event_sequence: u64,
    pub transaction_count: u64,
}

impl EngineState {
    /// Both token ledgers balance against their supplies
    pub fn is_conserved(&self) -> bool {
        self.havven.token().is_conserved(0) && self.nomin.is_conserved()
    }

    fn token(&self, kind: TokenKind) -> &FeeToken {
        match kind {
            TokenKind::Havven => self.havven.token(),
            TokenKind::Nomin => self.nomin.token(),
        }
    }

    fn ledger_mut(&mut self, kind: TokenKind) -> &mut TokenState {
        match kind {
            TokenKind::Havven => self.havven.token_mut().state_mut(),
            TokenKind::Nomin => self.nomin.token_mut().state_mut(),
        }
    }

    fn owned_mut(&mut self, contract: ContractKind) -> &mut Owned {
        match contract {
            ContractKind::Havven => self.havven.token_mut().owned_mut(),
            ContractKind::HavvenState => self.havven.token_mut().state_mut().owned_mut(),
            ContractKind::Nomin => self.nomin.token_mut().owned_mut(),
            ContractKind::NominState => self.nomin.token_mut().state_mut().owned_mut(),
            ContractKind::Court => self.court.owned_mut(),
        }
    }

    pub fn balance_of(&self, kind: TokenKind, account: &Address) -> Amount {
        self.token(kind).balance_of(account)
    }

    /// Run one call; on error the caller discards `self`
    fn apply(&mut self, tx: &Transaction, events: &mut Vec<Event>) -> Result<CallOutput> {
        let sender = tx.sender;
        let now = tx.timestamp;

        if self.nomin.is_destroyed() && tx.call.touches_nomin() {
            return Err(LedgerError::Destroyed);
        }
        let fees_collected = self.nomin.fee_pool();
        self.havven.check_fee_period_rollover(now, fees_collected, events);

        let output = match tx.call.clone() {
            Call::HavvenTransfer { to, value } => CallOutput::Amount(self.havven.transfer(sender, to, value, now, events)?),
            Call::HavvenTransferFrom { from, to, value } => {
                CallOutput::Amount(self.havven.transfer_from(sender, from, to, value, now, events)?)
            }
            Call::HavvenApprove { spender, value } => {
                self.havven.approve(sender, spender, value, events)?;
                CallOutput::None
            }
            Call::HavvenMint { to, value } => {
                self.havven.mint(sender, to, value, now, events)?;
                CallOutput::None
            }
            Call::HavvenWithdrawFee { to, value } => {
                self.havven.withdraw_fee(sender, to, value, now, events)?;
                CallOutput::None
            }
            Call::HavvenDonateToFeePool { value } => {
                self.havven.donate_to_fee_pool(sender, value, now, events)?;
                CallOutput::None
            }
            Call::HavvenSetTransferFeeRate { rate } => {
                self.havven.token_mut().set_transfer_fee_rate(sender, rate, events)?;
                CallOutput::None
            }
            Call::HavvenSetFeeAuthority { authority } => {
                self.havven.token_mut().set_fee_authority(sender, authority, events)?;
                CallOutput::None
            }
            Call::WithdrawFeeEntitlement => {
                CallOutput::Amount(self.havven.withdraw_fee_entitlement(sender, now, &mut self.nomin, events)?)
            }
            Call::RecomputeLastAverageBalance { account } => {
                CallOutput::Amount(self.havven.recompute_last_average_balance(account, now)?)
            }
            // Already performed above; reports whether this call was the one to roll
            Call::CheckFeePeriodRollover => CallOutput::Rolled(
                events.iter().any(|event| matches!(event, Event::FeePeriodRollover { .. })),
            ),
            Call::SetTargetFeePeriodDuration { duration } => {
                self.havven.set_target_fee_period_duration(sender, duration, events)?;
                CallOutput::None
            }

            Call::NominTransfer { to, value } => CallOutput::Amount(self.nomin.transfer(sender, to, value, events)?),
            Call::NominTransferFrom { from, to, value } => {
                CallOutput::Amount(self.nomin.transfer_from(sender, from, to, value, events)?)
            }
            Call::NominApprove { spender, value } => {
                self.nomin.approve(sender, spender, value, events)?;
                CallOutput::None
            }
            Call::NominDonateToFeePool { value } => {
                self.nomin.donate_to_fee_pool(sender, value, events)?;
                CallOutput::None
            }
            Call::NominWithdrawFee { to, value } => {
                self.nomin.withdraw_fee(sender, to, value, events)?;
                CallOutput::None
            }
            Call::NominSetTransferFeeRate { rate } => {
                self.nomin.set_transfer_fee_rate(sender, rate, events)?;
                CallOutput::None
            }
            Call::NominSetFeeAuthority { authority } => {
                self.nomin.set_fee_authority(sender, authority, events)?;
                CallOutput::None
            }
            Call::Issue { quantity, collateral } => {
                self.nomin.issue(sender, quantity, collateral, &mut self.native, now, events)?;
                CallOutput::None
            }
            Call::Burn { quantity } => {
                self.nomin.burn(sender, quantity, events)?;
                CallOutput::None
            }
            Call::Buy { quantity, payment } => {
                self.nomin.buy(sender, quantity, payment, &mut self.native, now, events)?;
                CallOutput::None
            }
            Call::Sell { quantity } => CallOutput::Amount(self.nomin.sell(sender, quantity, &mut self.native, events)?),
            Call::DepositCollateral { amount } => {
                self.nomin.deposit_collateral(sender, amount, &mut self.native, events)?;
                CallOutput::None
            }
            Call::UpdatePrice { price, sent_time } => {
                self.nomin.update_price(sender, price, sent_time, &self.native, now, events)?;
                CallOutput::None
            }
            Call::ForceLiquidation => {
                self.nomin.force_liquidation(sender, now, events)?;
                CallOutput::None
            }
            Call::TerminateLiquidation => {
                self.nomin.terminate_liquidation(sender, &self.native, now, events)?;
                CallOutput::None
            }
            Call::ExtendLiquidationPeriod { extension } => {
                self.nomin.extend_liquidation_period(sender, extension, events)?;
                CallOutput::None
            }
            Call::SelfDestruct => CallOutput::Amount(self.nomin.self_destruct(sender, &mut self.native, now, events)?),
            Call::ConfiscateBalance { target } => CallOutput::Amount(self.nomin.confiscate_balance(sender, target, events)?),
            Call::UnfreezeAccount { account } => {
                self.nomin.unfreeze_account(sender, account, events)?;
                CallOutput::None
            }
            Call::SetOracle { oracle } => {
                self.nomin.set_oracle(sender, oracle, events)?;
                CallOutput::None
            }
            Call::SetCourt { court } => {
                self.nomin.set_court(sender, court, events)?;
                CallOutput::None
            }
            Call::SetBeneficiary { beneficiary } => {
                self.nomin.set_beneficiary(sender, beneficiary, events)?;
                CallOutput::None
            }
            Call::SetPoolFeeRate { rate } => {
                self.nomin.set_pool_fee_rate(sender, rate, events)?;
                CallOutput::None
            }
            Call::SetStalePeriod { period } => {
                self.nomin.set_stale_period(sender, period, events)?;
                CallOutput::None
            }

            Call::BeginMotion { target } => {
                CallOutput::Motion(self.court.begin_motion(sender, target, &self.havven, &self.nomin, now, events)?)
            }
            Call::VoteFor { motion_id } => {
                CallOutput::Amount(self.court.vote_for(sender, motion_id, &mut self.havven, now, events)?)
            }
            Call::VoteAgainst { motion_id } => {
                CallOutput::Amount(self.court.vote_against(sender, motion_id, &mut self.havven, now, events)?)
            }
            Call::CancelVote { motion_id } => {
                self.court.cancel_vote(sender, motion_id, now, events)?;
                CallOutput::None
            }
            Call::ApproveMotion { motion_id } => {
                self.court
                    .approve_motion(sender, motion_id, &self.havven, &mut self.nomin, now, events)?;
                CallOutput::None
            }
            Call::VetoMotion { motion_id } => {
                self.court.veto_motion(sender, motion_id, now, events)?;
                CallOutput::None
            }
            Call::CloseMotion { motion_id } => {
                self.court.close_motion(motion_id, now, events)?;
                CallOutput::None
            }
            Call::SetVotingPeriod { period } => {
                self.court.set_voting_period(sender, period, &self.havven)?;
                CallOutput::None
            }
            Call::SetConfirmationPeriod { period } => {
                self.court.set_confirmation_period(sender, period)?;
                CallOutput::None
            }
            Call::SetRequiredParticipation { fraction } => {
                self.court.set_required_participation(sender, fraction)?;
                CallOutput::None
            }
            Call::SetRequiredMajority { fraction } => {
                self.court.set_required_majority(sender, fraction)?;
                CallOutput::None
            }
            Call::SetMinStandingBalance { balance } => {
                self.court.set_min_standing_balance(sender, balance)?;
                CallOutput::None
            }
            Call::SetThresholdBoundary { boundary } => {
                self.court.set_threshold_boundary(sender, boundary)?;
                CallOutput::None
            }

            Call::NominateOwner { contract, nominee } => {
                self.owned_mut(contract).nominate_owner(sender, nominee, events)?;
                CallOutput::None
            }
            Call::AcceptOwnership { contract } => {
                self.owned_mut(contract).accept_ownership(sender, events)?;
                CallOutput::None
            }

            Call::SetAssociatedContract { token, contract } => {
                let fee_token = match token {
                    TokenKind::Havven => self.havven.token_mut(),
                    TokenKind::Nomin => self.nomin.token_mut(),
                };
                fee_token.set_associated_contract(sender, contract, events)?;
                CallOutput::None
            }
            Call::SetBalance { token, account, value } => {
                self.ledger_mut(token).set_balance(sender, account, value)?;
                CallOutput::None
            }
            Call::SetAllowance { token, owner, spender, value } => {
                self.ledger_mut(token).set_allowance(sender, owner, spender, value)?;
                CallOutput::None
            }
            Call::SetTotalSupply { token, value } => {
                self.ledger_mut(token).set_total_supply(sender, value)?;
                CallOutput::None
            }

            Call::NativeTransfer { to, amount } => {
                self.native.transfer(sender, to, amount)?;
                CallOutput::None
            }
        };
        Ok(output)
    }
}

/// The live state plus the ordered log of every committed event
#[derive(Debug, Clone)]
pub struct Engine {
    state: EngineState,
    log: Vec<EventRecord>,
}

impl Engine {
    pub fn new(state: EngineState) -> Self {
        Self { state, log: Vec::new() }
    }

    /// Resume from persisted state and its event log
    pub fn restore(state: EngineState, log: Vec<EventRecord>) -> Self {
        Self { state, log }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn havven(&self) -> &Havven {
        &self.state.havven
    }

    pub fn nomin(&self) -> &Nomin {
        &self.state.nomin
    }

    pub fn court(&self) -> &Court {
        &self.state.court
    }

    pub fn native(&self) -> &NativeLedger {
        &self.state.native
    }

    pub fn last_timestamp(&self) -> u64 {
        self.state.last_timestamp
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.log
    }

    /// Up to `limit` events starting at sequence `from`
    pub fn events_since(&self, from: u64, limit: usize) -> &[EventRecord] {
        let start = self.log.partition_point(|record| record.sequence < from);
        let end = start.saturating_add(limit).min(self.log.len());
        &self.log[start..end]
    }

    /// Execute one transaction atomically
    pub fn execute(&mut self, tx: Transaction) -> Result<Receipt> {
        let staged = self.stage(tx)?;
        Ok(self.commit(staged))
    }

    /// Apply `tx` to a copy of the live state without committing it.
    ///
    /// Dropping the result discards the transaction.
    pub fn stage(&self, tx: Transaction) -> Result<StagedTransaction> {
        let last = self.state.last_timestamp;
        if tx.timestamp < last {
            return Err(LedgerError::ClockRegression {
                last,
                now: tx.timestamp,
            });
        }

        let mut next = self.state.clone();
        let mut events = Vec::new();
        let output = match next.apply(&tx, &mut events) {
            Ok(output) => output,
            Err(err) => {
                warn!(sender = %tx.sender, call = ?tx.call, error = %err, "transaction rolled back");
                return Err(err);
            }
        };

        let records: Vec<EventRecord> = events
            .into_iter()
            .enumerate()
            .map(|(i, event)| EventRecord {
                sequence: next.next_event_sequence + i as u64,
                timestamp: tx.timestamp,
                event,
            })
            .collect();
        next.next_event_sequence += records.len() as u64;
        next.last_timestamp = tx.timestamp;
        let sequence = next.transaction_count;
        next.transaction_count += 1;

        Ok(StagedTransaction {
            state: next,
            receipt: Receipt {
                sequence,
                timestamp: tx.timestamp,
                output,
                events: records,
            },
        })
    }

    /// Make a staged transaction live. It must have been staged from the current state.
    pub fn commit(&mut self, staged: StagedTransaction) -> Receipt {
        let StagedTransaction { state, receipt } = staged;
        self.state = state;
        self.log.extend(receipt.events.iter().cloned());
        debug!(sequence = receipt.sequence, events = receipt.events.len(), "transaction committed");
        receipt
    }
}

/// A successful transaction that has not replaced the live state yet
#[derive(Debug, Clone)]
pub struct StagedTransaction {
    state: EngineState,
    receipt: Receipt,
}

impl StagedTransaction {
    /// The state as it will be once committed
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn receipt(&self) -> &Receipt {
        &self.receipt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DAY, UNIT};
    use crate::node::GenesisConfig;

    fn engine() -> (Engine, GenesisConfig) {
        let config = GenesisConfig::default();
        (config.build().unwrap(), config)
    }

    #[test]
    fn test_failed_call_leaves_no_trace() {
        let (mut engine, config) = engine();
        let owner = config.owner;
        let before = engine.events().len();
        let at = engine.last_timestamp() + 10;

        let result = engine.execute(Transaction::new(
            owner,
            at,
            Call::Issue {
                quantity: 1_000_000 * UNIT,
                collateral: 0,
            },
        ));
        assert_eq!(result, Err(LedgerError::InsufficientCollateral));
        assert_eq!(engine.events().len(), before);
        assert_eq!(engine.nomin().total_supply(), 0);
        assert_eq!(engine.last_timestamp(), config.genesis_time);
    }

    #[test]
    fn test_staged_transaction_is_invisible_until_committed() {
        let (mut engine, config) = engine();
        let alice = Address::from_label("alice");
        let tx = Transaction::new(config.owner, config.genesis_time + 1, Call::HavvenTransfer { to: alice, value: UNIT });

        let staged = engine.stage(tx.clone()).unwrap();
        assert_eq!(staged.state().balance_of(TokenKind::Havven, &alice), UNIT);
        assert_eq!(engine.havven().balance_of(&alice), 0);
        drop(staged);
        assert_eq!(engine.state().transaction_count, 0);

        let staged = engine.stage(tx).unwrap();
        let expected = staged.receipt().clone();
        assert_eq!(engine.commit(staged), expected);
        assert_eq!(engine.havven().balance_of(&alice), UNIT);
        assert_eq!(engine.events().last(), expected.events.last());
    }

    #[test]
    fn test_clock_regression() {
        let (mut engine, config) = engine();
        let owner = config.owner;
        let later = config.genesis_time + DAY;
        engine
            .execute(Transaction::new(owner, later, Call::CheckFeePeriodRollover))
            .unwrap();
        assert_eq!(
            engine.execute(Transaction::new(owner, later - 1, Call::CheckFeePeriodRollover)),
            Err(LedgerError::ClockRegression {
                last: later,
                now: later - 1
            })
        );
        // Same timestamp is fine
        engine
            .execute(Transaction::new(owner, later, Call::CheckFeePeriodRollover))
            .unwrap();
    }

    #[test]
    fn test_receipts_number_events() {
        let (mut engine, config) = engine();
        let owner = config.owner;
        let alice = Address::from_label("alice");
        let start = engine.events().len() as u64;

        let receipt = engine
            .execute(Transaction::new(
                owner,
                config.genesis_time + 1,
                Call::HavvenTransfer {
                    to: alice,
                    value: 10 * UNIT,
                },
            ))
            .unwrap();
        assert_eq!(receipt.events.len(), 1);
        assert_eq!(receipt.events[0].sequence, start);
        assert_eq!(engine.events_since(start, 10), &receipt.events[..]);
        assert_eq!(engine.state().balance_of(TokenKind::Havven, &alice), 10 * UNIT);
        assert!(engine.state().is_conserved());
    }

    #[test]
    fn test_destroyed_nomin_rejects_calls() {
        let (mut engine, config) = engine();
        let owner = config.owner;
        let t = config.genesis_time + 1;
        engine.execute(Transaction::new(owner, t, Call::ForceLiquidation)).unwrap();
        engine.execute(Transaction::new(owner, t + 1, Call::SelfDestruct)).unwrap();

        assert_eq!(
            engine.execute(Transaction::new(owner, t + 2, Call::NominTransfer { to: owner, value: 0 })),
            Err(LedgerError::Destroyed)
        );
        assert_eq!(
            engine.execute(Transaction::new(owner, t + 2, Call::BeginMotion { target: owner })),
            Err(LedgerError::Destroyed)
        );
        // Havven keeps working
        engine
            .execute(Transaction::new(
                owner,
                t + 2,
                Call::HavvenTransfer {
                    to: Address::from_label("alice"),
                    value: UNIT,
                },
            ))
            .unwrap();
    }

    #[test]
    fn test_associated_contract_swap() {
        let (mut engine, config) = engine();
        let owner = config.owner;
        let logic = Address::from_label("new-logic");
        let t = config.genesis_time + 1;

        engine
            .execute(Transaction::new(
                owner,
                t,
                Call::SetAssociatedContract {
                    token: TokenKind::Nomin,
                    contract: logic,
                },
            ))
            .unwrap();
        engine
            .execute(Transaction::new(
                logic,
                t,
                Call::SetBalance {
                    token: TokenKind::Nomin,
                    account: owner,
                    value: 5,
                },
            ))
            .unwrap();
        assert_eq!(engine.nomin().balance_of(&owner), 5);

        // The nomin contract itself has lost write access
        assert_eq!(
            engine.execute(Transaction::new(owner, t, Call::NominTransfer { to: logic, value: 1 })),
            Err(LedgerError::Unauthorized(crate::error::Role::AssociatedContract))
        );
    }
}
