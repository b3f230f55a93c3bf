//! End-to-end scenarios driven through the transaction engine

use nomin_core::constants::{DAY, DEFAULT_LIQUIDATION_PERIOD, HOUR, INITIAL_HAVVEN_SUPPLY, UNIT, WEEK};
use nomin_core::court::ThresholdBoundary;
use nomin_core::crypto::Address;
use nomin_core::error::LedgerError;
use nomin_core::node::{Allocation, Call, CallOutput, Engine, GenesisConfig, Receipt, Transaction};
use nomin_core::storage::LedgerDb;

struct Scenario {
    engine: Engine,
    config: GenesisConfig,
    alice: Address,
    bob: Address,
}

impl Scenario {
    fn new() -> Self {
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut config = GenesisConfig {
            beneficiary: Address::from_label("beneficiary"),
            ..GenesisConfig::default()
        };
        for account in [alice, bob] {
            config.allocations.push(Allocation {
                account,
                amount: 1_000 * UNIT,
            });
        }
        let engine = config.build().unwrap();
        Self { engine, config, alice, bob }
    }

    fn owner(&self) -> Address {
        self.config.owner
    }

    fn at(&self, offset: u64) -> u64 {
        self.config.genesis_time + offset
    }

    fn send(&mut self, sender: Address, offset: u64, call: Call) -> Result<Receipt, LedgerError> {
        let timestamp = self.at(offset);
        self.engine.execute(Transaction::new(sender, timestamp, call))
    }

    /// Issue `quantity` nomins into the pool, backed with ample collateral
    fn issue(&mut self, offset: u64, quantity: u128) {
        let owner = self.owner();
        self.send(owner, offset, Call::Issue { quantity, collateral: 10 * UNIT }).unwrap();
    }

    fn buy(&mut self, buyer: Address, offset: u64, quantity: u128) {
        let payment = self.engine.nomin().purchase_cost_ether(quantity, self.at(offset)).unwrap();
        self.send(buyer, offset, Call::Buy { quantity, payment }).unwrap();
    }
}

#[test]
fn test_issue_buy_sell() {
    let mut s = Scenario::new();
    let alice = s.alice;
    let nomin_address = s.config.addresses().nomin;

    s.issue(0, 100 * UNIT);
    assert_eq!(s.engine.nomin().nomin_pool(), 100 * UNIT);
    assert_eq!(s.engine.native().balance_of(&nomin_address), 10 * UNIT);

    // 10 nomins at 1000 fiat per ether, plus the 0.5% pool fee
    let cost = s.engine.nomin().purchase_cost_ether(10 * UNIT, s.at(10)).unwrap();
    assert_eq!(cost, 10_050_000_000_000_000);
    s.buy(alice, 10, 10 * UNIT);
    assert_eq!(s.engine.nomin().balance_of(&alice), 10 * UNIT);
    assert_eq!(s.engine.nomin().nomin_pool(), 90 * UNIT);
    assert_eq!(s.engine.native().balance_of(&alice), 1_000 * UNIT - cost);

    let receipt = s.send(alice, 20, Call::Sell { quantity: 10 * UNIT }).unwrap();
    assert_eq!(receipt.output, CallOutput::Amount(9_950_000_000_000_000));
    assert_eq!(s.engine.nomin().balance_of(&alice), 0);
    assert_eq!(s.engine.nomin().nomin_pool(), 100 * UNIT);
    assert_eq!(
        s.engine.native().balance_of(&alice),
        1_000 * UNIT - cost + 9_950_000_000_000_000
    );
    assert!(s.engine.state().is_conserved());
}

#[test]
fn test_buy_out_the_pool_at_parity() {
    let mut s = Scenario::new();
    let (owner, alice, oracle) = (s.owner(), s.alice, s.config.oracle);

    let t = s.at(1);
    s.send(oracle, 1, Call::UpdatePrice { price: UNIT, sent_time: t }).unwrap();
    s.send(owner, 1, Call::Issue { quantity: 10 * UNIT, collateral: 20 * UNIT }).unwrap();

    let payment = 10 * UNIT + 10 * UNIT / 200;
    assert_eq!(s.engine.nomin().purchase_cost_ether(10 * UNIT, t).unwrap(), payment);
    s.send(alice, 2, Call::Buy { quantity: 10 * UNIT, payment }).unwrap();
    assert_eq!(s.engine.nomin().nomin_pool(), 0);
    assert_eq!(s.engine.nomin().balance_of(&alice), 10 * UNIT);

    assert!(matches!(
        s.send(alice, 3, Call::Buy { quantity: UNIT, payment: UNIT + UNIT / 200 }),
        Err(LedgerError::InsufficientPool { .. })
    ));
}

#[test]
fn test_issue_requires_double_collateral() {
    let mut s = Scenario::new();
    let owner = s.owner();

    // 10 ether at 1000 fiat backs at most 5000 nomins
    s.issue(0, 4_000 * UNIT);
    assert_eq!(
        s.send(owner, 1, Call::Issue { quantity: 1_001 * UNIT, collateral: 0 }).unwrap_err(),
        LedgerError::InsufficientCollateral
    );
    s.send(owner, 1, Call::Issue { quantity: 1_000 * UNIT, collateral: 0 }).unwrap();
    assert_eq!(s.engine.nomin().total_supply(), 5_000 * UNIT);
}

#[test]
fn test_buy_requires_exact_payment() {
    let mut s = Scenario::new();
    let alice = s.alice;
    s.issue(0, 100 * UNIT);

    let cost = s.engine.nomin().purchase_cost_ether(UNIT, s.at(1)).unwrap();
    let err = s.send(alice, 1, Call::Buy { quantity: UNIT, payment: cost + 1 }).unwrap_err();
    assert_eq!(err, LedgerError::WrongPayment { expected: cost, received: cost + 1 });
    assert!(matches!(
        s.send(alice, 1, Call::Buy { quantity: UNIT / 1_000, payment: 0 }),
        Err(LedgerError::PurchaseTooSmall { .. })
    ));
    assert!(matches!(
        s.send(alice, 1, Call::Buy { quantity: 101 * UNIT, payment: 0 }),
        Err(LedgerError::InsufficientPool { .. })
    ));
}

#[test]
fn test_fee_withdrawal_across_periods() {
    let mut s = Scenario::new();
    let (owner, alice, bob) = (s.owner(), s.alice, s.bob);

    // Alice holds a quarter of all havvens for the whole first period
    s.send(owner, 0, Call::HavvenTransfer { to: alice, value: INITIAL_HAVVEN_SUPPLY / 4 }).unwrap();

    s.issue(0, 1_000 * UNIT);
    s.buy(owner, 0, 1_000 * UNIT);
    s.send(owner, HOUR, Call::NominTransfer { to: bob, value: 500 * UNIT }).unwrap();
    assert_eq!(s.engine.nomin().balance_of(&bob), 500 * UNIT);
    assert_eq!(s.engine.nomin().fee_pool(), 750_000_000_000_000_000);

    // Nothing to collect yet for the running period
    s.send(alice, DAY, Call::WithdrawFeeEntitlement).unwrap();
    assert_eq!(s.engine.nomin().balance_of(&alice), 0);

    let rolled = s.send(owner, 4 * WEEK, Call::CheckFeePeriodRollover).unwrap();
    assert_eq!(rolled.output, CallOutput::Rolled(true));
    let again = s.send(owner, 4 * WEEK, Call::CheckFeePeriodRollover).unwrap();
    assert_eq!(again.output, CallOutput::Rolled(false));
    assert_eq!(s.engine.havven().fee_period().last_fees_collected, 750_000_000_000_000_000);

    let receipt = s.send(alice, 4 * WEEK, Call::WithdrawFeeEntitlement).unwrap();
    assert_eq!(receipt.output, CallOutput::Amount(187_500_000_000_000_000));
    assert_eq!(s.engine.nomin().balance_of(&alice), 187_500_000_000_000_000);
    assert_eq!(
        s.send(alice, 4 * WEEK + 1, Call::WithdrawFeeEntitlement).unwrap_err(),
        LedgerError::AlreadyWithdrawn
    );

    s.send(owner, 4 * WEEK + 1, Call::WithdrawFeeEntitlement).unwrap();
    assert_eq!(s.engine.nomin().balance_of(&owner), 500 * UNIT - 750_000_000_000_000_000 + 562_500_000_000_000_000);
    assert_eq!(s.engine.nomin().fee_pool(), 0);
    assert!(s.engine.state().is_conserved());
}

#[test]
fn test_sole_staker_collects_all_fees() {
    let mut s = Scenario::new();
    let (owner, bob) = (s.owner(), s.bob);

    s.issue(0, 1_000 * UNIT);
    s.buy(owner, 0, 1_000 * UNIT);
    s.send(owner, HOUR, Call::NominTransfer { to: bob, value: 200 * UNIT }).unwrap();
    let fees = s.engine.nomin().fee_pool();
    assert_eq!(fees, 300_000_000_000_000_000);

    let receipt = s.send(owner, 4 * WEEK, Call::WithdrawFeeEntitlement).unwrap();
    assert_eq!(receipt.output, CallOutput::Amount(fees));
    assert_eq!(
        s.send(owner, 4 * WEEK, Call::WithdrawFeeEntitlement).unwrap_err(),
        LedgerError::AlreadyWithdrawn
    );
}

#[test]
fn test_confiscation_by_court_motion() {
    let mut s = Scenario::new();
    let (owner, alice) = (s.owner(), s.alice);
    let mallory = Address::from_label("mallory");

    s.send(owner, 0, Call::HavvenTransfer { to: alice, value: INITIAL_HAVVEN_SUPPLY / 4 }).unwrap();
    s.issue(0, 1_000 * UNIT);
    s.buy(owner, 0, 100 * UNIT);
    s.send(owner, 0, Call::NominTransfer { to: mallory, value: 50 * UNIT }).unwrap();
    let pool_before = s.engine.nomin().fee_pool();

    let start = 4 * WEEK;
    let receipt = s.send(alice, start, Call::BeginMotion { target: mallory }).unwrap();
    assert_eq!(receipt.output, CallOutput::Motion(1));
    assert_eq!(
        s.send(owner, start, Call::BeginMotion { target: mallory }).unwrap_err(),
        LedgerError::AlreadyUnderMotion(mallory)
    );

    s.send(owner, start + 1, Call::VoteFor { motion_id: 1 }).unwrap();
    s.send(alice, start + 2, Call::VoteAgainst { motion_id: 1 }).unwrap();
    assert_eq!(
        s.send(mallory, start + 3, Call::VoteAgainst { motion_id: 1 }).unwrap_err(),
        LedgerError::TargetCannotVote
    );

    // Still voting: too early to approve
    assert_eq!(
        s.send(owner, start + DAY, Call::ApproveMotion { motion_id: 1 }).unwrap_err(),
        LedgerError::NotConfirming(1)
    );

    s.send(owner, start + WEEK, Call::ApproveMotion { motion_id: 1 }).unwrap();
    assert!(s.engine.nomin().is_frozen(&mallory));
    assert_eq!(s.engine.nomin().balance_of(&mallory), 0);
    assert_eq!(s.engine.nomin().fee_pool(), pool_before + 50 * UNIT);
    assert!(s.engine.court().motion(1).is_none());
    assert_eq!(
        s.send(alice, start + WEEK, Call::BeginMotion { target: mallory }).unwrap_err(),
        LedgerError::AlreadyFrozen(mallory)
    );

    // Frozen accounts may receive but not send
    s.send(owner, start + WEEK, Call::NominTransfer { to: mallory, value: UNIT }).unwrap();
    assert_eq!(
        s.send(mallory, start + WEEK, Call::NominTransfer { to: owner, value: UNIT / 2 }).unwrap_err(),
        LedgerError::AccountFrozen(mallory)
    );
    assert_eq!(
        s.send(mallory, start + WEEK, Call::Sell { quantity: UNIT / 2 }).unwrap_err(),
        LedgerError::AccountFrozen(mallory)
    );

    s.send(owner, start + WEEK + 1, Call::UnfreezeAccount { account: mallory }).unwrap();
    s.send(mallory, start + WEEK + 2, Call::NominTransfer { to: owner, value: UNIT / 2 }).unwrap();
    assert!(s.engine.state().is_conserved());
}

#[test]
fn test_confiscation_while_price_is_stale() {
    let mut s = Scenario::new();
    let (owner, alice) = (s.owner(), s.alice);
    let mallory = Address::from_label("mallory");

    s.issue(0, 1_000 * UNIT);
    s.send(owner, 0, Call::NativeTransfer { to: mallory, amount: UNIT }).unwrap();
    s.buy(mallory, 0, 20 * UNIT);
    s.send(owner, 0, Call::HavvenTransfer { to: alice, value: INITIAL_HAVVEN_SUPPLY / 2 }).unwrap();

    let start = 4 * WEEK;
    s.send(alice, start, Call::BeginMotion { target: mallory }).unwrap();
    s.send(alice, start, Call::VoteFor { motion_id: 1 }).unwrap();

    // No oracle update since genesis
    assert!(s.engine.nomin().price_is_stale(s.at(start + WEEK)));
    assert_eq!(
        s.send(owner, start + WEEK, Call::Issue { quantity: UNIT, collateral: 0 }).unwrap_err(),
        LedgerError::StalePrice
    );
    let pool_before = s.engine.nomin().fee_pool();
    s.send(owner, start + WEEK, Call::ApproveMotion { motion_id: 1 }).unwrap();
    assert!(s.engine.nomin().is_frozen(&mallory));
    assert_eq!(s.engine.nomin().fee_pool(), pool_before + 20 * UNIT);
}

/// Run a motion with the given vote weights and try to approve it after voting closes
fn decide_motion(
    votes_for: u128,
    votes_against: u128,
    majority: Option<u128>,
    boundary: ThresholdBoundary,
) -> Result<Receipt, LedgerError> {
    let mut s = Scenario::new();
    let (owner, alice, bob) = (s.owner(), s.alice, s.bob);
    let target = Address::from_label("target");

    s.send(owner, 0, Call::HavvenTransfer { to: alice, value: votes_for }).unwrap();
    s.send(owner, 0, Call::HavvenTransfer { to: bob, value: votes_against }).unwrap();
    if let Some(fraction) = majority {
        s.send(owner, 0, Call::SetRequiredMajority { fraction }).unwrap();
    }
    s.send(owner, 0, Call::SetThresholdBoundary { boundary }).unwrap();

    let start = 4 * WEEK;
    s.send(alice, start, Call::BeginMotion { target }).unwrap();
    s.send(alice, start, Call::VoteFor { motion_id: 1 }).unwrap();
    s.send(bob, start, Call::VoteAgainst { motion_id: 1 }).unwrap();
    s.send(owner, start + WEEK, Call::ApproveMotion { motion_id: 1 })
}

#[test]
fn test_participation_exactly_at_threshold() {
    // 30M of 100M havvens vote: exactly the 30% required, with a 2/3 majority
    let (yes, no) = (20_000_000 * UNIT, 10_000_000 * UNIT);
    assert!(decide_motion(yes, no, None, ThresholdBoundary::Inclusive).is_ok());
    assert_eq!(
        decide_motion(yes, no, None, ThresholdBoundary::Strict).unwrap_err(),
        LedgerError::MotionFailed(1)
    );
    assert_eq!(
        decide_motion(yes, no - 1, None, ThresholdBoundary::Inclusive).unwrap_err(),
        LedgerError::MotionFailed(1)
    );
}

#[test]
fn test_majority_exactly_at_threshold() {
    // 40% participation, votes split evenly against a one-half majority
    let half = 20_000_000 * UNIT;
    assert!(decide_motion(half, half, Some(UNIT / 2), ThresholdBoundary::Inclusive).is_ok());
    assert_eq!(
        decide_motion(half, half, Some(UNIT / 2), ThresholdBoundary::Strict).unwrap_err(),
        LedgerError::MotionFailed(1)
    );
    assert_eq!(
        decide_motion(half - 1, half, Some(UNIT / 2), ThresholdBoundary::Inclusive).unwrap_err(),
        LedgerError::MotionFailed(1)
    );
}

#[test]
fn test_failed_motion_cannot_be_approved() {
    let mut s = Scenario::new();
    let (owner, alice) = (s.owner(), s.alice);
    let target = Address::from_label("target");

    s.send(owner, 0, Call::HavvenTransfer { to: alice, value: INITIAL_HAVVEN_SUPPLY / 4 }).unwrap();

    let start = 4 * WEEK;
    s.send(alice, start, Call::BeginMotion { target }).unwrap();
    // A quarter of the stake is below the 30% participation threshold
    s.send(alice, start, Call::VoteFor { motion_id: 1 }).unwrap();
    assert_eq!(
        s.send(owner, start + WEEK, Call::ApproveMotion { motion_id: 1 }).unwrap_err(),
        LedgerError::MotionFailed(1)
    );
    assert_eq!(
        s.send(owner, start + WEEK, Call::CloseMotion { motion_id: 1 }).unwrap_err(),
        LedgerError::StillConfirming(1)
    );
    s.send(alice, start + 2 * WEEK, Call::CloseMotion { motion_id: 1 }).unwrap();
    assert!(s.engine.court().motion(1).is_none());
    assert!(!s.engine.nomin().is_frozen(&target));
}

#[test]
fn test_stale_price_gates_purchases_only() {
    let mut s = Scenario::new();
    let (alice, oracle) = (s.alice, s.config.oracle);

    s.issue(0, 100 * UNIT);
    s.buy(alice, 0, 10 * UNIT);

    let stale = 2 * DAY + 1;
    assert!(s.engine.nomin().price_is_stale(s.at(stale)));
    assert_eq!(
        s.send(alice, stale, Call::Buy { quantity: UNIT, payment: UNIT }).unwrap_err(),
        LedgerError::StalePrice
    );
    assert_eq!(
        s.send(s.owner(), stale, Call::Issue { quantity: UNIT, collateral: 0 }).unwrap_err(),
        LedgerError::StalePrice
    );
    assert_eq!(
        s.engine.nomin().collateralisation_ratio(s.engine.native(), s.at(stale)).unwrap_err(),
        LedgerError::StalePrice
    );
    // Selling and burning stay open on a stale price
    s.send(alice, stale, Call::Sell { quantity: UNIT }).unwrap();
    s.send(s.owner(), stale, Call::Burn { quantity: UNIT }).unwrap();

    let fresh = s.at(stale + 1);
    s.send(oracle, stale + 1, Call::UpdatePrice { price: 800 * UNIT, sent_time: fresh }).unwrap();
    assert!(!s.engine.nomin().price_is_stale(fresh));
    s.buy(alice, stale + 1, UNIT);
    assert_eq!(s.engine.nomin().balance_of(&alice), 10 * UNIT);
}

#[test]
fn test_price_drop_triggers_liquidation() {
    let mut s = Scenario::new();
    let (owner, alice, oracle) = (s.owner(), s.alice, s.config.oracle);

    s.issue(0, 4_000 * UNIT);
    s.buy(alice, 0, 100 * UNIT);
    assert!(!s.engine.nomin().is_liquidating());

    // 10 ether at 300 fiat no longer covers 4000 nomins
    let t = s.at(60);
    s.send(oracle, 60, Call::UpdatePrice { price: 300 * UNIT, sent_time: t }).unwrap();
    assert!(s.engine.nomin().is_liquidating());
    assert_eq!(s.engine.nomin().liquidation_timestamp(), Some(t));

    assert_eq!(
        s.send(owner, 61, Call::Issue { quantity: UNIT, collateral: 0 }).unwrap_err(),
        LedgerError::Liquidating
    );
    assert_eq!(
        s.send(owner, 61, Call::TerminateLiquidation).unwrap_err(),
        LedgerError::Undercollateralized
    );

    // Selling back during liquidation is still possible
    s.send(alice, 62, Call::Sell { quantity: 100 * UNIT }).unwrap();
}

#[test]
fn test_liquidation_then_self_destruct() {
    let mut s = Scenario::new();
    let (owner, alice) = (s.owner(), s.alice);
    let beneficiary = s.config.beneficiary;
    let nomin_address = s.config.addresses().nomin;

    s.issue(0, 100 * UNIT);
    s.buy(alice, 0, 10 * UNIT);
    s.send(owner, 1, Call::ForceLiquidation).unwrap();
    assert_eq!(s.send(owner, 1, Call::ForceLiquidation).unwrap_err(), LedgerError::AlreadyLiquidating);

    // Nomins are still circulating and the period has not run out
    assert_eq!(s.send(owner, 2, Call::SelfDestruct).unwrap_err(), LedgerError::CannotSelfDestruct);
    assert_eq!(
        s.send(owner, 1 + DEFAULT_LIQUIDATION_PERIOD, Call::SelfDestruct).unwrap_err(),
        LedgerError::CannotSelfDestruct
    );

    let collateral = s.engine.native().balance_of(&nomin_address);
    let end = 2 + DEFAULT_LIQUIDATION_PERIOD;
    let receipt = s.send(owner, end, Call::SelfDestruct).unwrap();
    assert_eq!(receipt.output, CallOutput::Amount(collateral));
    assert!(s.engine.nomin().is_destroyed());
    assert_eq!(s.engine.native().balance_of(&nomin_address), 0);
    assert_eq!(s.engine.native().balance_of(&beneficiary), collateral);

    assert_eq!(
        s.send(alice, end, Call::NominTransfer { to: owner, value: UNIT }).unwrap_err(),
        LedgerError::Destroyed
    );
    assert_eq!(s.send(alice, end, Call::Sell { quantity: UNIT }).unwrap_err(), LedgerError::Destroyed);
    // Havvens live on
    s.send(owner, end, Call::HavvenTransfer { to: alice, value: UNIT }).unwrap();
    assert_eq!(s.engine.havven().balance_of(&alice), UNIT);
}

#[test]
fn test_self_destruct_once_supply_is_burned() {
    let mut s = Scenario::new();
    let owner = s.owner();

    s.issue(0, 100 * UNIT);
    s.send(owner, 1, Call::ForceLiquidation).unwrap();
    // Unsold pool nomins still count as supply
    assert_eq!(s.send(owner, 2, Call::SelfDestruct).unwrap_err(), LedgerError::CannotSelfDestruct);
    assert!(!s.engine.nomin().is_destroyed());

    s.send(owner, 3, Call::Burn { quantity: 100 * UNIT }).unwrap();
    assert_eq!(s.engine.nomin().total_supply(), 0);
    s.send(owner, 4, Call::SelfDestruct).unwrap();
    assert!(s.engine.nomin().is_destroyed());
}

#[test]
fn test_failed_transaction_leaves_no_trace() {
    let mut s = Scenario::new();
    let alice = s.alice;
    s.issue(0, 100 * UNIT);

    let events_before = s.engine.events().len();
    let native_before = s.engine.native().balance_of(&alice);
    let pool_before = s.engine.nomin().nomin_pool();
    let committed_before = s.engine.state().transaction_count;

    assert!(s.send(alice, 5, Call::Buy { quantity: UNIT, payment: 0 }).is_err());
    assert_eq!(s.engine.events().len(), events_before);
    assert_eq!(s.engine.native().balance_of(&alice), native_before);
    assert_eq!(s.engine.nomin().nomin_pool(), pool_before);
    assert_eq!(s.engine.nomin().balance_of(&alice), 0);
    assert_eq!(s.engine.state().transaction_count, committed_before);
    // A failed call does not move the clock
    assert_eq!(s.engine.last_timestamp(), s.at(0));
}

#[test]
fn test_clock_regression_rejected() {
    let mut s = Scenario::new();
    let (owner, alice) = (s.owner(), s.alice);

    s.send(owner, 100, Call::HavvenTransfer { to: alice, value: UNIT }).unwrap();
    assert!(matches!(
        s.send(owner, 99, Call::HavvenTransfer { to: alice, value: UNIT }),
        Err(LedgerError::ClockRegression { .. })
    ));
    // Same-instant transactions are fine
    s.send(owner, 100, Call::HavvenTransfer { to: alice, value: UNIT }).unwrap();
    assert_eq!(s.engine.havven().balance_of(&alice), 2 * UNIT);
}

#[test]
fn test_restore_from_database() {
    let dir = tempfile::tempdir().unwrap();
    let mut s = Scenario::new();
    let (owner, alice) = (s.owner(), s.alice);

    let db = LedgerDb::open(dir.path()).unwrap();
    db.commit(s.engine.state(), s.engine.events()).unwrap();
    let receipt = s.send(owner, 10, Call::HavvenTransfer { to: alice, value: 5 * UNIT }).unwrap();
    db.commit(s.engine.state(), &receipt.events).unwrap();

    let state = db.load_state().unwrap().unwrap();
    let events = db.load_events().unwrap();
    let mut restored = Engine::restore(state, events);

    assert_eq!(restored.last_timestamp(), s.engine.last_timestamp());
    assert_eq!(restored.state().transaction_count, 1);
    assert_eq!(restored.havven().balance_of(&alice), 5 * UNIT);
    assert_eq!(restored.events(), s.engine.events());
    let next = restored
        .execute(Transaction::new(alice, s.at(11), Call::HavvenTransfer { to: owner, value: UNIT }))
        .unwrap();
    assert_eq!(next.sequence, 1);
    assert_eq!(next.events[0].sequence, s.engine.events().len() as u64);
}
