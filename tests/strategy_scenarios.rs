//! Strategy Scenarios - Compiler and Selector Behaviour
//!
//! Exercises `StrategyManager` and `RiskManager` against the shared
//! registry fixture: rating-based selection and its tie-break, override
//! and pause precedence, deposit caps, multi-step simulation, reverse
//! valuation, borrowing, staking, harvesting and rebalancing.

mod common;

use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use common::*;
use yield_allocator::adapters::registry::Registry;
use yield_allocator::domain::deposit_cap::DepositCapMode;
use yield_allocator::domain::error::{AllocationError, Capability};
use yield_allocator::domain::risk::SelectionSource;
use yield_allocator::domain::strategy::{Strategy, StrategyHash, StrategyStep, token_hash};
use yield_allocator::domain::types::{Action, GroupKind, Instruction, Operation};
use yield_allocator::ports::config_store::ConfigStore;
use yield_allocator::usecases::{RiskManager, StrategyManager};

sol! {
    interface IVault {
        function deposit(uint256 assets, address receiver) external returns (uint256 shares);
        function redeem(uint256 shares, address receiver, address owner) external returns (uint256 assets);
    }
}

fn deposited(instruction: &Instruction) -> U256 {
    IVault::depositCall::abi_decode(&instruction.calldata, true)
        .unwrap()
        .assets
}

fn redeemed(instruction: &Instruction) -> U256 {
    IVault::redeemCall::abi_decode(&instruction.calldata, true)
        .unwrap()
        .shares
}

fn single(pool: Address) -> Strategy {
    Strategy::single(USDC, pool, pool).unwrap()
}

fn add(r: &mut Registry, strategy: Strategy) -> StrategyHash {
    r.add_strategy(GOV, strategy).unwrap()
}

/// USDC → P1 shares → META shares.
fn nested() -> Strategy {
    Strategy::new(
        USDC,
        vec![
            StrategyStep::new(P1, P1, false),
            StrategyStep::new(META, META, false),
        ],
    )
    .unwrap()
}

/// USDC collateral at LEND, borrow DAI, park DAI in DAI_VAULT.
fn levered() -> Strategy {
    Strategy::new(
        USDC,
        vec![
            StrategyStep::new(LEND, DAI, true),
            StrategyStep::new(DAI_VAULT, DAI_VAULT, false),
        ],
    )
    .unwrap()
}

// ── Selection ───────────────────────────────────────────────

#[test]
fn test_default_selection_follows_rating_range() {
    let mut r = registry();

    let first = RiskManager::new(&mut r).best_strategy("RP1", USDC).unwrap();
    assert_eq!(first.source, SelectionSource::RatingBased);
    assert_eq!(first.hash, single(P1).hash());

    // P2 re-rated into range with a higher rating than P1
    r.set_pool_rating(GOV, P2, Some(8)).unwrap();
    let second = RiskManager::new(&mut r).best_strategy("RP1", USDC).unwrap();
    assert_eq!(second.hash, single(P2).hash());
    assert_eq!(
        r.default_strategy_state("RP1", &token_hash(&[USDC])).cached(),
        Some(second.hash)
    );
    assert!(r.strategy(&second.hash).is_some());
}

#[test]
fn test_equal_rating_goes_to_earliest_registration() {
    let mut r = registry();
    r.set_pool_rating(GOV, P2, Some(5)).unwrap();
    let selection = RiskManager::new(&mut r).best_strategy("RP1", USDC).unwrap();
    assert_eq!(selection.hash, single(P1).hash());
}

#[test]
fn test_unapproved_and_unrated_pools_are_skipped() {
    let mut r = registry();
    r.set_pool_rating(GOV, P2, Some(9)).unwrap();
    r.set_pool_approval(GOV, P2, false).unwrap();
    let selection = RiskManager::new(&mut r).best_strategy("RP1", USDC).unwrap();
    assert_eq!(selection.hash, single(P1).hash());

    r.set_pool_rating(GOV, P1, None).unwrap();
    assert!(matches!(
        RiskManager::new(&mut r).best_strategy("RP1", USDC),
        Err(AllocationError::NoEligibleStrategy { .. })
    ));
}

#[test]
fn test_rank_pools_orders_by_rating_within_range() {
    let mut r = registry();
    let ranked = {
        let profile = r.risk_profile("LEVERED").unwrap();
        RiskManager::new(&mut r).rank_pools(&profile, USDC)
    };
    let pools: Vec<Address> = ranked.iter().map(|c| c.record.pool).collect();
    // CURVE (30) before P2 (12) before P1 (5); unrated pools excluded
    assert_eq!(pools, vec![CURVE, P2, P1]);
    assert_eq!(ranked[0].receipt, CURVE_LP);
}

#[test]
fn test_override_takes_precedence() {
    let mut r = registry();
    let curve = add(&mut r, Strategy::single(USDC, CURVE, CURVE_LP).unwrap());
    r.set_best_strategy_override(GOV, "RP1", USDC, Some(curve))
        .unwrap();

    let selection = RiskManager::new(&mut r).best_strategy("RP1", USDC).unwrap();
    assert_eq!(selection.hash, curve);
    assert_eq!(selection.source, SelectionSource::Override);

    r.set_best_strategy_override(GOV, "RP1", USDC, None).unwrap();
    let selection = RiskManager::new(&mut r).best_strategy("RP1", USDC).unwrap();
    assert_eq!(selection.hash, single(P1).hash());
    assert_eq!(selection.source, SelectionSource::RatingBased);
}

#[test]
fn test_paused_default_returns_cached_strategy() {
    let mut r = registry();
    RiskManager::new(&mut r).best_strategy("RP1", USDC).unwrap();
    r.pause_default_strategy(GOV, "RP1", USDC).unwrap();
    r.set_pool_rating(GOV, P2, Some(8)).unwrap();

    let paused = RiskManager::new(&mut r).best_strategy("RP1", USDC).unwrap();
    assert_eq!(paused.hash, single(P1).hash());
    assert_eq!(paused.source, SelectionSource::CachedDefault);

    r.resume_default_strategy(GOV, "RP1", USDC).unwrap();
    let resumed = RiskManager::new(&mut r).best_strategy("RP1", USDC).unwrap();
    assert_eq!(resumed.hash, single(P2).hash());
}

#[test]
fn test_override_wins_over_paused_default() {
    let mut r = registry();
    RiskManager::new(&mut r).best_strategy("RP1", USDC).unwrap();
    r.pause_default_strategy(GOV, "RP1", USDC).unwrap();
    let p2 = add(&mut r, single(P2));
    r.set_best_strategy_override(GOV, "RP1", USDC, Some(p2)).unwrap();

    let selection = RiskManager::new(&mut r).best_strategy("RP1", USDC).unwrap();
    assert_eq!(selection.hash, p2);
    assert_eq!(selection.source, SelectionSource::Override);
}

#[test]
fn test_unknown_profile() {
    let mut r = registry();
    assert_eq!(
        RiskManager::new(&mut r).best_strategy("NOPE", USDC),
        Err(AllocationError::UnknownRiskProfile("NOPE".into()))
    );
}

// ── Deposit caps ────────────────────────────────────────────

#[test]
fn test_pool_percentage_cap_uses_current_pool_value() {
    let mut r = registry();
    r.set_deposit_cap_mode(GOV, "vaults", DepositCapMode::PoolPercentage)
        .unwrap();
    r.set_pool_deposit_percentage(GOV, "vaults", P1, 1_000)
        .unwrap();
    let hash = add(&mut r, single(P1));
    let manager = StrategyManager::new(&r);

    let before = chain()
        .with_balance(USDC, P1, u(1_000))
        .with_supply(P1, u(1_000));
    let plan = manager.deposit_some(OWNER, &hash, u(200), &before).unwrap();
    let ixs = &plan.groups[0].instructions;
    assert_eq!(ixs.len(), 2);
    assert_eq!(ixs[0].action, Action::Approve);
    assert_eq!(deposited(&ixs[1]), u(100));

    // first deposit landed: pool 1100, owner holds 100 shares worth 100
    let after = chain()
        .with_balance(USDC, P1, u(1_100))
        .with_supply(P1, u(1_100))
        .with_balance(P1, OWNER, u(100));
    let plan = manager.deposit_some(OWNER, &hash, u(200), &after).unwrap();
    assert_eq!(deposited(&plan.groups[0].instructions[1]), u(10));
}

#[test]
fn test_exhausted_cap_yields_empty_group() {
    let mut r = registry();
    r.set_deposit_cap_mode(GOV, "vaults", DepositCapMode::Amount)
        .unwrap();
    r.set_deposit_cap_amount(GOV, "vaults", P1, USDC, u(50))
        .unwrap();
    let hash = add(&mut r, single(P1));

    let full = chain()
        .with_balance(USDC, P1, u(50))
        .with_supply(P1, u(50))
        .with_balance(P1, OWNER, u(50));
    let plan = StrategyManager::new(&r)
        .deposit_all(OWNER, &hash, &full)
        .unwrap();
    assert_eq!(plan.step_count(), 1);
    assert!(plan.is_noop());
}

// ── Multi-step compilation and valuation ────────────────────

#[test]
fn test_deposit_feeds_each_step_the_previous_output() {
    let mut r = registry();
    let hash = add(&mut r, nested());
    let plan = StrategyManager::new(&r)
        .deposit_all(OWNER, &hash, &chain())
        .unwrap();

    assert_eq!(plan.operation, Operation::DepositAll);
    let order: Vec<(usize, Address)> = plan
        .groups
        .iter()
        .map(|g| (g.step_index, g.pool))
        .collect();
    assert_eq!(order, vec![(0, P1), (1, META)]);
    assert_eq!(deposited(&plan.groups[0].instructions[1]), u(1_000));
    // empty P1 mints 1:1, so META receives 1000 P1 shares
    assert_eq!(deposited(&plan.groups[1].instructions[1]), u(1_000));
    assert_eq!(plan.groups[1].instructions[0].target, P1);
}

fn nested_position() -> yield_allocator::adapters::chain::ChainSnapshot {
    chain()
        .with_balance(USDC, P1, u(2_000))
        .with_supply(P1, u(1_000))
        .with_balance(P1, META, u(500))
        .with_supply(META, u(250))
        .with_balance(META, OWNER, u(100))
}

#[test]
fn test_withdraw_unwinds_in_reverse_with_simulated_balances() {
    let mut r = registry();
    let hash = add(&mut r, nested());
    let plan = StrategyManager::new(&r)
        .withdraw_all(OWNER, &hash, &nested_position())
        .unwrap();

    let order: Vec<usize> = plan.groups.iter().map(|g| g.step_index).collect();
    assert_eq!(order, vec![1, 0]);
    assert!(plan.groups.iter().all(|g| g.kind == GroupKind::Withdraw));
    assert_eq!(redeemed(&plan.groups[0].instructions[0]), u(100));
    // 100 META shares redeem for 200 P1 shares
    assert_eq!(redeemed(&plan.groups[1].instructions[0]), u(200));
}

#[test]
fn test_reverse_valuation_mirrors_deposit_path() {
    let mut r = registry();
    let hash = add(&mut r, nested());
    let chain = nested_position();

    let binding_top = r.binding(META).unwrap();
    let binding_first = r.binding(P1).unwrap();
    let top = binding_top
        .adapter
        .base()
        .get_all_amount_in_token(OWNER, P1, META, &chain)
        .unwrap();
    let expected = binding_first
        .adapter
        .base()
        .get_some_amount_in_token(USDC, P1, top, &chain)
        .unwrap();

    let value = StrategyManager::new(&r)
        .balance_in_underlying(OWNER, &hash, &chain)
        .unwrap();
    assert_eq!(top, u(200));
    assert_eq!(value, expected);
    assert_eq!(value, u(400));
}

#[test]
fn test_valuation_reads_current_state() {
    let mut r = registry();
    let hash = add(&mut r, nested());
    let manager = StrategyManager::new(&r);

    let mut chain = nested_position();
    let before = manager.balance_in_underlying(OWNER, &hash, &chain).unwrap();
    chain.set_balance(USDC, P1, u(3_000));
    let after = manager.balance_in_underlying(OWNER, &hash, &chain).unwrap();
    assert_eq!(before, u(400));
    assert_eq!(after, u(600));
}

#[test]
fn test_step_counts_are_symmetric_without_staking() {
    let mut r = registry();
    let hash = add(&mut r, nested());
    let manager = StrategyManager::new(&r);

    let deposit = manager.deposit_all(OWNER, &hash, &chain()).unwrap();
    let withdraw = manager
        .withdraw_all(OWNER, &hash, &nested_position())
        .unwrap();
    assert_eq!(deposit.step_count(), withdraw.step_count());
    assert_eq!(manager.deposit_step_count(&hash).unwrap(), 2);
    assert_eq!(manager.withdraw_step_count(&hash).unwrap(), 2);
}

// ── All-or-nothing resolution ───────────────────────────────

#[test]
fn test_unresolved_later_step_fails_whole_plan() {
    let mut r = registry();
    let hash = add(
        &mut r,
        Strategy::new(
            USDC,
            vec![
                StrategyStep::new(P1, P1, false),
                StrategyStep::new(ORPHAN, ORPHAN, false),
            ],
        )
        .unwrap(),
    );
    let manager = StrategyManager::new(&r);
    assert_eq!(
        manager.deposit_all(OWNER, &hash, &chain()),
        Err(AllocationError::UnresolvedAdapter { pool: ORPHAN })
    );
    assert!(manager.withdraw_all(OWNER, &hash, &chain()).is_err());
    assert!(manager.balance_in_underlying(OWNER, &hash, &chain()).is_err());
}

#[test]
fn test_unapproved_pool_blocks_deposit_but_not_withdraw() {
    let mut r = registry();
    let hash = add(&mut r, nested());
    r.set_pool_approval(GOV, META, false).unwrap();
    let manager = StrategyManager::new(&r);

    assert_eq!(
        manager.deposit_all(OWNER, &hash, &chain()),
        Err(AllocationError::UnapprovedPool { pool: META })
    );
    assert!(manager.withdraw_all(OWNER, &hash, &nested_position()).is_ok());
    assert_eq!(
        manager.balance_in_underlying(OWNER, &hash, &nested_position()),
        Ok(u(400))
    );
    assert_eq!(manager.withdraw_step_count(&hash), Ok(2));
}

#[test]
fn test_step_output_must_match_receipt() {
    let mut r = registry();
    let hash = add(
        &mut r,
        Strategy::new(USDC, vec![StrategyStep::new(P1, P2, false)]).unwrap(),
    );
    assert_eq!(
        StrategyManager::new(&r).deposit_all(OWNER, &hash, &chain()),
        Err(AllocationError::StepOutputMismatch {
            index: 0,
            expected: P1,
            actual: P2,
        })
    );
}

#[test]
fn test_step_input_must_be_accepted() {
    let mut r = registry();
    let hash = add(
        &mut r,
        Strategy::new(USDC, vec![StrategyStep::new(DAI_VAULT, DAI_VAULT, false)]).unwrap(),
    );
    assert_eq!(
        StrategyManager::new(&r).deposit_all(OWNER, &hash, &chain()),
        Err(AllocationError::UnsupportedAsset {
            pool: DAI_VAULT,
            asset: USDC,
        })
    );
}

#[test]
fn test_unknown_strategy() {
    let r = registry();
    let hash = single(P1).hash();
    assert_eq!(
        StrategyManager::new(&r).deposit_all(OWNER, &hash, &chain()),
        Err(AllocationError::UnknownStrategy(hash))
    );
}

// ── Borrowing ───────────────────────────────────────────────

#[test]
fn test_borrow_step_deposits_then_borrows() {
    let mut r = registry();
    let hash = add(&mut r, levered());
    let manager = StrategyManager::new(&r);
    let plan = manager.deposit_all(OWNER, &hash, &chain()).unwrap();

    let kinds: Vec<(usize, GroupKind)> = plan.groups.iter().map(|g| (g.step_index, g.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            (0, GroupKind::Deposit),
            (0, GroupKind::Borrow),
            (1, GroupKind::Deposit),
        ]
    );
    assert_eq!(plan.groups[1].instructions[0].action, Action::Borrow);
    assert_eq!(plan.groups[1].instructions[0].target, LEND);
    // 80% of 1000 USDC collateral, DAI at par
    assert_eq!(deposited(&plan.groups[2].instructions[1]), u(800));
    assert_eq!(manager.deposit_step_count(&hash).unwrap(), 3);
}

fn levered_position() -> yield_allocator::adapters::chain::ChainSnapshot {
    chain()
        .with_balance(USDC, OWNER, U256::ZERO)
        .with_balance(A_USDC, OWNER, u(1_000))
        .with_debt(LEND, DAI, OWNER, u(800))
        .with_balance(DAI_VAULT, OWNER, u(800))
        .with_balance(DAI, DAI_VAULT, u(800))
        .with_supply(DAI_VAULT, u(800))
}

#[test]
fn test_step_counts_are_symmetric_with_borrowing() {
    let mut r = registry();
    let hash = add(&mut r, levered());
    let manager = StrategyManager::new(&r);

    let deposit = manager.deposit_all(OWNER, &hash, &chain()).unwrap();
    let withdraw = manager
        .withdraw_all(OWNER, &hash, &levered_position())
        .unwrap();
    assert_eq!(deposit.step_count(), 3);
    assert_eq!(deposit.step_count(), withdraw.step_count());
    assert_eq!(
        manager.deposit_step_count(&hash).unwrap(),
        manager.withdraw_step_count(&hash).unwrap()
    );
}

#[test]
fn test_borrow_step_repays_before_withdrawing() {
    let mut r = registry();
    let hash = add(&mut r, levered());
    let manager = StrategyManager::new(&r);
    let plan = manager
        .withdraw_all(OWNER, &hash, &levered_position())
        .unwrap();

    let kinds: Vec<(usize, GroupKind)> = plan.groups.iter().map(|g| (g.step_index, g.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            (1, GroupKind::Withdraw),
            (0, GroupKind::Repay),
            (0, GroupKind::Withdraw),
        ]
    );
    assert_eq!(plan.groups[1].instructions.last().unwrap().action, Action::Repay);
    assert_eq!(manager.withdraw_step_count(&hash).unwrap(), 3);
    assert_eq!(plan.step_count(), 3);
}

#[test]
fn test_borrow_position_valued_net_of_debt() {
    let mut r = registry();
    let hash = add(&mut r, levered());
    let value = StrategyManager::new(&r)
        .balance_in_underlying(OWNER, &hash, &levered_position())
        .unwrap();
    // 1000 collateral + 800 DAI held - 800 DAI owed
    assert_eq!(value, u(1_000));
}

#[test]
fn test_borrow_requires_capability_and_supported_asset() {
    let mut r = registry();
    let no_capability = add(
        &mut r,
        Strategy::new(USDC, vec![StrategyStep::new(P1, DAI, true)]).unwrap(),
    );
    let bad_asset = add(
        &mut r,
        Strategy::new(USDC, vec![StrategyStep::new(LEND, CRV, true)]).unwrap(),
    );
    let manager = StrategyManager::new(&r);

    assert!(matches!(
        manager.deposit_all(OWNER, &no_capability, &chain()),
        Err(AllocationError::CapabilityMissing {
            capability: Capability::Borrow,
            ..
        })
    ));
    assert_eq!(
        manager.deposit_all(OWNER, &bad_asset, &chain()),
        Err(AllocationError::UnsupportedBorrowAsset {
            pool: LEND,
            asset: CRV,
        })
    );
}

// ── Staking and rewards ─────────────────────────────────────

fn curve_strategy(r: &mut Registry) -> StrategyHash {
    add(r, Strategy::single(USDC, CURVE, CURVE_LP).unwrap())
}

#[test]
fn test_staked_pool_adds_stake_group() {
    let mut r = registry();
    let hash = curve_strategy(&mut r);
    let manager = StrategyManager::new(&r);
    let plan = manager.deposit_all(OWNER, &hash, &chain()).unwrap();

    let kinds: Vec<GroupKind> = plan.groups.iter().map(|g| g.kind).collect();
    assert_eq!(kinds, vec![GroupKind::Deposit, GroupKind::Stake]);
    let stake = &plan.groups[1].instructions;
    assert_eq!(stake[0].target, CURVE_LP);
    assert_eq!(stake[1].target, GAUGE);
    assert_eq!(stake[1].action, Action::Stake);

    assert_eq!(manager.deposit_step_count(&hash).unwrap(), 2);
    assert_eq!(manager.withdraw_step_count(&hash).unwrap(), 1);
}

#[test]
fn test_staked_pool_unstakes_and_withdraws_together() {
    let mut r = registry();
    let hash = curve_strategy(&mut r);
    let chain = chain()
        .with_balance(GAUGE, OWNER, u(500))
        .with_balance(USDC, CURVE, u(1_000))
        .with_balance(DAI, CURVE, u(1_000))
        .with_supply(CURVE_LP, u(2_000));
    let plan = StrategyManager::new(&r)
        .withdraw_all(OWNER, &hash, &chain)
        .unwrap();

    assert_eq!(plan.step_count(), 1);
    assert_eq!(plan.groups[0].kind, GroupKind::UnstakeAndWithdraw);
    let ixs = &plan.groups[0].instructions;
    assert_eq!(ixs[0].action, Action::Unstake);
    assert_eq!(ixs[1].action, Action::Withdraw);
    assert_eq!(ixs.last().unwrap().action, Action::Swap);
}

#[test]
fn test_harvest_claims_and_sells_rewards() {
    let mut r = registry();
    let hash = curve_strategy(&mut r);
    let chain = chain().with_rewards(GAUGE, OWNER, u(50));
    let manager = StrategyManager::new(&r);

    let plan = manager.harvest_all(OWNER, &hash, &chain).unwrap();
    assert_eq!(plan.operation, Operation::HarvestAll);
    assert_eq!(plan.step_count(), 1);
    let actions: Vec<Action> = plan.groups[0].instructions.iter().map(|i| i.action).collect();
    assert_eq!(actions, vec![Action::Claim, Action::Approve, Action::Swap]);
    assert_eq!(plan.groups[0].instructions[2].target, ROUTER);

    let claim = manager.claim_all(OWNER, &hash, &chain).unwrap();
    assert_eq!(claim.instruction_count(), 1);
    assert_eq!(claim.groups[0].kind, GroupKind::Claim);
    assert_eq!(manager.claim_step_count(&hash).unwrap(), 1);
}

#[test]
fn test_harvest_some_caps_the_swap() {
    let mut r = registry();
    let hash = curve_strategy(&mut r);
    let chain = chain().with_rewards(GAUGE, OWNER, u(50));
    let plan = StrategyManager::new(&r)
        .harvest_some(OWNER, &hash, u(20), &chain)
        .unwrap();
    assert_eq!(plan.operation, Operation::HarvestSome);
    let approve = &plan.groups[0].instructions[1];
    assert_eq!(approve.action, Action::Approve);
    assert_eq!(approve.target, CRV);
    assert_eq!(&approve.calldata[36..68], u(20).to_be_bytes::<32>().as_slice());
}

#[test]
fn test_rewards_without_pending_or_capability_are_noop() {
    let mut r = registry();
    let curve = curve_strategy(&mut r);
    let vault = add(&mut r, single(P1));
    let manager = StrategyManager::new(&r);

    assert!(manager.claim_all(OWNER, &curve, &chain()).unwrap().is_noop());
    let plan = manager.harvest_all(OWNER, &vault, &chain()).unwrap();
    assert_eq!(plan.step_count(), 0);
    assert_eq!(manager.claim_step_count(&vault).unwrap(), 0);
}

// ── Rebalance ───────────────────────────────────────────────

#[test]
fn test_rebalance_moves_position_in_one_plan() {
    let mut r = registry();
    let from = add(&mut r, single(P1));
    let to = add(&mut r, single(P2));
    let chain = chain()
        .with_balance(USDC, OWNER, U256::ZERO)
        .with_balance(USDC, P1, u(1_000))
        .with_supply(P1, u(1_000))
        .with_balance(P1, OWNER, u(100));

    let plan = StrategyManager::new(&r)
        .rebalance(OWNER, &from, &to, &chain)
        .unwrap();
    assert_eq!(plan.operation, Operation::Rebalance);
    assert_eq!(plan.strategy, to);
    let groups: Vec<(Address, GroupKind)> = plan.groups.iter().map(|g| (g.pool, g.kind)).collect();
    assert_eq!(
        groups,
        vec![(P1, GroupKind::Withdraw), (P2, GroupKind::Deposit)]
    );
    assert_eq!(redeemed(&plan.groups[0].instructions[0]), u(100));
    assert_eq!(deposited(&plan.groups[1].instructions[1]), u(100));
}

#[test]
fn test_rebalance_requires_same_underlying_and_approved_target() {
    let mut r = registry();
    let from = add(&mut r, single(P1));
    let dai = add(&mut r, Strategy::single(DAI, DAI_VAULT, DAI_VAULT).unwrap());
    let to = add(&mut r, single(P2));
    r.set_pool_approval(GOV, P2, false).unwrap();
    let manager = StrategyManager::new(&r);

    assert!(matches!(
        manager.rebalance(OWNER, &from, &dai, &chain()),
        Err(AllocationError::StrategyMismatch { .. })
    ));
    assert_eq!(
        manager.rebalance(OWNER, &from, &to, &chain()),
        Err(AllocationError::UnapprovedPool { pool: P2 })
    );
}
