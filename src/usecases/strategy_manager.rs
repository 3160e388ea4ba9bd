//! Strategy Manager - Strategy Compiler
//!
//! Walks a registered strategy and emits the ordered instruction
//! groups for an operation, or folds the strategy backwards to value a
//! position in its underlying asset.
//!
//! Compilation is all-or-nothing: every step is resolved (adapter
//! bound, pool approved for deposits, asset accepted, output checked,
//! borrow capability present) before any instruction is built, and any
//! later failure aborts the whole plan. Balances are simulated over the
//! supplied chain view so each step consumes the previous step's output.
//!
//! Group counts:
//! - deposit: `steps + borrow steps + (1 if the final pool stakes)`
//! - withdraw: `steps + borrow steps`
//! - harvest/claim: `1` if the final adapter pays a reward token, else `0`

use alloy::primitives::Address;
use tracing::{debug, instrument};

use crate::domain::error::{AllocationError, AllocationResult, Capability};
use crate::domain::strategy::{Strategy, StrategyHash};
use crate::domain::types::{
  Amount, Asset, CompiledPlan, GroupKind, Instruction, InstructionGroup, Operation, Pool,
};
use crate::ports::chain_view::ChainView;
use crate::ports::config_store::{ConfigStore, PoolBinding};
use crate::ports::protocol_adapter::ProtocolAdapter;

use super::simulation::SimulatedChain;

/// Whether resolution is for moving funds into pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
  /// Deposits: pools must be approved.
  Enter,
  /// Withdrawals, rewards and valuation: revoked pools stay reachable.
  Exit,
}

/// A strategy step with its adapter resolved.
struct ResolvedStep {
  index: usize,
  pool: Pool,
  input: Asset,
  output: Asset,
  is_borrow: bool,
  binding: PoolBinding,
}

impl ResolvedStep {
  fn base(&self) -> &dyn ProtocolAdapter {
    self.binding.adapter.base()
  }

  fn group(&self, kind: GroupKind, instructions: Vec<Instruction>) -> InstructionGroup {
    InstructionGroup {
      step_index: self.index,
      pool: self.pool,
      kind,
      instructions,
    }
  }
}

/// Final step stakes its receipt tokens.
fn stakes_top(steps: &[ResolvedStep]) -> bool {
  steps
    .last()
    .is_some_and(|s| s.binding.stake && !s.is_borrow)
}

/// Compiles strategies against a configuration store.
pub struct StrategyManager<'a, C: ConfigStore + ?Sized> {
  config: &'a C,
}

impl<'a, C: ConfigStore + ?Sized> StrategyManager<'a, C> {
  pub const fn new(config: &'a C) -> Self {
    Self { config }
  }

  fn strategy(&self, hash: &StrategyHash) -> AllocationResult<Strategy> {
    self
      .config
      .strategy(hash)
      .ok_or(AllocationError::UnknownStrategy(*hash))
  }

  fn resolve(
    &self,
    strategy: &Strategy,
    direction: Direction,
  ) -> AllocationResult<Vec<ResolvedStep>> {
    let mut input = strategy.underlying();
    let mut resolved = Vec::with_capacity(strategy.len());

    for (index, step) in strategy.steps().iter().enumerate() {
      let binding = self
        .config
        .binding(step.pool)
        .ok_or(AllocationError::UnresolvedAdapter { pool: step.pool })?;

      if direction == Direction::Enter && !self.config.is_approved(step.pool) {
        return Err(AllocationError::UnapprovedPool { pool: step.pool });
      }

      let base = binding.adapter.base();
      if !base.underlying_tokens(step.pool)?.contains(&input) {
        return Err(AllocationError::UnsupportedAsset {
          pool: step.pool,
          asset: input,
        });
      }

      if step.is_borrow {
        let borrowing = binding.adapter.borrowing()?;
        if !borrowing
          .supported_borrow_assets(step.pool)?
          .contains(&step.output_asset)
        {
          return Err(AllocationError::UnsupportedBorrowAsset {
            pool: step.pool,
            asset: step.output_asset,
          });
        }
      } else {
        let receipt = base.liquidity_pool_token(input, step.pool)?;
        if receipt != step.output_asset {
          return Err(AllocationError::StepOutputMismatch {
            index,
            expected: receipt,
            actual: step.output_asset,
          });
        }
      }

      resolved.push(ResolvedStep {
        index,
        pool: step.pool,
        input,
        output: step.output_asset,
        is_borrow: step.is_borrow,
        binding,
      });
      input = step.output_asset;
    }

    Ok(resolved)
  }

  fn compile_enter(
    owner: Address,
    steps: &[ResolvedStep],
    first_amount: Option<Amount>,
    sim: &mut SimulatedChain<'_>,
    groups: &mut Vec<InstructionGroup>,
  ) -> AllocationResult<()> {
    for step in steps {
      let base = step.base();
      let caps = &step.binding.caps;
      let explicit = first_amount.filter(|_| step.index == 0);
      let requested = explicit.unwrap_or_else(|| sim.balance_of(step.input, owner));

      let deposited = base.deposit_amount(owner, step.input, step.pool, requested, caps, sim)?;
      let minted = base.calculate_amount_in_lp_token(step.input, step.pool, deposited, sim)?;
      let receipt = base.liquidity_pool_token(step.input, step.pool)?;
      let instructions = match explicit {
        Some(amount) => {
          base.get_deposit_some_instructions(owner, step.input, step.pool, amount, caps, sim)?
        }
        None => base.get_deposit_all_instructions(owner, step.input, step.pool, caps, sim)?,
      };
      if deposited < requested {
        debug!(
          step = step.index,
          pool = %step.pool,
          requested = %requested,
          deposited = %deposited,
          "Deposit clamped by cap"
        );
      }
      sim.debit(step.input, owner, deposited);
      sim.credit(receipt, owner, minted);
      groups.push(step.group(GroupKind::Deposit, instructions));

      if step.is_borrow {
        let borrowing = step.binding.adapter.borrowing()?;
        let borrowed =
          borrowing.borrow_capacity(owner, step.input, step.pool, step.output, sim)?;
        let instructions =
          borrowing.get_borrow_all_instructions(owner, step.input, step.pool, step.output, sim)?;
        sim.credit(step.output, owner, borrowed);
        sim.add_debt(step.pool, step.output, owner, borrowed);
        groups.push(step.group(GroupKind::Borrow, instructions));
      }
    }

    if stakes_top(steps) {
      if let Some(top) = steps.last() {
        let stakeable = top.binding.adapter.stakeable()?;
        let staking_token = stakeable.staking_token(top.pool)?;
        let lp = top
          .base()
          .get_liquidity_pool_token_balance(owner, top.input, top.pool, sim)?;
        let instructions = stakeable.get_stake_all_instructions(owner, top.input, top.pool, sim)?;
        sim.debit(top.output, owner, lp);
        sim.credit(staking_token, owner, lp);
        groups.push(top.group(GroupKind::Stake, instructions));
      }
    }

    Ok(())
  }

  fn compile_exit(
    owner: Address,
    steps: &[ResolvedStep],
    sim: &mut SimulatedChain<'_>,
    groups: &mut Vec<InstructionGroup>,
  ) -> AllocationResult<()> {
    let staked = stakes_top(steps);
    let last = steps.len().saturating_sub(1);

    for step in steps.iter().rev() {
      let base = step.base();

      if step.is_borrow {
        let borrowing = step.binding.adapter.borrowing()?;
        let debt = borrowing.get_debt(owner, step.pool, step.output, sim)?;
        let repaid = debt.min(sim.balance_of(step.output, owner));
        let instructions =
          borrowing.get_repay_all_instructions(owner, step.pool, step.output, sim)?;
        sim.debit(step.output, owner, repaid);
        sim.reduce_debt(step.pool, step.output, owner, repaid);
        groups.push(step.group(GroupKind::Repay, instructions));
      }

      let receipt = base.liquidity_pool_token(step.input, step.pool)?;
      if staked && step.index == last {
        let stakeable = step.binding.adapter.stakeable()?;
        let staking_token = stakeable.staking_token(step.pool)?;
        let staked_lp = stakeable.get_staked_balance(owner, step.pool, sim)?;
        let loose = base.get_liquidity_pool_token_balance(owner, step.input, step.pool, sim)?;
        let redeemed =
          base.get_some_amount_in_token(step.input, step.pool, staked_lp.saturating_add(loose), sim)?;
        let instructions =
          stakeable.get_unstake_and_withdraw_all_instructions(owner, step.input, step.pool, sim)?;
        sim.debit(staking_token, owner, staked_lp);
        sim.debit(receipt, owner, loose);
        sim.credit(step.input, owner, redeemed);
        groups.push(step.group(GroupKind::UnstakeAndWithdraw, instructions));
      } else {
        let lp = base.withdrawable_lp_amount(owner, step.input, step.pool, sim)?;
        let redeemed = base.get_some_amount_in_token(step.input, step.pool, lp, sim)?;
        let instructions = base.get_withdraw_all_instructions(owner, step.input, step.pool, sim)?;
        sim.debit(receipt, owner, lp);
        sim.credit(step.input, owner, redeemed);
        groups.push(step.group(GroupKind::Withdraw, instructions));
      }
    }

    Ok(())
  }

  fn compile_rewards(
    owner: Address,
    strategy: &Strategy,
    steps: &[ResolvedStep],
    kind: GroupKind,
    amount: Option<Amount>,
    chain: &dyn ChainView,
  ) -> AllocationResult<Vec<InstructionGroup>> {
    let Some(top) = steps.last() else {
      return Ok(Vec::new());
    };
    if !top.binding.adapter.has(Capability::Rewards) {
      return Ok(Vec::new());
    }
    let rewards = top.binding.adapter.rewards()?;
    if rewards.reward_token(top.pool)?.is_none() {
      return Ok(Vec::new());
    }

    let to_asset = strategy.underlying();
    let instructions = match (kind, amount) {
      (GroupKind::Claim, _) => rewards.get_claim_instructions(owner, top.pool, chain)?,
      (_, Some(amount)) => {
        rewards.get_harvest_some_instructions(owner, top.pool, to_asset, amount, chain)?
      }
      (_, None) => rewards.get_harvest_all_instructions(owner, top.pool, to_asset, chain)?,
    };
    Ok(vec![top.group(kind, instructions)])
  }

  fn plan(hash: StrategyHash, operation: Operation, groups: Vec<InstructionGroup>) -> CompiledPlan {
    let plan = CompiledPlan {
      strategy: hash,
      operation,
      groups,
    };
    debug!(
      strategy = %hash,
      operation = %operation,
      steps = plan.step_count(),
      instructions = plan.instruction_count(),
      "Plan compiled"
    );
    plan
  }

  fn compile_deposit(
    &self,
    owner: Address,
    hash: &StrategyHash,
    amount: Option<Amount>,
    chain: &dyn ChainView,
  ) -> AllocationResult<CompiledPlan> {
    let strategy = self.strategy(hash)?;
    let steps = self.resolve(&strategy, Direction::Enter)?;
    let mut sim = SimulatedChain::new(chain);
    let mut groups = Vec::new();
    Self::compile_enter(owner, &steps, amount, &mut sim, &mut groups)?;
    let operation = if amount.is_some() {
      Operation::DepositSome
    } else {
      Operation::DepositAll
    };
    Ok(Self::plan(*hash, operation, groups))
  }

  /// Deposit the owner's whole underlying balance through every step.
  #[instrument(skip_all, fields(owner = %owner, strategy = %hash))]
  pub fn deposit_all(
    &self,
    owner: Address,
    hash: &StrategyHash,
    chain: &dyn ChainView,
  ) -> AllocationResult<CompiledPlan> {
    self.compile_deposit(owner, hash, None, chain)
  }

  /// Deposit `amount` of the underlying at step 0; later steps consume
  /// everything the previous step produced.
  #[instrument(skip_all, fields(owner = %owner, strategy = %hash, amount = %amount))]
  pub fn deposit_some(
    &self,
    owner: Address,
    hash: &StrategyHash,
    amount: Amount,
    chain: &dyn ChainView,
  ) -> AllocationResult<CompiledPlan> {
    self.compile_deposit(owner, hash, Some(amount), chain)
  }

  /// Unwind every step in reverse order back into the underlying.
  #[instrument(skip_all, fields(owner = %owner, strategy = %hash))]
  pub fn withdraw_all(
    &self,
    owner: Address,
    hash: &StrategyHash,
    chain: &dyn ChainView,
  ) -> AllocationResult<CompiledPlan> {
    let strategy = self.strategy(hash)?;
    let steps = self.resolve(&strategy, Direction::Exit)?;
    let mut sim = SimulatedChain::new(chain);
    let mut groups = Vec::new();
    Self::compile_exit(owner, &steps, &mut sim, &mut groups)?;
    Ok(Self::plan(*hash, Operation::WithdrawAll, groups))
  }

  /// Claim the final step's rewards and sell them for the underlying.
  #[instrument(skip_all, fields(owner = %owner, strategy = %hash))]
  pub fn harvest_all(
    &self,
    owner: Address,
    hash: &StrategyHash,
    chain: &dyn ChainView,
  ) -> AllocationResult<CompiledPlan> {
    let strategy = self.strategy(hash)?;
    let steps = self.resolve(&strategy, Direction::Exit)?;
    let groups =
      Self::compile_rewards(owner, &strategy, &steps, GroupKind::Harvest, None, chain)?;
    Ok(Self::plan(*hash, Operation::HarvestAll, groups))
  }

  /// Claim, then sell at most `amount` of the reward token.
  #[instrument(skip_all, fields(owner = %owner, strategy = %hash, amount = %amount))]
  pub fn harvest_some(
    &self,
    owner: Address,
    hash: &StrategyHash,
    amount: Amount,
    chain: &dyn ChainView,
  ) -> AllocationResult<CompiledPlan> {
    let strategy = self.strategy(hash)?;
    let steps = self.resolve(&strategy, Direction::Exit)?;
    let groups = Self::compile_rewards(
      owner,
      &strategy,
      &steps,
      GroupKind::Harvest,
      Some(amount),
      chain,
    )?;
    Ok(Self::plan(*hash, Operation::HarvestSome, groups))
  }

  /// Claim the final step's rewards without selling them.
  #[instrument(skip_all, fields(owner = %owner, strategy = %hash))]
  pub fn claim_all(
    &self,
    owner: Address,
    hash: &StrategyHash,
    chain: &dyn ChainView,
  ) -> AllocationResult<CompiledPlan> {
    let strategy = self.strategy(hash)?;
    let steps = self.resolve(&strategy, Direction::Exit)?;
    let groups = Self::compile_rewards(owner, &strategy, &steps, GroupKind::Claim, None, chain)?;
    Ok(Self::plan(*hash, Operation::ClaimAll, groups))
  }

  /// Withdraw everything from `from`, then deposit it all into `to`,
  /// in one plan over one simulation.
  #[instrument(skip_all, fields(owner = %owner, from = %from, to = %to))]
  pub fn rebalance(
    &self,
    owner: Address,
    from: &StrategyHash,
    to: &StrategyHash,
    chain: &dyn ChainView,
  ) -> AllocationResult<CompiledPlan> {
    let current = self.strategy(from)?;
    let target = self.strategy(to)?;
    if current.underlying() != target.underlying() {
      return Err(AllocationError::StrategyMismatch {
        strategy: *to,
        asset: current.underlying(),
      });
    }

    let exit = self.resolve(&current, Direction::Exit)?;
    let enter = self.resolve(&target, Direction::Enter)?;

    let mut sim = SimulatedChain::new(chain);
    let mut groups = Vec::new();
    Self::compile_exit(owner, &exit, &mut sim, &mut groups)?;
    Self::compile_enter(owner, &enter, None, &mut sim, &mut groups)?;
    Ok(Self::plan(*to, Operation::Rebalance, groups))
  }

  /// Owner's position valued in the strategy's underlying asset.
  ///
  /// Folds over the steps in reverse: the final step is valued from the
  /// owner's holdings (staked, borrow-aware or plain), and each earlier
  /// step converts the running value out of its receipt token. Reads the
  /// chain view as-is; two calls around a state change may differ.
  #[instrument(skip_all, fields(owner = %owner, strategy = %hash))]
  pub fn balance_in_underlying(
    &self,
    owner: Address,
    hash: &StrategyHash,
    chain: &dyn ChainView,
  ) -> AllocationResult<Amount> {
    let strategy = self.strategy(hash)?;
    let steps = self.resolve(&strategy, Direction::Exit)?;
    let staked = stakes_top(&steps);
    let last = steps.len().saturating_sub(1);

    steps.iter().rev().try_fold(Amount::ZERO, |value, step| {
      let base = step.base();
      if step.index == last {
        if step.is_borrow {
          let held = chain.balance_of(step.output, owner);
          step.binding.adapter.borrowing()?.get_all_amount_in_token_borrow(
            owner, step.input, step.pool, step.output, held, chain,
          )
        } else if staked {
          step
            .binding
            .adapter
            .stakeable()?
            .get_all_amount_in_token_stake(owner, step.input, step.pool, chain)
        } else {
          base.get_all_amount_in_token(owner, step.input, step.pool, chain)
        }
      } else if step.is_borrow {
        step.binding.adapter.borrowing()?.get_all_amount_in_token_borrow(
          owner, step.input, step.pool, step.output, value, chain,
        )
      } else {
        base.get_some_amount_in_token(step.input, step.pool, value, chain)
      }
    })
  }

  /// Groups a deposit-all plan of `hash` contains.
  pub fn deposit_step_count(&self, hash: &StrategyHash) -> AllocationResult<usize> {
    let strategy = self.strategy(hash)?;
    let steps = self.resolve(&strategy, Direction::Exit)?;
    Ok(steps.len() + strategy.borrow_steps() + usize::from(stakes_top(&steps)))
  }

  /// Groups a withdraw-all plan of `hash` contains.
  pub fn withdraw_step_count(&self, hash: &StrategyHash) -> AllocationResult<usize> {
    let strategy = self.strategy(hash)?;
    let steps = self.resolve(&strategy, Direction::Exit)?;
    Ok(steps.len() + strategy.borrow_steps())
  }

  /// Groups a claim-all or harvest-all plan of `hash` contains.
  pub fn claim_step_count(&self, hash: &StrategyHash) -> AllocationResult<usize> {
    let strategy = self.strategy(hash)?;
    let steps = self.resolve(&strategy, Direction::Exit)?;
    let Some(top) = steps.last() else {
      return Ok(0);
    };
    if !top.binding.adapter.has(Capability::Rewards) {
      return Ok(0);
    }
    let token = top.binding.adapter.rewards()?.reward_token(top.pool)?;
    Ok(usize::from(token.is_some()))
  }
}
