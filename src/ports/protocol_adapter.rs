//! Protocol Adapter Port - Capability-typed Pool Integrations
//!
//! Every adapter implements the base [`ProtocolAdapter`] capability:
//! amount conversion, pool valuation, and deposit/withdraw instruction
//! building with deposit caps applied. Optional capabilities are
//! separate traits:
//!
//! - [`Stakeable`]: receipt tokens can be staked in a gauge
//! - [`RewardBearing`]: positions accrue claimable reward tokens
//! - [`Borrowing`]: deposits can collateralize loans
//!
//! Capabilities are attached once, when an adapter is wrapped in an
//! [`AdapterHandle`] for registration, and never looked up at runtime.
//!
//! "Nothing to do" returns an empty list or zero, never an error.

use std::sync::Arc;

use alloy::primitives::Address;

use crate::domain::deposit_cap::{DepositCapMode, DepositCapPolicy};
use crate::domain::error::{AllocationError, AllocationResult, Capability};
use crate::domain::types::{Amount, Asset, Instruction, Pool};
use crate::ports::chain_view::ChainView;

/// Base capability shared by every adapter.
pub trait ProtocolAdapter: Send + Sync {
  /// Stable protocol identifier (config key, log field).
  fn protocol_id(&self) -> &str;

  /// Pools this adapter is configured for.
  fn pools(&self) -> Vec<Pool>;

  /// Assets `pool` accepts as deposits.
  fn underlying_tokens(&self, pool: Pool) -> AllocationResult<Vec<Asset>>;

  /// Receipt token minted when `asset` is deposited into `pool`.
  fn liquidity_pool_token(&self, asset: Asset, pool: Pool) -> AllocationResult<Asset>;

  /// Whether `pool` accepts `asset`.
  fn accepts(&self, pool: Pool, asset: Asset) -> bool {
    self
      .underlying_tokens(pool)
      .is_ok_and(|tokens| tokens.contains(&asset))
  }

  /// Value held by `pool`, expressed in `asset`.
  fn get_pool_value(
    &self,
    pool: Pool,
    asset: Asset,
    chain: &dyn ChainView,
  ) -> AllocationResult<Amount>;

  /// Receipt tokens minted for depositing `amount` of `asset`.
  fn calculate_amount_in_lp_token(
    &self,
    asset: Asset,
    pool: Pool,
    amount: Amount,
    chain: &dyn ChainView,
  ) -> AllocationResult<Amount>;

  /// `asset` redeemed for `lp_amount` receipt tokens.
  fn get_some_amount_in_token(
    &self,
    asset: Asset,
    pool: Pool,
    lp_amount: Amount,
    chain: &dyn ChainView,
  ) -> AllocationResult<Amount>;

  /// Receipt tokens held by `owner`.
  fn get_liquidity_pool_token_balance(
    &self,
    owner: Address,
    asset: Asset,
    pool: Pool,
    chain: &dyn ChainView,
  ) -> AllocationResult<Amount> {
    let lp = self.liquidity_pool_token(asset, pool)?;
    Ok(chain.balance_of(lp, owner))
  }

  /// Everything `owner` holds in `pool`, expressed in `asset`.
  fn get_all_amount_in_token(
    &self,
    owner: Address,
    asset: Asset,
    pool: Pool,
    chain: &dyn ChainView,
  ) -> AllocationResult<Amount> {
    let lp = self.get_liquidity_pool_token_balance(owner, asset, pool, chain)?;
    self.get_some_amount_in_token(asset, pool, lp, chain)
  }

  /// Exposure of `owner` counted against the deposit cap.
  fn get_position_value(
    &self,
    owner: Address,
    asset: Asset,
    pool: Pool,
    chain: &dyn ChainView,
  ) -> AllocationResult<Amount> {
    let lp = self.get_liquidity_pool_token_balance(owner, asset, pool, chain)?;
    self.get_some_amount_in_token(asset, pool, lp, chain)
  }

  /// Receipt tokens `owner` can redeem right now.
  fn withdrawable_lp_amount(
    &self,
    owner: Address,
    asset: Asset,
    pool: Pool,
    chain: &dyn ChainView,
  ) -> AllocationResult<Amount> {
    self.get_liquidity_pool_token_balance(owner, asset, pool, chain)
  }

  /// `requested` clamped by `caps` against the current pool value.
  fn deposit_amount(
    &self,
    owner: Address,
    asset: Asset,
    pool: Pool,
    requested: Amount,
    caps: &DepositCapPolicy,
    chain: &dyn ChainView,
  ) -> AllocationResult<Amount> {
    if caps.mode() == DepositCapMode::Unlimited {
      return Ok(requested);
    }
    let pool_value = self.get_pool_value(pool, asset, chain)?;
    let position = self.get_position_value(owner, asset, pool, chain)?;
    Ok(caps.clamp(pool, asset, requested, pool_value, position))
  }

  /// Approvals and the deposit call for `amount` of `asset`, clamped by
  /// `caps`. Empty when the clamped amount is zero.
  fn get_deposit_some_instructions(
    &self,
    owner: Address,
    asset: Asset,
    pool: Pool,
    amount: Amount,
    caps: &DepositCapPolicy,
    chain: &dyn ChainView,
  ) -> AllocationResult<Vec<Instruction>>;

  /// Deposit the owner's whole balance of `asset`.
  fn get_deposit_all_instructions(
    &self,
    owner: Address,
    asset: Asset,
    pool: Pool,
    caps: &DepositCapPolicy,
    chain: &dyn ChainView,
  ) -> AllocationResult<Vec<Instruction>> {
    let balance = chain.balance_of(asset, owner);
    self.get_deposit_some_instructions(owner, asset, pool, balance, caps, chain)
  }

  /// Redeem `lp_amount` receipt tokens into `asset`.
  fn get_withdraw_some_instructions(
    &self,
    owner: Address,
    asset: Asset,
    pool: Pool,
    lp_amount: Amount,
    chain: &dyn ChainView,
  ) -> AllocationResult<Vec<Instruction>>;

  /// Redeem everything withdrawable into `asset`.
  fn get_withdraw_all_instructions(
    &self,
    owner: Address,
    asset: Asset,
    pool: Pool,
    chain: &dyn ChainView,
  ) -> AllocationResult<Vec<Instruction>> {
    let lp = self.withdrawable_lp_amount(owner, asset, pool, chain)?;
    self.get_withdraw_some_instructions(owner, asset, pool, lp, chain)
  }
}

/// Receipt tokens can be staked for additional yield.
pub trait Stakeable: ProtocolAdapter {
  fn can_stake(&self, pool: Pool) -> bool;

  /// Token representing staked receipt tokens.
  fn staking_token(&self, pool: Pool) -> AllocationResult<Address>;

  fn get_staked_balance(
    &self,
    owner: Address,
    pool: Pool,
    chain: &dyn ChainView,
  ) -> AllocationResult<Amount> {
    let token = self.staking_token(pool)?;
    Ok(chain.balance_of(token, owner))
  }

  fn get_stake_some_instructions(
    &self,
    owner: Address,
    pool: Pool,
    lp_amount: Amount,
    chain: &dyn ChainView,
  ) -> AllocationResult<Vec<Instruction>>;

  /// Stake every receipt token `owner` holds.
  fn get_stake_all_instructions(
    &self,
    owner: Address,
    asset: Asset,
    pool: Pool,
    chain: &dyn ChainView,
  ) -> AllocationResult<Vec<Instruction>> {
    let lp = self.get_liquidity_pool_token_balance(owner, asset, pool, chain)?;
    self.get_stake_some_instructions(owner, pool, lp, chain)
  }

  fn get_unstake_some_instructions(
    &self,
    owner: Address,
    pool: Pool,
    amount: Amount,
    chain: &dyn ChainView,
  ) -> AllocationResult<Vec<Instruction>>;

  fn get_unstake_all_instructions(
    &self,
    owner: Address,
    pool: Pool,
    chain: &dyn ChainView,
  ) -> AllocationResult<Vec<Instruction>> {
    let staked = self.get_staked_balance(owner, pool, chain)?;
    self.get_unstake_some_instructions(owner, pool, staked, chain)
  }

  /// Unstake everything, then redeem staked and loose receipt tokens
  /// into `asset` in one sequence.
  fn get_unstake_and_withdraw_all_instructions(
    &self,
    owner: Address,
    asset: Asset,
    pool: Pool,
    chain: &dyn ChainView,
  ) -> AllocationResult<Vec<Instruction>> {
    let staked = self.get_staked_balance(owner, pool, chain)?;
    let loose = self.get_liquidity_pool_token_balance(owner, asset, pool, chain)?;
    let mut instructions = self.get_unstake_some_instructions(owner, pool, staked, chain)?;
    instructions.extend(self.get_withdraw_some_instructions(
      owner,
      asset,
      pool,
      staked.saturating_add(loose),
      chain,
    )?);
    Ok(instructions)
  }

  /// Staked plus loose receipt tokens and pending rewards, in `asset`.
  fn get_all_amount_in_token_stake(
    &self,
    owner: Address,
    asset: Asset,
    pool: Pool,
    chain: &dyn ChainView,
  ) -> AllocationResult<Amount>;
}

/// Positions accrue claimable reward tokens.
pub trait RewardBearing: ProtocolAdapter {
  /// Reward token of `pool`, `None` when the pool pays none.
  fn reward_token(&self, pool: Pool) -> AllocationResult<Option<Asset>>;

  fn get_unclaimed_rewards(
    &self,
    owner: Address,
    pool: Pool,
    chain: &dyn ChainView,
  ) -> AllocationResult<Amount>;

  fn get_claim_instructions(
    &self,
    owner: Address,
    pool: Pool,
    chain: &dyn ChainView,
  ) -> AllocationResult<Vec<Instruction>>;

  /// Claim, then swap `amount` of the reward token into `to_asset`.
  fn get_harvest_some_instructions(
    &self,
    owner: Address,
    pool: Pool,
    to_asset: Asset,
    amount: Amount,
    chain: &dyn ChainView,
  ) -> AllocationResult<Vec<Instruction>>;

  /// Claim, then swap the whole reward balance into `to_asset`.
  fn get_harvest_all_instructions(
    &self,
    owner: Address,
    pool: Pool,
    to_asset: Asset,
    chain: &dyn ChainView,
  ) -> AllocationResult<Vec<Instruction>> {
    let Some(reward) = self.reward_token(pool)? else {
      return Ok(Vec::new());
    };
    let total = chain
      .balance_of(reward, owner)
      .saturating_add(self.get_unclaimed_rewards(owner, pool, chain)?);
    self.get_harvest_some_instructions(owner, pool, to_asset, total, chain)
  }
}

/// Deposits can collateralize loans.
pub trait Borrowing: ProtocolAdapter {
  fn supported_borrow_assets(&self, pool: Pool) -> AllocationResult<Vec<Asset>>;

  fn get_debt(
    &self,
    owner: Address,
    pool: Pool,
    borrow_asset: Asset,
    chain: &dyn ChainView,
  ) -> AllocationResult<Amount> {
    Ok(chain.debt_of(pool, borrow_asset, owner))
  }

  /// Additional `borrow_asset` `owner` may borrow against its
  /// `collateral_asset` deposit.
  fn borrow_capacity(
    &self,
    owner: Address,
    collateral_asset: Asset,
    pool: Pool,
    borrow_asset: Asset,
    chain: &dyn ChainView,
  ) -> AllocationResult<Amount>;

  fn get_borrow_all_instructions(
    &self,
    owner: Address,
    collateral_asset: Asset,
    pool: Pool,
    borrow_asset: Asset,
    chain: &dyn ChainView,
  ) -> AllocationResult<Vec<Instruction>>;

  /// Repay as much debt as the owner's `borrow_asset` balance covers.
  fn get_repay_all_instructions(
    &self,
    owner: Address,
    pool: Pool,
    borrow_asset: Asset,
    chain: &dyn ChainView,
  ) -> AllocationResult<Vec<Instruction>>;

  /// Collateral plus `borrowed_held`, minus debt, in `collateral_asset`.
  fn get_all_amount_in_token_borrow(
    &self,
    owner: Address,
    collateral_asset: Asset,
    pool: Pool,
    borrow_asset: Asset,
    borrowed_held: Amount,
    chain: &dyn ChainView,
  ) -> AllocationResult<Amount> {
    let collateral = self.get_all_amount_in_token(owner, collateral_asset, pool, chain)?;
    let debt = self.get_debt(owner, pool, borrow_asset, chain)?;
    let held = chain.quote(borrow_asset, collateral_asset, borrowed_held);
    let owed = chain.quote(borrow_asset, collateral_asset, debt);
    Ok(collateral.saturating_add(held).saturating_sub(owed))
  }
}

/// An adapter together with the capabilities bound at registration.
#[derive(Clone)]
pub struct AdapterHandle {
  base: Arc<dyn ProtocolAdapter>,
  stakeable: Option<Arc<dyn Stakeable>>,
  rewards: Option<Arc<dyn RewardBearing>>,
  borrowing: Option<Arc<dyn Borrowing>>,
}

impl std::fmt::Debug for AdapterHandle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AdapterHandle")
      .field("protocol", &self.base.protocol_id())
      .field("stake", &self.stakeable.is_some())
      .field("rewards", &self.rewards.is_some())
      .field("borrow", &self.borrowing.is_some())
      .finish()
  }
}

impl AdapterHandle {
  pub fn new(base: Arc<dyn ProtocolAdapter>) -> Self {
    Self {
      base,
      stakeable: None,
      rewards: None,
      borrowing: None,
    }
  }

  #[must_use]
  pub fn with_staking(mut self, adapter: Arc<dyn Stakeable>) -> Self {
    self.stakeable = Some(adapter);
    self
  }

  #[must_use]
  pub fn with_rewards(mut self, adapter: Arc<dyn RewardBearing>) -> Self {
    self.rewards = Some(adapter);
    self
  }

  #[must_use]
  pub fn with_borrowing(mut self, adapter: Arc<dyn Borrowing>) -> Self {
    self.borrowing = Some(adapter);
    self
  }

  pub fn protocol_id(&self) -> &str {
    self.base.protocol_id()
  }

  pub fn base(&self) -> &dyn ProtocolAdapter {
    self.base.as_ref()
  }

  pub fn has(&self, capability: Capability) -> bool {
    match capability {
      Capability::Stake => self.stakeable.is_some(),
      Capability::Rewards => self.rewards.is_some(),
      Capability::Borrow => self.borrowing.is_some(),
    }
  }

  fn missing(&self, capability: Capability) -> AllocationError {
    AllocationError::CapabilityMissing {
      protocol: self.protocol_id().to_string(),
      capability,
    }
  }

  pub fn stakeable(&self) -> AllocationResult<&dyn Stakeable> {
    self
      .stakeable
      .as_deref()
      .ok_or_else(|| self.missing(Capability::Stake))
  }

  pub fn rewards(&self) -> AllocationResult<&dyn RewardBearing> {
    self
      .rewards
      .as_deref()
      .ok_or_else(|| self.missing(Capability::Rewards))
  }

  pub fn borrowing(&self) -> AllocationResult<&dyn Borrowing> {
    self
      .borrowing
      .as_deref()
      .ok_or_else(|| self.missing(Capability::Borrow))
  }
}
