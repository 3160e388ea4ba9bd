//! Configuration Store Port - Pools, Bindings, Strategies and Selections
//!
//! Read side used by the strategy compiler and risk manager, plus the
//! narrow write side the best-strategy resolution needs (registering a
//! rating-based default and caching it). Privileged mutation (ratings,
//! approvals, caps, overrides) lives on the store implementation and
//! is role-checked there.

use crate::domain::deposit_cap::DepositCapPolicy;
use crate::domain::risk::{DefaultStrategyState, PoolRecord, RiskProfile};
use crate::domain::strategy::{Strategy, StrategyHash, TokenHash};
use crate::domain::types::Pool;
use crate::ports::protocol_adapter::AdapterHandle;

/// Adapter resolved for a pool, with its per-pool options.
#[derive(Debug, Clone)]
pub struct PoolBinding {
  /// Adapter and its bound capabilities.
  pub adapter: AdapterHandle,
  /// Whether receipt tokens are staked after the final deposit.
  pub stake: bool,
  /// Deposit caps of the adapter's protocol.
  pub caps: DepositCapPolicy,
}

/// Read access to allocator configuration.
pub trait ConfigStore {
  fn pool(&self, pool: Pool) -> Option<PoolRecord>;

  /// All pools, in registration order.
  fn pools(&self) -> Vec<PoolRecord>;

  fn binding(&self, pool: Pool) -> Option<PoolBinding>;

  fn strategy(&self, hash: &StrategyHash) -> Option<Strategy>;

  fn risk_profile(&self, name: &str) -> Option<RiskProfile>;

  fn best_strategy_override(&self, profile: &str, token_hash: &TokenHash) -> Option<StrategyHash>;

  fn default_strategy_state(&self, profile: &str, token_hash: &TokenHash) -> DefaultStrategyState;

  fn is_approved(&self, pool: Pool) -> bool {
    self.pool(pool).is_some_and(|p| p.approved)
  }
}

/// Writes performed while resolving a best strategy.
pub trait SelectionStore: ConfigStore {
  /// Register `strategy` (idempotent) and return its hash.
  fn register_strategy(&mut self, strategy: Strategy) -> StrategyHash;

  /// Record a freshly computed rating-based default.
  fn cache_default_strategy(&mut self, profile: &str, token_hash: TokenHash, hash: StrategyHash);
}
