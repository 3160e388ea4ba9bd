//! Chain View Port - Read-only Balance Oracle
//!
//! Everything the adapters need to know about on-chain state:
//! token balances, supplies, pending rewards, debts and price quotes.
//! Reads are synchronous against a snapshot; the strategy compiler
//! layers simulated balances on top of an implementation of this
//! trait so each step sees the output of the previous one.

use alloy::primitives::Address;

use crate::domain::types::{Amount, Asset, Pool};

/// Read-only view of chain state.
pub trait ChainView: Send + Sync {
  /// Balance of `token` held by `account`.
  fn balance_of(&self, token: Asset, account: Address) -> Amount;

  /// Total supply of `token`.
  fn total_supply(&self, token: Asset) -> Amount;

  /// Rewards claimable by `account` from `source` (a gauge or pool).
  fn pending_rewards(&self, source: Address, account: Address) -> Amount;

  /// Outstanding debt of `account` in `asset` at lending `pool`.
  fn debt_of(&self, pool: Pool, asset: Asset, account: Address) -> Amount;

  /// Value of `amount` of `from` expressed in `to`. Identity when
  /// `from == to`.
  fn quote(&self, from: Asset, to: Asset, amount: Amount) -> Amount;
}
