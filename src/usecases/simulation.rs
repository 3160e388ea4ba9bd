//! Simulated Chain - Balance Overlay for Multi-step Compilation
//!
//! Wraps a base `ChainView` and records the owner-side effects of each
//! compiled step (assets spent, receipt tokens minted, debt taken), so
//! step `i` is compiled against the simulated output of step `i - 1`.
//! Pool reserves, supplies, rewards and prices pass through unchanged.

use std::collections::BTreeMap;

use alloy::primitives::Address;

use crate::domain::types::{Amount, Asset, Pool};
use crate::ports::chain_view::ChainView;

pub struct SimulatedChain<'a> {
  base: &'a dyn ChainView,
  balances: BTreeMap<(Asset, Address), Amount>,
  debts: BTreeMap<(Pool, Asset, Address), Amount>,
}

impl<'a> SimulatedChain<'a> {
  pub fn new(base: &'a dyn ChainView) -> Self {
    Self {
      base,
      balances: BTreeMap::new(),
      debts: BTreeMap::new(),
    }
  }

  pub fn credit(&mut self, token: Asset, account: Address, amount: Amount) {
    let next = self.balance_of(token, account).saturating_add(amount);
    self.balances.insert((token, account), next);
  }

  pub fn debit(&mut self, token: Asset, account: Address, amount: Amount) {
    let next = self.balance_of(token, account).saturating_sub(amount);
    self.balances.insert((token, account), next);
  }

  pub fn add_debt(&mut self, pool: Pool, asset: Asset, account: Address, amount: Amount) {
    let next = self.debt_of(pool, asset, account).saturating_add(amount);
    self.debts.insert((pool, asset, account), next);
  }

  pub fn reduce_debt(&mut self, pool: Pool, asset: Asset, account: Address, amount: Amount) {
    let next = self.debt_of(pool, asset, account).saturating_sub(amount);
    self.debts.insert((pool, asset, account), next);
  }
}

impl ChainView for SimulatedChain<'_> {
  fn balance_of(&self, token: Asset, account: Address) -> Amount {
    self
      .balances
      .get(&(token, account))
      .copied()
      .unwrap_or_else(|| self.base.balance_of(token, account))
  }

  fn total_supply(&self, token: Asset) -> Amount {
    self.base.total_supply(token)
  }

  fn pending_rewards(&self, source: Address, account: Address) -> Amount {
    self.base.pending_rewards(source, account)
  }

  fn debt_of(&self, pool: Pool, asset: Asset, account: Address) -> Amount {
    self
      .debts
      .get(&(pool, asset, account))
      .copied()
      .unwrap_or_else(|| self.base.debt_of(pool, asset, account))
  }

  fn quote(&self, from: Asset, to: Asset, amount: Amount) -> Amount {
    self.base.quote(from, to, amount)
  }
}
