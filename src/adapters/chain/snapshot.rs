//! Chain Snapshot - In-memory Balance Oracle
//!
//! Implements the `ChainView` port over plain maps. The keeper loads a
//! fresh snapshot from `chain_snapshot.json` every cycle (written by an
//! external indexer); tests build snapshots with the `with_*` helpers.
//!
//! Prices are USD values scaled by 1e18 per base unit; a quote between
//! two priced assets is `amount * price_from / price_to`, and a quote
//! involving an unpriced asset is zero.

use std::collections::BTreeMap;
use std::path::Path;

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, instrument};

use crate::domain::types::{Amount, Asset, Pool, mul_div};
use crate::ports::chain_view::ChainView;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BalanceEntry {
    token: Asset,
    account: Address,
    amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SupplyEntry {
    token: Asset,
    amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RewardEntry {
    source: Address,
    account: Address,
    amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DebtEntry {
    pool: Pool,
    asset: Asset,
    account: Address,
    amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PriceEntry {
    asset: Asset,
    price: U256,
}

/// On-disk snapshot format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    block: u64,
    #[serde(default)]
    balances: Vec<BalanceEntry>,
    #[serde(default)]
    supplies: Vec<SupplyEntry>,
    #[serde(default)]
    rewards: Vec<RewardEntry>,
    #[serde(default)]
    debts: Vec<DebtEntry>,
    #[serde(default)]
    prices: Vec<PriceEntry>,
}

/// Point-in-time view of balances, supplies, rewards, debts and prices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainSnapshot {
    block: u64,
    balances: BTreeMap<(Asset, Address), Amount>,
    supplies: BTreeMap<Asset, Amount>,
    rewards: BTreeMap<(Address, Address), Amount>,
    debts: BTreeMap<(Pool, Asset, Address), Amount>,
    prices: BTreeMap<Asset, U256>,
}

impl From<SnapshotFile> for ChainSnapshot {
    fn from(file: SnapshotFile) -> Self {
        Self {
            block: file.block,
            balances: file
                .balances
                .into_iter()
                .map(|e| ((e.token, e.account), e.amount))
                .collect(),
            supplies: file.supplies.into_iter().map(|e| (e.token, e.amount)).collect(),
            rewards: file
                .rewards
                .into_iter()
                .map(|e| ((e.source, e.account), e.amount))
                .collect(),
            debts: file
                .debts
                .into_iter()
                .map(|e| ((e.pool, e.asset, e.account), e.amount))
                .collect(),
            prices: file.prices.into_iter().map(|e| (e.asset, e.price)).collect(),
        }
    }
}

impl ChainSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a snapshot from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: SnapshotFile =
            serde_json::from_str(json).context("Failed to parse chain snapshot JSON")?;
        Ok(file.into())
    }

    /// Load a snapshot file written by the indexer.
    #[instrument]
    pub async fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read chain snapshot: {}", path.display()))?;
        let snapshot = Self::from_json(&json)?;
        info!(
            block = snapshot.block,
            balances = snapshot.balances.len(),
            prices = snapshot.prices.len(),
            "Chain snapshot loaded"
        );
        Ok(snapshot)
    }

    pub const fn block(&self) -> u64 {
        self.block
    }

    #[must_use]
    pub const fn at_block(mut self, block: u64) -> Self {
        self.block = block;
        self
    }

    pub fn set_balance(&mut self, token: Asset, account: Address, amount: Amount) {
        self.balances.insert((token, account), amount);
    }

    pub fn set_supply(&mut self, token: Asset, amount: Amount) {
        self.supplies.insert(token, amount);
    }

    pub fn set_rewards(&mut self, source: Address, account: Address, amount: Amount) {
        self.rewards.insert((source, account), amount);
    }

    pub fn set_debt(&mut self, pool: Pool, asset: Asset, account: Address, amount: Amount) {
        self.debts.insert((pool, asset, account), amount);
    }

    pub fn set_price(&mut self, asset: Asset, price: U256) {
        self.prices.insert(asset, price);
    }

    #[must_use]
    pub fn with_balance(mut self, token: Asset, account: Address, amount: Amount) -> Self {
        self.set_balance(token, account, amount);
        self
    }

    #[must_use]
    pub fn with_supply(mut self, token: Asset, amount: Amount) -> Self {
        self.set_supply(token, amount);
        self
    }

    #[must_use]
    pub fn with_rewards(mut self, source: Address, account: Address, amount: Amount) -> Self {
        self.set_rewards(source, account, amount);
        self
    }

    #[must_use]
    pub fn with_debt(mut self, pool: Pool, asset: Asset, account: Address, amount: Amount) -> Self {
        self.set_debt(pool, asset, account, amount);
        self
    }

    #[must_use]
    pub fn with_price(mut self, asset: Asset, price: U256) -> Self {
        self.set_price(asset, price);
        self
    }
}

impl ChainView for ChainSnapshot {
    fn balance_of(&self, token: Asset, account: Address) -> Amount {
        self.balances
            .get(&(token, account))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    fn total_supply(&self, token: Asset) -> Amount {
        self.supplies.get(&token).copied().unwrap_or(U256::ZERO)
    }

    fn pending_rewards(&self, source: Address, account: Address) -> Amount {
        self.rewards
            .get(&(source, account))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    fn debt_of(&self, pool: Pool, asset: Asset, account: Address) -> Amount {
        self.debts
            .get(&(pool, asset, account))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    fn quote(&self, from: Asset, to: Asset, amount: Amount) -> Amount {
        if from == to {
            return amount;
        }
        match (self.prices.get(&from), self.prices.get(&to)) {
            (Some(price_from), Some(price_to)) => mul_div(amount, *price_from, *price_to),
            _ => U256::ZERO,
        }
    }
}
