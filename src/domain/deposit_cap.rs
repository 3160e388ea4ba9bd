//! Deposit Cap Policy - Per-protocol Deposit Ceilings
//!
//! Converts a configured limit mode into the effective amount a single
//! deposit request may move into a pool:
//!
//! - `Amount`: fixed ceiling per `(pool, asset)`; unconfigured pairs are capped at zero
//! - `PoolPercentage`: share of the pool's current value, per-pool bps
//!   with the protocol bps as fallback
//! - `ProtocolPercentage`: share of the pool's current value at the protocol bps
//! - `Unlimited`: no clamp
//!
//! The ceiling covers the owner's total exposure, so the headroom left
//! for a request is `cap - current position value`. Pool values are read
//! at call time; nothing here caches them.

use std::collections::BTreeMap;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use super::error::{AllocationError, AllocationResult};
use super::types::{Amount, Asset, BPS_DENOMINATOR, Pool, apply_bps};

/// How deposits into a protocol's pools are limited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositCapMode {
    #[default]
    Unlimited,
    Amount,
    PoolPercentage,
    ProtocolPercentage,
}

/// Deposit ceiling configuration of one protocol adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepositCapPolicy {
    mode: DepositCapMode,
    protocol_pct_bps: u16,
    pool_pct_bps: BTreeMap<Pool, u16>,
    amounts: BTreeMap<(Pool, Asset), Amount>,
}

fn checked_bps(bps: u16) -> AllocationResult<u16> {
    if bps > BPS_DENOMINATOR {
        return Err(AllocationError::InvalidPercentage(u32::from(bps)));
    }
    Ok(bps)
}

impl DepositCapPolicy {
    pub fn new(mode: DepositCapMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub const fn mode(&self) -> DepositCapMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DepositCapMode) {
        self.mode = mode;
    }

    pub fn set_protocol_percentage(&mut self, bps: u16) -> AllocationResult<()> {
        self.protocol_pct_bps = checked_bps(bps)?;
        Ok(())
    }

    pub fn set_pool_percentage(&mut self, pool: Pool, bps: u16) -> AllocationResult<()> {
        self.pool_pct_bps.insert(pool, checked_bps(bps)?);
        Ok(())
    }

    pub fn set_amount(&mut self, pool: Pool, asset: Asset, amount: Amount) {
        self.amounts.insert((pool, asset), amount);
    }

    pub const fn protocol_percentage(&self) -> u16 {
        self.protocol_pct_bps
    }

    pub fn pool_percentage(&self, pool: Pool) -> Option<u16> {
        self.pool_pct_bps.get(&pool).copied()
    }

    /// Absolute ceiling for `(pool, asset)` given the pool's current
    /// value. `None` means unlimited.
    pub fn limit(&self, pool: Pool, asset: Asset, pool_value: Amount) -> Option<Amount> {
        match self.mode {
            DepositCapMode::Unlimited => None,
            DepositCapMode::Amount => Some(
                self.amounts
                    .get(&(pool, asset))
                    .copied()
                    .unwrap_or(U256::ZERO),
            ),
            DepositCapMode::PoolPercentage => {
                let bps = self
                    .pool_percentage(pool)
                    .unwrap_or(self.protocol_pct_bps);
                Some(apply_bps(pool_value, bps))
            }
            DepositCapMode::ProtocolPercentage => {
                Some(apply_bps(pool_value, self.protocol_pct_bps))
            }
        }
    }

    /// Remaining room for an owner already holding `position`.
    pub fn headroom(
        &self,
        pool: Pool,
        asset: Asset,
        pool_value: Amount,
        position: Amount,
    ) -> Option<Amount> {
        self.limit(pool, asset, pool_value)
            .map(|cap| cap.saturating_sub(position))
    }

    /// `min(requested, headroom)`.
    pub fn clamp(
        &self,
        pool: Pool,
        asset: Asset,
        requested: Amount,
        pool_value: Amount,
        position: Amount,
    ) -> Amount {
        self.headroom(pool, asset, pool_value, position)
            .map_or(requested, |room| requested.min(room))
    }
}
