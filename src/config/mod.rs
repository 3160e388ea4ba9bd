//! Configuration Module - TOML-based Allocator Configuration
//!
//! Loads and validates configuration from `config.toml`.
//! Protocol deployments, pool metadata, deposit caps, risk profiles and
//! managed vaults are all externalized here; nothing is hardcoded in the
//! domain layer.

pub mod loader;

use alloy::primitives::Address;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;

use crate::domain::deposit_cap::DepositCapMode;
use crate::domain::types::BPS_DENOMINATOR;

/// Top-level allocator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Service identity and keeper cadence.
  pub service: ServiceConfig,
  /// Chain state source.
  pub snapshot: SnapshotConfig,
  /// Persistence configuration.
  #[serde(default)]
  pub persistence: PersistenceConfig,
  /// Metrics and monitoring.
  #[serde(default)]
  pub metrics: MetricsConfig,
  /// Governance account and role holders.
  pub governance: GovernanceConfig,
  /// Deployed protocol adapters.
  pub protocols: Vec<ProtocolConfig>,
  /// Pools, their ratings and adapter bindings.
  pub pools: Vec<PoolConfig>,
  /// Named risk profiles.
  pub risk_profiles: Vec<RiskProfileConfig>,
  /// Vaults managed by the keeper.
  #[serde(default)]
  pub vaults: Vec<VaultConfig>,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Human-readable service name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Compile and log plans without submitting them.
  #[serde(default = "default_true")]
  pub dry_run: bool,
  /// Keeper cycle interval in seconds.
  #[serde(default = "default_cycle_interval")]
  pub cycle_interval_secs: u64,
  /// Multicall contract the batches are encoded for.
  #[serde(default)]
  pub multicall: Option<Address>,
}

/// Chain snapshot file, reloaded every cycle.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotConfig {
  pub path: String,
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
  /// Directory for JSONL plan logs and the state snapshot.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
}

impl Default for PersistenceConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_metrics_addr(),
    }
  }
}

/// Governance account plus accounts holding operator roles.
#[derive(Debug, Clone, Deserialize)]
pub struct GovernanceConfig {
  pub admin: Address,
  #[serde(default)]
  pub risk_operators: Vec<Address>,
  #[serde(default)]
  pub strategy_operators: Vec<Address>,
  #[serde(default)]
  pub finance_operators: Vec<Address>,
}

/// Adapter family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolKind {
  Erc4626,
  Lending,
  Curve,
}

/// One deployed protocol adapter.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolConfig {
  /// Unique protocol id.
  pub id: String,
  pub kind: ProtocolKind,
  /// Loan-to-value for borrowing, lending only.
  #[serde(default = "default_ltv_bps")]
  pub ltv_bps: u16,
  /// Swap router used to convert rewards and withdrawn coins.
  #[serde(default)]
  pub router: Option<Address>,
  /// Slippage tolerance on swaps.
  #[serde(default = "default_slippage_bps")]
  pub slippage_bps: u16,
  #[serde(default)]
  pub deposit_cap: DepositCapConfig,
}

/// Deposit cap configuration of a protocol.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepositCapConfig {
  #[serde(default)]
  pub mode: DepositCapMode,
  /// Percent of the pool value, e.g. `10` for 10%.
  #[serde(default)]
  pub protocol_percent: Decimal,
  #[serde(default)]
  pub pools: Vec<PoolPercentConfig>,
  #[serde(default)]
  pub amounts: Vec<CapAmountConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolPercentConfig {
  pub pool: Address,
  pub percent: Decimal,
}

/// Absolute cap; `amount` is a decimal integer string in token units.
#[derive(Debug, Clone, Deserialize)]
pub struct CapAmountConfig {
  pub pool: Address,
  pub asset: Address,
  pub amount: String,
}

/// Pool registration, risk metadata and adapter wiring.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
  pub address: Address,
  /// Protocol id the pool binds to.
  pub protocol: String,
  #[serde(default)]
  pub rating: Option<u8>,
  #[serde(default)]
  pub approved: bool,
  /// Stake receipt tokens after depositing.
  #[serde(default)]
  pub stake: bool,
  /// Underlying assets (erc4626: exactly one; curve: the coins).
  #[serde(default)]
  pub coins: Vec<Address>,
  /// Curve LP token.
  #[serde(default)]
  pub lp_token: Option<Address>,
  /// Lending receipt tokens, parallel to `coins`.
  #[serde(default)]
  pub receipt_tokens: Vec<Address>,
  /// Lending assets that may be borrowed.
  #[serde(default)]
  pub borrowable: Vec<Address>,
  /// Curve liquidity gauge.
  #[serde(default)]
  pub gauge: Option<Address>,
  /// Gauge reward token.
  #[serde(default)]
  pub reward_token: Option<Address>,
}

/// Named risk policy.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskProfileConfig {
  pub name: String,
  #[serde(default)]
  pub can_borrow: bool,
  pub min_rating: u8,
  pub max_rating: u8,
}

/// Vault whose idle assets the keeper allocates.
#[derive(Debug, Clone, Deserialize)]
pub struct VaultConfig {
  pub name: String,
  /// Account holding the assets and positions.
  pub owner: Address,
  pub asset: Address,
  pub risk_profile: String,
  /// Claim and re-deposit rewards each cycle.
  #[serde(default = "default_true")]
  pub harvest: bool,
}

/// Convert a percentage such as `12.5` into basis points.
pub fn percent_to_bps(percent: Decimal) -> Option<u16> {
  let bps = (percent * Decimal::ONE_HUNDRED).round().to_u16()?;
  (bps <= BPS_DENOMINATOR).then_some(bps)
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_cycle_interval() -> u64 {
  60
}

fn default_data_dir() -> String {
  "data".to_string()
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_ltv_bps() -> u16 {
  7_500
}

fn default_slippage_bps() -> u16 {
  50
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  #[test]
  fn test_percent_to_bps() {
    assert_eq!(percent_to_bps(dec!(10)), Some(1_000));
    assert_eq!(percent_to_bps(dec!(12.5)), Some(1_250));
    assert_eq!(percent_to_bps(dec!(0.01)), Some(1));
    assert_eq!(percent_to_bps(dec!(100)), Some(10_000));
    assert_eq!(percent_to_bps(dec!(100.01)), None);
    assert_eq!(percent_to_bps(dec!(-1)), None);
  }
}
