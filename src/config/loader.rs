//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating cross references between
//! protocols, pools, profiles and vaults, and providing clear error
//! messages for misconfiguration.

use std::collections::BTreeSet;
use std::path::Path;

use alloy::primitives::U256;
use anyhow::{Context, Result};
use tracing::info;

use super::{AppConfig, ProtocolKind, percent_to_bps};
use crate::domain::risk::MAX_POOL_RATING;
use crate::domain::types::BPS_DENOMINATOR;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    protocols = config.protocols.len(),
    pools = config.pools.len(),
    profiles = config.risk_profiles.len(),
    vaults = config.vaults.len(),
    dry_run = config.service.dry_run,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content).with_context(|| "Failed to parse config.toml")?;
  validate_config(&config)?;
  Ok(config)
}

fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(
    config.service.cycle_interval_secs > 0,
    "cycle_interval_secs must be positive"
  );
  anyhow::ensure!(
    !config.snapshot.path.is_empty(),
    "snapshot path must not be empty"
  );

  // Protocol validation
  let mut protocol_ids = BTreeSet::new();
  for protocol in &config.protocols {
    anyhow::ensure!(
      protocol_ids.insert(protocol.id.as_str()),
      "Duplicate protocol id {}",
      protocol.id
    );
    anyhow::ensure!(
      protocol.ltv_bps < BPS_DENOMINATOR,
      "Protocol {} ltv_bps must be below {}, got {}",
      protocol.id,
      BPS_DENOMINATOR,
      protocol.ltv_bps
    );
    anyhow::ensure!(
      protocol.kind != ProtocolKind::Lending || protocol.ltv_bps > 0,
      "Lending protocol {} needs a positive ltv_bps",
      protocol.id
    );
    anyhow::ensure!(
      protocol.slippage_bps <= BPS_DENOMINATOR,
      "Protocol {} slippage_bps out of range: {}",
      protocol.id,
      protocol.slippage_bps
    );
    let caps = &protocol.deposit_cap;
    anyhow::ensure!(
      percent_to_bps(caps.protocol_percent).is_some(),
      "Protocol {} deposit percent must be in [0, 100], got {}",
      protocol.id,
      caps.protocol_percent
    );
    for pool in &caps.pools {
      anyhow::ensure!(
        percent_to_bps(pool.percent).is_some(),
        "Protocol {} pool {} deposit percent must be in [0, 100], got {}",
        protocol.id,
        pool.pool,
        pool.percent
      );
    }
    for amount in &caps.amounts {
      U256::from_str_radix(&amount.amount, 10).with_context(|| {
        format!(
          "Protocol {} cap amount for pool {} is not an integer: {}",
          protocol.id, amount.pool, amount.amount
        )
      })?;
    }
  }

  // Pool validation
  let mut pools = BTreeSet::new();
  for pool in &config.pools {
    anyhow::ensure!(pools.insert(pool.address), "Duplicate pool {}", pool.address);
    let kind = config
      .protocols
      .iter()
      .find(|p| p.id == pool.protocol)
      .map(|p| p.kind)
      .with_context(|| format!("Pool {} references unknown protocol {}", pool.address, pool.protocol))?;
    if let Some(rating) = pool.rating {
      anyhow::ensure!(
        rating <= MAX_POOL_RATING,
        "Pool {} rating must be at most {}, got {}",
        pool.address,
        MAX_POOL_RATING,
        rating
      );
    }
    anyhow::ensure!(!pool.coins.is_empty(), "Pool {} has no coins", pool.address);
    match kind {
      ProtocolKind::Erc4626 => anyhow::ensure!(
        pool.coins.len() == 1,
        "ERC-4626 pool {} must have exactly one coin",
        pool.address
      ),
      ProtocolKind::Lending => anyhow::ensure!(
        pool.receipt_tokens.len() == pool.coins.len(),
        "Lending pool {} needs one receipt token per coin",
        pool.address
      ),
      ProtocolKind::Curve => {
        anyhow::ensure!(
          matches!(pool.coins.len(), 2 | 3),
          "Curve pool {} must have two or three coins",
          pool.address
        );
        anyhow::ensure!(
          pool.lp_token.is_some(),
          "Curve pool {} has no lp_token",
          pool.address
        );
      }
    }
  }

  // Risk profile validation
  let mut profiles = BTreeSet::new();
  for profile in &config.risk_profiles {
    anyhow::ensure!(
      profiles.insert(profile.name.as_str()),
      "Duplicate risk profile {}",
      profile.name
    );
    anyhow::ensure!(
      profile.min_rating <= profile.max_rating && profile.max_rating <= MAX_POOL_RATING,
      "Risk profile {} has invalid rating range [{}, {}]",
      profile.name,
      profile.min_rating,
      profile.max_rating
    );
  }

  // Vault validation
  for vault in &config.vaults {
    anyhow::ensure!(
      profiles.contains(vault.risk_profile.as_str()),
      "Vault {} references unknown risk profile {}",
      vault.name,
      vault.risk_profile
    );
  }

  Ok(())
}
