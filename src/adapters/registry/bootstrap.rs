//! Registry Bootstrap - Build a Registry from `AppConfig`
//!
//! Instantiates one adapter per configured protocol with the pools bound
//! to it, then replays the configuration through the registry's
//! role-checked mutators as the governance account.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use tracing::info;

use super::Registry;
use crate::adapters::protocols::{
    CurveAdapter, CurvePool, Erc4626Adapter, LendingAdapter, LendingMarket, SwapRouter,
};
use crate::config::{AppConfig, PoolConfig, ProtocolConfig, ProtocolKind, percent_to_bps};
use crate::domain::error::Role;
use crate::ports::protocol_adapter::AdapterHandle;

impl Registry {
    /// Build a fully wired registry from validated configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let admin = config.governance.admin;
        let mut registry = Self::new(admin);

        let grants = [
            (Role::RiskOperator, &config.governance.risk_operators),
            (Role::StrategyOperator, &config.governance.strategy_operators),
            (Role::FinanceOperator, &config.governance.finance_operators),
        ];
        for (role, accounts) in grants {
            for account in accounts {
                registry.grant_role(admin, role, *account)?;
            }
        }

        for protocol in &config.protocols {
            let pools: Vec<&PoolConfig> = config
                .pools
                .iter()
                .filter(|p| p.protocol == protocol.id)
                .collect();
            let handle = build_adapter(protocol, &pools)?;
            registry.register_adapter(admin, handle)?;
            apply_caps(&mut registry, admin, protocol)?;
        }

        for pool in &config.pools {
            registry.add_pool(admin, pool.address)?;
            registry.set_pool_rating(admin, pool.address, pool.rating)?;
            registry.set_pool_approval(admin, pool.address, pool.approved)?;
            registry
                .bind_pool(admin, pool.address, &pool.protocol, pool.stake)
                .with_context(|| format!("Failed to bind pool {}", pool.address))?;
        }

        for profile in &config.risk_profiles {
            registry.create_risk_profile(
                admin,
                &profile.name,
                profile.can_borrow,
                profile.min_rating,
                profile.max_rating,
            )?;
        }

        info!(
            protocols = config.protocols.len(),
            pools = config.pools.len(),
            profiles = config.risk_profiles.len(),
            "Registry bootstrapped"
        );
        Ok(registry)
    }
}

fn build_adapter(protocol: &ProtocolConfig, pools: &[&PoolConfig]) -> Result<AdapterHandle> {
    let handle = match protocol.kind {
        ProtocolKind::Erc4626 => {
            let mut adapter = Erc4626Adapter::new(&protocol.id);
            for pool in pools {
                let asset = pool
                    .coins
                    .first()
                    .copied()
                    .with_context(|| format!("Vault {} has no asset", pool.address))?;
                adapter = adapter.with_vault(pool.address, asset);
            }
            AdapterHandle::new(Arc::new(adapter))
        }
        ProtocolKind::Lending => {
            let mut adapter = LendingAdapter::new(&protocol.id, protocol.ltv_bps);
            for pool in pools {
                let mut market = LendingMarket::new();
                for (asset, receipt) in pool.coins.iter().zip(&pool.receipt_tokens) {
                    market = market.with_reserve(*asset, *receipt);
                }
                for asset in &pool.borrowable {
                    market = market.with_borrowable(*asset);
                }
                adapter = adapter.with_market(pool.address, market);
            }
            let adapter = Arc::new(adapter);
            AdapterHandle::new(adapter.clone()).with_borrowing(adapter)
        }
        ProtocolKind::Curve => {
            let router = SwapRouter::new(
                protocol.router.unwrap_or(Address::ZERO),
                protocol.slippage_bps,
            );
            let mut adapter = CurveAdapter::new(&protocol.id, router, protocol.slippage_bps);
            for pool in pools {
                let lp_token = pool
                    .lp_token
                    .with_context(|| format!("Curve pool {} has no lp_token", pool.address))?;
                adapter = adapter.with_pool(
                    pool.address,
                    CurvePool {
                        coins: pool.coins.clone(),
                        lp_token,
                        gauge: pool.gauge,
                        reward_token: pool.reward_token,
                    },
                );
            }
            let adapter = Arc::new(adapter);
            AdapterHandle::new(adapter.clone())
                .with_staking(adapter.clone())
                .with_rewards(adapter)
        }
    };
    Ok(handle)
}

fn apply_caps(registry: &mut Registry, admin: Address, protocol: &ProtocolConfig) -> Result<()> {
    let caps = &protocol.deposit_cap;
    let id = protocol.id.as_str();
    registry.set_deposit_cap_mode(admin, id, caps.mode)?;

    let bps = percent_to_bps(caps.protocol_percent)
        .with_context(|| format!("Protocol {id} deposit percent out of range"))?;
    registry.set_protocol_deposit_percentage(admin, id, bps)?;

    for pool in &caps.pools {
        let bps = percent_to_bps(pool.percent)
            .with_context(|| format!("Pool {} deposit percent out of range", pool.pool))?;
        registry.set_pool_deposit_percentage(admin, id, pool.pool, bps)?;
    }
    for cap in &caps.amounts {
        let amount = U256::from_str_radix(&cap.amount, 10)
            .with_context(|| format!("Invalid cap amount {}", cap.amount))?;
        registry.set_deposit_cap_amount(admin, id, cap.pool, cap.asset, amount)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;
    use crate::domain::error::Capability;
    use crate::ports::config_store::ConfigStore;
    use alloy::primitives::address;

    const CONFIG: &str = r#"
[service]
name = "allocator"

[snapshot]
path = "chain.json"

[governance]
admin = "0x0000000000000000000000000000000000000001"
risk_operators = ["0x0000000000000000000000000000000000000002"]

[[protocols]]
id = "vaults"
kind = "erc4626"

[[protocols]]
id = "lend"
kind = "lending"
ltv_bps = 8000

[[protocols]]
id = "curve"
kind = "curve"
router = "0x7a250d5630b4cf539739df2c5dacb4c659f2488d"

[protocols.deposit_cap]
mode = "pool_percentage"
protocol_percent = "5"
pools = [{ pool = "0x4444444444444444444444444444444444444444", percent = "2.5" }]

[[pools]]
address = "0x1111111111111111111111111111111111111111"
protocol = "vaults"
rating = 5
approved = true
coins = ["0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"]

[[pools]]
address = "0x2222222222222222222222222222222222222222"
protocol = "lend"
rating = 8
coins = ["0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"]
receipt_tokens = ["0x3333333333333333333333333333333333333333"]
borrowable = ["0x6b175474e89094c44da98b954eedeac495271d0f"]

[[pools]]
address = "0x4444444444444444444444444444444444444444"
protocol = "curve"
rating = 20
approved = true
stake = true
coins = ["0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", "0x6b175474e89094c44da98b954eedeac495271d0f"]
lp_token = "0x5555555555555555555555555555555555555555"
gauge = "0x6666666666666666666666666666666666666666"
reward_token = "0xd533a949740bb3306d119cc777fa900ba034cd52"

[[risk_profiles]]
name = "RP1"
min_rating = 0
max_rating = 10
"#;

    #[test]
    fn test_bootstrap_wires_everything() {
        let config = parse_config(CONFIG).unwrap();
        let registry = Registry::from_config(&config).unwrap();

        assert_eq!(registry.pools().len(), 3);
        assert!(registry.has_role(
            Role::RiskOperator,
            address!("0000000000000000000000000000000000000002")
        ));

        let lending = registry
            .binding(address!("2222222222222222222222222222222222222222"))
            .unwrap();
        assert!(lending.adapter.has(Capability::Borrow));
        assert!(!lending.adapter.has(Capability::Stake));

        let curve_pool = address!("4444444444444444444444444444444444444444");
        let curve = registry.binding(curve_pool).unwrap();
        assert!(curve.stake);
        assert!(curve.adapter.has(Capability::Rewards));
        assert_eq!(curve.caps.pool_percentage(curve_pool), Some(250));
        assert_eq!(curve.caps.protocol_percentage(), 500);

        assert!(registry.risk_profile("RP1").is_some());
    }

    #[test]
    fn test_bootstrap_bundled_config() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml");
        let config = crate::config::loader::load_config(path).unwrap();
        let registry = Registry::from_config(&config).unwrap();
        assert_eq!(registry.pools().len(), config.pools.len());
        assert!(registry.risk_profile("aggressive").is_some_and(|p| p.can_borrow));
    }

    #[test]
    fn test_bootstrap_rejects_stake_without_gauge() {
        let broken = CONFIG.replace(
            "gauge = \"0x6666666666666666666666666666666666666666\"\n",
            "",
        );
        let config = parse_config(&broken).unwrap();
        assert!(Registry::from_config(&config).is_err());
    }
}
