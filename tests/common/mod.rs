//! Shared fixture for integration tests.
//!
//! One registry wiring three adapter families (ERC-4626 vaults, a
//! lending market, a Curve pool with a gauge) and a chain snapshot with
//! prices for every asset involved.

#![allow(dead_code)]

use std::sync::Arc;

use alloy::primitives::{Address, U256, address};

use yield_allocator::adapters::chain::ChainSnapshot;
use yield_allocator::adapters::protocols::{
    CurveAdapter, CurvePool, Erc4626Adapter, LendingAdapter, LendingMarket, SwapRouter,
};
use yield_allocator::adapters::registry::Registry;
use yield_allocator::ports::protocol_adapter::AdapterHandle;

pub const GOV: Address = address!("000000000000000000000000000000000000a11c");
pub const OWNER: Address = address!("9999999999999999999999999999999999999999");

pub const USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
pub const DAI: Address = address!("6b175474e89094c44da98b954eedeac495271d0f");
pub const CRV: Address = address!("d533a949740bb3306d119cc777fa900ba034cd52");

/// USDC vaults; the vault address is its share token.
pub const P1: Address = address!("1111111111111111111111111111111111111111");
pub const P2: Address = address!("2222222222222222222222222222222222222222");
/// Vault whose asset is `P1` shares.
pub const META: Address = address!("3333333333333333333333333333333333333333");
pub const DAI_VAULT: Address = address!("4444444444444444444444444444444444444444");

pub const LEND: Address = address!("5555555555555555555555555555555555555555");
pub const A_USDC: Address = address!("5555555555555555555555555555555555550001");
pub const LTV_BPS: u16 = 8_000;

pub const CURVE: Address = address!("6666666666666666666666666666666666666666");
pub const CURVE_LP: Address = address!("6666666666666666666666666666666666660001");
pub const GAUGE: Address = address!("6666666666666666666666666666666666660002");
pub const ROUTER: Address = address!("7a250d5630b4cf539739df2c5dacb4c659f2488d");

/// Pool not bound to any adapter.
pub const ORPHAN: Address = address!("8888888888888888888888888888888888888888");

pub fn u(v: u64) -> U256 {
    U256::from(v)
}

pub fn e18(v: u64) -> U256 {
    U256::from(v) * U256::from(10u64).pow(U256::from(18u64))
}

pub fn vaults_adapter() -> AdapterHandle {
    let adapter = Erc4626Adapter::new("vaults")
        .with_vault(P1, USDC)
        .with_vault(P2, USDC)
        .with_vault(META, P1)
        .with_vault(DAI_VAULT, DAI);
    AdapterHandle::new(Arc::new(adapter))
}

pub fn lending_adapter() -> AdapterHandle {
    let adapter = Arc::new(LendingAdapter::new("lend", LTV_BPS).with_market(
        LEND,
        LendingMarket::new()
            .with_reserve(USDC, A_USDC)
            .with_borrowable(DAI),
    ));
    AdapterHandle::new(adapter.clone()).with_borrowing(adapter)
}

pub fn curve_adapter() -> AdapterHandle {
    let adapter = Arc::new(
        CurveAdapter::new("curve", SwapRouter::new(ROUTER, 0), 0).with_pool(
            CURVE,
            CurvePool {
                coins: vec![USDC, DAI],
                lp_token: CURVE_LP,
                gauge: Some(GAUGE),
                reward_token: Some(CRV),
            },
        ),
    );
    AdapterHandle::new(adapter.clone())
        .with_staking(adapter.clone())
        .with_rewards(adapter)
}

/// Every pool added, approved and bound; `P1` rated 5, `P2` rated 12,
/// `CURVE` rated 30. Profiles: `RP1` [0, 10] without borrowing and
/// `LEVERED` [0, 100] with borrowing.
pub fn registry() -> Registry {
    let mut r = Registry::new(GOV);
    r.register_adapter(GOV, vaults_adapter()).unwrap();
    r.register_adapter(GOV, lending_adapter()).unwrap();
    r.register_adapter(GOV, curve_adapter()).unwrap();

    let pools = [
        (P1, "vaults", Some(5), false),
        (P2, "vaults", Some(12), false),
        (META, "vaults", None, false),
        (DAI_VAULT, "vaults", None, false),
        (LEND, "lend", None, false),
        (CURVE, "curve", Some(30), true),
    ];
    for (pool, protocol, rating, stake) in pools {
        r.add_pool(GOV, pool).unwrap();
        r.set_pool_rating(GOV, pool, rating).unwrap();
        r.set_pool_approval(GOV, pool, true).unwrap();
        r.bind_pool(GOV, pool, protocol, stake).unwrap();
    }
    r.add_pool(GOV, ORPHAN).unwrap();

    r.create_risk_profile(GOV, "RP1", false, 0, 10).unwrap();
    r.create_risk_profile(GOV, "LEVERED", true, 0, 100).unwrap();
    r
}

/// Prices for USDC, DAI (1.00) and CRV (2.00); the owner holds 1000 USDC.
pub fn chain() -> ChainSnapshot {
    ChainSnapshot::new()
        .with_price(USDC, e18(1))
        .with_price(DAI, e18(1))
        .with_price(CRV, e18(2))
        .with_balance(USDC, OWNER, u(1_000))
}
