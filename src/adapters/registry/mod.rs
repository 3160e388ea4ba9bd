//! Registry - Role-checked In-memory Configuration Store
//!
//! Holds adapters, pools and their risk metadata, adapter bindings,
//! deposit caps, registered strategies, risk profiles, strategy
//! overrides and default-strategy states. Every privileged mutation
//! takes the caller's address and checks its role; the governance
//! account implicitly holds every role.
//!
//! Registered strategies, overrides and default states can be exported
//! to a [`RegistrySnapshot`] and restored after a restart.

pub mod bootstrap;

use std::collections::{BTreeMap, BTreeSet};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::deposit_cap::{DepositCapMode, DepositCapPolicy};
use crate::domain::error::{AllocationError, AllocationResult, Role};
use crate::domain::risk::{
    DefaultStrategyState, MAX_POOL_RATING, PoolRecord, RatingRange, RiskProfile,
};
use crate::domain::strategy::{Strategy, StrategyHash, TokenHash, token_hash};
use crate::domain::types::{Amount, Asset, Pool};
use crate::ports::config_store::{ConfigStore, PoolBinding, SelectionStore};
use crate::ports::protocol_adapter::AdapterHandle;

#[derive(Debug, Clone)]
struct Binding {
    protocol: String,
    stake: bool,
}

/// Persisted best-strategy override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideEntry {
    pub profile: String,
    pub token_hash: TokenHash,
    pub strategy: StrategyHash,
}

/// Persisted default-strategy state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultStateEntry {
    pub profile: String,
    pub token_hash: TokenHash,
    pub state: DefaultStrategyState,
}

/// Restart-surviving part of the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub strategies: Vec<Strategy>,
    pub overrides: Vec<OverrideEntry>,
    pub defaults: Vec<DefaultStateEntry>,
}

/// In-memory configuration store.
#[derive(Debug)]
pub struct Registry {
    governance: Address,
    roles: BTreeMap<Role, BTreeSet<Address>>,
    adapters: BTreeMap<String, AdapterHandle>,
    caps: BTreeMap<String, DepositCapPolicy>,
    pools: BTreeMap<Pool, PoolRecord>,
    next_registration: u64,
    bindings: BTreeMap<Pool, Binding>,
    strategies: BTreeMap<StrategyHash, Strategy>,
    profiles: BTreeMap<String, RiskProfile>,
    overrides: BTreeMap<(String, TokenHash), StrategyHash>,
    defaults: BTreeMap<(String, TokenHash), DefaultStrategyState>,
}

impl Registry {
    pub fn new(governance: Address) -> Self {
        Self {
            governance,
            roles: BTreeMap::new(),
            adapters: BTreeMap::new(),
            caps: BTreeMap::new(),
            pools: BTreeMap::new(),
            next_registration: 0,
            bindings: BTreeMap::new(),
            strategies: BTreeMap::new(),
            profiles: BTreeMap::new(),
            overrides: BTreeMap::new(),
            defaults: BTreeMap::new(),
        }
    }

    pub const fn governance(&self) -> Address {
        self.governance
    }

    pub fn has_role(&self, role: Role, account: Address) -> bool {
        account == self.governance
            || self.roles.get(&role).is_some_and(|set| set.contains(&account))
    }

    fn require(&self, role: Role, caller: Address) -> AllocationResult<()> {
        if self.has_role(role, caller) {
            Ok(())
        } else {
            Err(AllocationError::Unauthorized {
                account: caller,
                role,
            })
        }
    }

    pub fn grant_role(
        &mut self,
        caller: Address,
        role: Role,
        account: Address,
    ) -> AllocationResult<()> {
        self.require(Role::Governance, caller)?;
        self.roles.entry(role).or_default().insert(account);
        info!(role = %role, account = %account, "Role granted");
        Ok(())
    }

    pub fn revoke_role(
        &mut self,
        caller: Address,
        role: Role,
        account: Address,
    ) -> AllocationResult<()> {
        self.require(Role::Governance, caller)?;
        if let Some(set) = self.roles.get_mut(&role) {
            set.remove(&account);
        }
        info!(role = %role, account = %account, "Role revoked");
        Ok(())
    }

    // ── Adapters and pools ──────────────────────────────────

    pub fn register_adapter(
        &mut self,
        caller: Address,
        handle: AdapterHandle,
    ) -> AllocationResult<()> {
        self.require(Role::Governance, caller)?;
        let id = handle.protocol_id().to_string();
        if self.adapters.contains_key(&id) {
            return Err(AllocationError::DuplicateAdapter(id));
        }
        info!(protocol = %id, adapter = ?handle, "Adapter registered");
        self.adapters.insert(id, handle);
        Ok(())
    }

    /// Register `pool` unrated and unapproved. Re-adding is a no-op.
    pub fn add_pool(&mut self, caller: Address, pool: Pool) -> AllocationResult<PoolRecord> {
        self.require(Role::RiskOperator, caller)?;
        if let Some(existing) = self.pools.get(&pool) {
            return Ok(*existing);
        }
        let record = PoolRecord {
            pool,
            rating: None,
            approved: false,
            registration: self.next_registration,
        };
        self.next_registration += 1;
        self.pools.insert(pool, record);
        debug!(pool = %pool, registration = record.registration, "Pool added");
        Ok(record)
    }

    fn pool_mut(&mut self, pool: Pool) -> AllocationResult<&mut PoolRecord> {
        self.pools
            .get_mut(&pool)
            .ok_or(AllocationError::UnknownPool(pool))
    }

    pub fn set_pool_rating(
        &mut self,
        caller: Address,
        pool: Pool,
        rating: Option<u8>,
    ) -> AllocationResult<()> {
        self.require(Role::RiskOperator, caller)?;
        if let Some(r) = rating.filter(|r| *r > MAX_POOL_RATING) {
            return Err(AllocationError::InvalidRating(r));
        }
        self.pool_mut(pool)?.rating = rating;
        info!(pool = %pool, rating = ?rating, "Pool rating set");
        Ok(())
    }

    pub fn set_pool_approval(
        &mut self,
        caller: Address,
        pool: Pool,
        approved: bool,
    ) -> AllocationResult<()> {
        self.require(Role::RiskOperator, caller)?;
        self.pool_mut(pool)?.approved = approved;
        info!(pool = %pool, approved, "Pool approval set");
        Ok(())
    }

    /// Bind `pool` to a registered adapter. Staking is elected here and
    /// requires the adapter's staking capability for that pool.
    pub fn bind_pool(
        &mut self,
        caller: Address,
        pool: Pool,
        protocol: &str,
        stake: bool,
    ) -> AllocationResult<()> {
        self.require(Role::Governance, caller)?;
        if !self.pools.contains_key(&pool) {
            return Err(AllocationError::UnknownPool(pool));
        }
        let handle = self
            .adapters
            .get(protocol)
            .ok_or_else(|| AllocationError::UnknownAdapter(protocol.to_string()))?;
        handle.base().underlying_tokens(pool)?;
        if stake && !handle.stakeable()?.can_stake(pool) {
            return Err(AllocationError::StakingUnavailable(pool));
        }
        self.bindings.insert(
            pool,
            Binding {
                protocol: protocol.to_string(),
                stake,
            },
        );
        info!(pool = %pool, protocol, stake, "Pool bound to adapter");
        Ok(())
    }

    // ── Deposit caps ────────────────────────────────────────

    fn caps_mut(&mut self, caller: Address, protocol: &str) -> AllocationResult<&mut DepositCapPolicy> {
        self.require(Role::FinanceOperator, caller)?;
        if !self.adapters.contains_key(protocol) {
            return Err(AllocationError::UnknownAdapter(protocol.to_string()));
        }
        Ok(self.caps.entry(protocol.to_string()).or_default())
    }

    pub fn set_deposit_cap_mode(
        &mut self,
        caller: Address,
        protocol: &str,
        mode: DepositCapMode,
    ) -> AllocationResult<()> {
        self.caps_mut(caller, protocol)?.set_mode(mode);
        info!(protocol, mode = ?mode, "Deposit cap mode set");
        Ok(())
    }

    pub fn set_protocol_deposit_percentage(
        &mut self,
        caller: Address,
        protocol: &str,
        bps: u16,
    ) -> AllocationResult<()> {
        self.caps_mut(caller, protocol)?.set_protocol_percentage(bps)?;
        info!(protocol, bps, "Protocol deposit percentage set");
        Ok(())
    }

    pub fn set_pool_deposit_percentage(
        &mut self,
        caller: Address,
        protocol: &str,
        pool: Pool,
        bps: u16,
    ) -> AllocationResult<()> {
        self.caps_mut(caller, protocol)?.set_pool_percentage(pool, bps)?;
        info!(protocol, pool = %pool, bps, "Pool deposit percentage set");
        Ok(())
    }

    pub fn set_deposit_cap_amount(
        &mut self,
        caller: Address,
        protocol: &str,
        pool: Pool,
        asset: Asset,
        amount: Amount,
    ) -> AllocationResult<()> {
        self.caps_mut(caller, protocol)?.set_amount(pool, asset, amount);
        info!(protocol, pool = %pool, asset = %asset, amount = %amount, "Deposit cap amount set");
        Ok(())
    }

    // ── Risk profiles and strategies ────────────────────────

    pub fn create_risk_profile(
        &mut self,
        caller: Address,
        name: &str,
        can_borrow: bool,
        min_rating: u8,
        max_rating: u8,
    ) -> AllocationResult<()> {
        self.require(Role::RiskOperator, caller)?;
        if self.profiles.contains_key(name) {
            return Err(AllocationError::DuplicateRiskProfile(name.to_string()));
        }
        let profile = RiskProfile {
            name: name.to_string(),
            can_borrow,
            rating_range: RatingRange::new(min_rating, max_rating)?,
        };
        info!(profile = name, can_borrow, min_rating, max_rating, "Risk profile created");
        self.profiles.insert(name.to_string(), profile);
        Ok(())
    }

    /// The rating range is the only mutable part of a profile.
    pub fn set_risk_profile_range(
        &mut self,
        caller: Address,
        name: &str,
        min_rating: u8,
        max_rating: u8,
    ) -> AllocationResult<()> {
        self.require(Role::RiskOperator, caller)?;
        let range = RatingRange::new(min_rating, max_rating)?;
        let profile = self
            .profiles
            .get_mut(name)
            .ok_or_else(|| AllocationError::UnknownRiskProfile(name.to_string()))?;
        profile.rating_range = range;
        info!(profile = name, min_rating, max_rating, "Risk profile range updated");
        Ok(())
    }

    pub fn add_strategy(
        &mut self,
        caller: Address,
        strategy: Strategy,
    ) -> AllocationResult<StrategyHash> {
        self.require(Role::StrategyOperator, caller)?;
        Ok(self.insert_strategy(strategy))
    }

    fn insert_strategy(&mut self, strategy: Strategy) -> StrategyHash {
        let hash = strategy.hash();
        if !self.strategies.contains_key(&hash) {
            debug!(strategy = %hash, steps = strategy.len(), "Strategy registered");
            self.strategies.insert(hash, strategy);
        }
        hash
    }

    /// Set or clear the explicit strategy of `(profile, asset)`.
    pub fn set_best_strategy_override(
        &mut self,
        caller: Address,
        profile: &str,
        asset: Asset,
        strategy: Option<StrategyHash>,
    ) -> AllocationResult<()> {
        self.require(Role::StrategyOperator, caller)?;
        let risk_profile = self
            .profiles
            .get(profile)
            .ok_or_else(|| AllocationError::UnknownRiskProfile(profile.to_string()))?;
        let key = (profile.to_string(), token_hash(&[asset]));

        let Some(hash) = strategy else {
            self.overrides.remove(&key);
            info!(profile, asset = %asset, "Strategy override cleared");
            return Ok(());
        };

        let registered = self
            .strategies
            .get(&hash)
            .ok_or(AllocationError::UnknownStrategy(hash))?;
        if registered.underlying() != asset {
            return Err(AllocationError::StrategyMismatch {
                strategy: hash,
                asset,
            });
        }
        if registered.has_borrow() && !risk_profile.can_borrow {
            return Err(AllocationError::BorrowNotAllowed {
                profile: profile.to_string(),
                strategy: hash,
            });
        }
        self.overrides.insert(key, hash);
        info!(profile, asset = %asset, strategy = %hash, "Strategy override set");
        Ok(())
    }

    fn transition_default(
        &mut self,
        caller: Address,
        profile: &str,
        asset: Asset,
        pause: bool,
    ) -> AllocationResult<()> {
        self.require(Role::StrategyOperator, caller)?;
        if !self.profiles.contains_key(profile) {
            return Err(AllocationError::UnknownRiskProfile(profile.to_string()));
        }
        let key = (profile.to_string(), token_hash(&[asset]));
        let current = self.defaults.get(&key).copied().unwrap_or_default();
        let next = if pause {
            current.pause()?
        } else {
            current.resume()?
        };
        self.defaults.insert(key, next);
        info!(profile, asset = %asset, paused = pause, "Default strategy state changed");
        Ok(())
    }

    /// Freeze the rating-based default at its cached strategy.
    pub fn pause_default_strategy(
        &mut self,
        caller: Address,
        profile: &str,
        asset: Asset,
    ) -> AllocationResult<()> {
        self.transition_default(caller, profile, asset, true)
    }

    pub fn resume_default_strategy(
        &mut self,
        caller: Address,
        profile: &str,
        asset: Asset,
    ) -> AllocationResult<()> {
        self.transition_default(caller, profile, asset, false)
    }

    // ── Persistence ─────────────────────────────────────────

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            strategies: self.strategies.values().cloned().collect(),
            overrides: self
                .overrides
                .iter()
                .map(|((profile, token_hash), strategy)| OverrideEntry {
                    profile: profile.clone(),
                    token_hash: *token_hash,
                    strategy: *strategy,
                })
                .collect(),
            defaults: self
                .defaults
                .iter()
                .map(|((profile, token_hash), state)| DefaultStateEntry {
                    profile: profile.clone(),
                    token_hash: *token_hash,
                    state: *state,
                })
                .collect(),
        }
    }

    /// Reload persisted strategies and selections. Entries for unknown
    /// profiles or strategies are dropped.
    pub fn restore(&mut self, snapshot: RegistrySnapshot) -> usize {
        for strategy in snapshot.strategies {
            self.insert_strategy(strategy);
        }
        let mut dropped = 0;
        for entry in snapshot.overrides {
            if self.profiles.contains_key(&entry.profile)
                && self.strategies.contains_key(&entry.strategy)
            {
                self.overrides
                    .insert((entry.profile, entry.token_hash), entry.strategy);
            } else {
                dropped += 1;
            }
        }
        for entry in snapshot.defaults {
            let known = entry
                .state
                .cached()
                .is_none_or(|hash| self.strategies.contains_key(&hash));
            if self.profiles.contains_key(&entry.profile) && known {
                self.defaults
                    .insert((entry.profile, entry.token_hash), entry.state);
            } else {
                dropped += 1;
            }
        }
        info!(
            strategies = self.strategies.len(),
            overrides = self.overrides.len(),
            defaults = self.defaults.len(),
            dropped,
            "Registry state restored"
        );
        dropped
    }

    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }
}

impl ConfigStore for Registry {
    fn pool(&self, pool: Pool) -> Option<PoolRecord> {
        self.pools.get(&pool).copied()
    }

    fn pools(&self) -> Vec<PoolRecord> {
        let mut pools: Vec<PoolRecord> = self.pools.values().copied().collect();
        pools.sort_by_key(|p| p.registration);
        pools
    }

    fn binding(&self, pool: Pool) -> Option<PoolBinding> {
        let binding = self.bindings.get(&pool)?;
        let adapter = self.adapters.get(&binding.protocol)?.clone();
        Some(PoolBinding {
            adapter,
            stake: binding.stake,
            caps: self.caps.get(&binding.protocol).cloned().unwrap_or_default(),
        })
    }

    fn strategy(&self, hash: &StrategyHash) -> Option<Strategy> {
        self.strategies.get(hash).cloned()
    }

    fn risk_profile(&self, name: &str) -> Option<RiskProfile> {
        self.profiles.get(name).cloned()
    }

    fn best_strategy_override(&self, profile: &str, token_hash: &TokenHash) -> Option<StrategyHash> {
        self.overrides
            .get(&(profile.to_string(), *token_hash))
            .copied()
    }

    fn default_strategy_state(&self, profile: &str, token_hash: &TokenHash) -> DefaultStrategyState {
        self.defaults
            .get(&(profile.to_string(), *token_hash))
            .copied()
            .unwrap_or_default()
    }
}

impl SelectionStore for Registry {
    fn register_strategy(&mut self, strategy: Strategy) -> StrategyHash {
        self.insert_strategy(strategy)
    }

    fn cache_default_strategy(&mut self, profile: &str, token_hash: TokenHash, hash: StrategyHash) {
        let entry = self
            .defaults
            .entry((profile.to_string(), token_hash))
            .or_default();
        *entry = entry.cache(hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use alloy::primitives::{B256, address};

    use crate::adapters::protocols::{CurveAdapter, CurvePool, Erc4626Adapter, SwapRouter};

    const GOV: Address = address!("0000000000000000000000000000000000000001");
    const RISK: Address = address!("0000000000000000000000000000000000000002");
    const STRANGER: Address = address!("0000000000000000000000000000000000000003");
    const USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    const DAI: Address = address!("6b175474e89094c44da98b954eedeac495271d0f");
    const VAULT: Address = address!("1111111111111111111111111111111111111111");
    const CURVE_POOL: Address = address!("2222222222222222222222222222222222222222");
    const CURVE_LP: Address = address!("3333333333333333333333333333333333333333");

    fn registry() -> Registry {
        let mut r = Registry::new(GOV);
        let vaults = Arc::new(Erc4626Adapter::new("vaults").with_vault(VAULT, USDC));
        r.register_adapter(GOV, AdapterHandle::new(vaults)).unwrap();
        let curve = Arc::new(
            CurveAdapter::new("curve", SwapRouter::new(Address::ZERO, 0), 0).with_pool(
                CURVE_POOL,
                CurvePool {
                    coins: vec![USDC, DAI],
                    lp_token: CURVE_LP,
                    gauge: None,
                    reward_token: None,
                },
            ),
        );
        r.register_adapter(GOV, AdapterHandle::new(curve.clone()).with_staking(curve))
            .unwrap();
        r.grant_role(GOV, Role::RiskOperator, RISK).unwrap();
        r
    }

    #[test]
    fn test_roles_are_enforced() {
        let mut r = registry();
        assert!(matches!(
            r.add_pool(STRANGER, VAULT),
            Err(AllocationError::Unauthorized { role: Role::RiskOperator, .. })
        ));
        assert!(r.add_pool(RISK, VAULT).is_ok());
        assert!(matches!(
            r.bind_pool(RISK, VAULT, "vaults", false),
            Err(AllocationError::Unauthorized { role: Role::Governance, .. })
        ));
    }

    #[test]
    fn test_pools_keep_registration_order() {
        let mut r = registry();
        r.add_pool(RISK, CURVE_POOL).unwrap();
        r.add_pool(RISK, VAULT).unwrap();
        r.add_pool(RISK, CURVE_POOL).unwrap();
        let order: Vec<_> = r.pools().iter().map(|p| p.pool).collect();
        assert_eq!(order, vec![CURVE_POOL, VAULT]);
    }

    #[test]
    fn test_rating_bounds() {
        let mut r = registry();
        r.add_pool(RISK, VAULT).unwrap();
        assert_eq!(
            r.set_pool_rating(RISK, VAULT, Some(101)),
            Err(AllocationError::InvalidRating(101))
        );
        r.set_pool_rating(RISK, VAULT, Some(100)).unwrap();
        assert_eq!(r.pool(VAULT).unwrap().rating, Some(100));
    }

    #[test]
    fn test_bind_validates_pool_and_staking() {
        let mut r = registry();
        r.add_pool(RISK, VAULT).unwrap();
        r.add_pool(RISK, CURVE_POOL).unwrap();
        assert!(matches!(
            r.bind_pool(GOV, VAULT, "curve", false),
            Err(AllocationError::PoolNotConfigured { .. })
        ));
        assert!(matches!(
            r.bind_pool(GOV, VAULT, "vaults", true),
            Err(AllocationError::CapabilityMissing { .. })
        ));
        // curve pool has no gauge
        assert_eq!(
            r.bind_pool(GOV, CURVE_POOL, "curve", true),
            Err(AllocationError::StakingUnavailable(CURVE_POOL))
        );
        r.bind_pool(GOV, VAULT, "vaults", false).unwrap();
        assert!(r.binding(VAULT).is_some());
    }

    #[test]
    fn test_profile_is_unique_and_range_mutable() {
        let mut r = registry();
        r.create_risk_profile(RISK, "RP1", false, 0, 10).unwrap();
        assert_eq!(
            r.create_risk_profile(RISK, "RP1", true, 0, 50),
            Err(AllocationError::DuplicateRiskProfile("RP1".into()))
        );
        r.set_risk_profile_range(RISK, "RP1", 5, 20).unwrap();
        let profile = r.risk_profile("RP1").unwrap();
        assert_eq!(profile.rating_range, RatingRange::new(5, 20).unwrap());
        assert!(!profile.can_borrow);
    }

    #[test]
    fn test_override_validation() {
        let mut r = registry();
        r.create_risk_profile(RISK, "RP1", false, 0, 10).unwrap();
        let plain = r
            .add_strategy(GOV, Strategy::single(USDC, VAULT, VAULT).unwrap())
            .unwrap();
        let borrowing = r
            .add_strategy(
                GOV,
                Strategy::new(
                    USDC,
                    vec![crate::domain::strategy::StrategyStep::new(VAULT, DAI, true)],
                )
                .unwrap(),
            )
            .unwrap();

        assert!(matches!(
            r.set_best_strategy_override(GOV, "RP1", USDC, Some(B256::repeat_byte(9))),
            Err(AllocationError::UnknownStrategy(_))
        ));
        assert!(matches!(
            r.set_best_strategy_override(GOV, "RP1", DAI, Some(plain)),
            Err(AllocationError::StrategyMismatch { .. })
        ));
        assert!(matches!(
            r.set_best_strategy_override(GOV, "RP1", USDC, Some(borrowing)),
            Err(AllocationError::BorrowNotAllowed { .. })
        ));
        r.set_best_strategy_override(GOV, "RP1", USDC, Some(plain)).unwrap();
        assert_eq!(
            r.best_strategy_override("RP1", &token_hash(&[USDC])),
            Some(plain)
        );
        r.set_best_strategy_override(GOV, "RP1", USDC, None).unwrap();
        assert_eq!(r.best_strategy_override("RP1", &token_hash(&[USDC])), None);
    }

    #[test]
    fn test_pause_requires_computed_default() {
        let mut r = registry();
        r.create_risk_profile(RISK, "RP1", false, 0, 10).unwrap();
        assert!(matches!(
            r.pause_default_strategy(GOV, "RP1", USDC),
            Err(AllocationError::InvalidTransition(_))
        ));
        let hash = r.register_strategy(Strategy::single(USDC, VAULT, VAULT).unwrap());
        r.cache_default_strategy("RP1", token_hash(&[USDC]), hash);
        r.pause_default_strategy(GOV, "RP1", USDC).unwrap();
        assert!(r.default_strategy_state("RP1", &token_hash(&[USDC])).is_paused());
    }

    #[test]
    fn test_caps_require_finance_role_and_known_protocol() {
        let mut r = registry();
        assert!(matches!(
            r.set_protocol_deposit_percentage(RISK, "vaults", 100),
            Err(AllocationError::Unauthorized { role: Role::FinanceOperator, .. })
        ));
        assert!(matches!(
            r.set_protocol_deposit_percentage(GOV, "nope", 100),
            Err(AllocationError::UnknownAdapter(_))
        ));
        r.set_deposit_cap_mode(GOV, "vaults", DepositCapMode::ProtocolPercentage)
            .unwrap();
        r.set_protocol_deposit_percentage(GOV, "vaults", 100).unwrap();
    }

    #[test]
    fn test_snapshot_restore() {
        let mut r = registry();
        r.create_risk_profile(RISK, "RP1", false, 0, 10).unwrap();
        let hash = r.register_strategy(Strategy::single(USDC, VAULT, VAULT).unwrap());
        r.set_best_strategy_override(GOV, "RP1", USDC, Some(hash)).unwrap();
        r.cache_default_strategy("RP1", token_hash(&[USDC]), hash);
        let snapshot = r.snapshot();

        let mut fresh = registry();
        fresh.create_risk_profile(RISK, "RP1", false, 0, 10).unwrap();
        assert_eq!(fresh.restore(snapshot.clone()), 0);
        assert_eq!(fresh.snapshot(), snapshot);

        // profile missing: selections dropped, strategies kept
        let mut bare = registry();
        assert_eq!(bare.restore(snapshot), 2);
        assert_eq!(bare.strategy_count(), 1);
    }
}
