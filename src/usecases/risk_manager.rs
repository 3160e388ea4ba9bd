//! Risk Manager - Best Strategy Selection per Risk Profile
//!
//! Resolves which strategy a `(risk profile, asset)` vault should run:
//! 1. An explicit override set by a strategy operator wins
//! 2. A paused default keeps returning its cached strategy
//! 3. Otherwise the best-rated approved pool inside the profile's
//!    rating range becomes a single-step default strategy, which is
//!    registered and cached
//!
//! Ties on rating go to the pool registered first.

use std::cmp::Reverse;

use alloy::primitives::Address;
use tracing::{debug, info, instrument, warn};

use crate::domain::error::{AllocationError, AllocationResult};
use crate::domain::risk::{
  DefaultStrategyState, PoolRecord, RiskProfile, SelectionSource, StrategySelection,
};
use crate::domain::strategy::{Strategy, token_hash};
use crate::domain::types::Asset;
use crate::ports::config_store::SelectionStore;

/// A pool that may back a rating-based default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
  pub record: PoolRecord,
  /// Receipt token the pool mints for the asset.
  pub receipt: Address,
}

/// Strategy selector over a configuration store.
pub struct RiskManager<'a, S: SelectionStore + ?Sized> {
  store: &'a mut S,
}

impl<'a, S: SelectionStore + ?Sized> RiskManager<'a, S> {
  pub fn new(store: &'a mut S) -> Self {
    Self { store }
  }

  fn profile(&self, name: &str) -> AllocationResult<RiskProfile> {
    self
      .store
      .risk_profile(name)
      .ok_or_else(|| AllocationError::UnknownRiskProfile(name.to_string()))
  }

  /// Eligible pools for `asset` under `profile`, best first.
  pub fn rank_pools(&self, profile: &RiskProfile, asset: Asset) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = self
      .store
      .pools()
      .into_iter()
      .filter(|record| profile.admits(record))
      .filter_map(|record| {
        let binding = self.store.binding(record.pool)?;
        let base = binding.adapter.base();
        if !base.accepts(record.pool, asset) {
          return None;
        }
        let receipt = base.liquidity_pool_token(asset, record.pool).ok()?;
        Some(Candidate { record, receipt })
      })
      .collect();

    candidates.sort_by_key(|c| (Reverse(c.record.rating), c.record.registration));
    candidates
  }

  /// Hash of the strategy `profile` should run for `asset`.
  #[instrument(skip(self), fields(asset = %asset))]
  pub fn best_strategy(
    &mut self,
    profile: &str,
    asset: Asset,
  ) -> AllocationResult<StrategySelection> {
    let risk_profile = self.profile(profile)?;
    let key = token_hash(&[asset]);

    if let Some(hash) = self.store.best_strategy_override(profile, &key) {
      debug!(strategy = %hash, "Using strategy override");
      return Ok(StrategySelection {
        hash,
        source: SelectionSource::Override,
      });
    }

    if let DefaultStrategyState::RatingBased {
      paused: true,
      cached,
    } = self.store.default_strategy_state(profile, &key)
    {
      debug!(strategy = %cached, "Default strategy paused, using cached");
      return Ok(StrategySelection {
        hash: cached,
        source: SelectionSource::CachedDefault,
      });
    }

    let Some(best) = self.rank_pools(&risk_profile, asset).into_iter().next() else {
      warn!(profile, "No eligible pool for rating-based default");
      return Err(AllocationError::NoEligibleStrategy {
        profile: profile.to_string(),
        asset,
      });
    };

    let strategy = Strategy::single(asset, best.record.pool, best.receipt)?;
    let hash = self.store.register_strategy(strategy);
    let previous = self.store.default_strategy_state(profile, &key).cached();
    self.store.cache_default_strategy(profile, key, hash);

    if previous != Some(hash) {
      info!(
        profile,
        pool = %best.record.pool,
        rating = ?best.record.rating,
        strategy = %hash,
        "Rating-based default strategy changed"
      );
    }

    Ok(StrategySelection {
      hash,
      source: SelectionSource::RatingBased,
    })
  }
}
