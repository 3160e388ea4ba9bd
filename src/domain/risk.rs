//! Risk Domain - Pool Ratings, Risk Profiles and Default Strategy State
//!
//! Pools carry an optional rating (0..=100) and an approval flag set by
//! risk operators. A risk profile filters pools by an inclusive rating
//! range and decides whether borrowing strategies are acceptable.
//!
//! The default strategy of a `(profile, token hash)` pair follows
//!
//! ```text
//! Unset --cache--> RatingBased{active} <--pause/resume--> RatingBased{paused}
//! ```
//!
//! and pausing an `Unset` default is rejected.

use serde::{Deserialize, Serialize};

use super::error::{AllocationError, AllocationResult};
use super::strategy::StrategyHash;
use super::types::Pool;

/// Highest rating a pool can carry.
pub const MAX_POOL_RATING: u8 = 100;

/// Risk metadata of a registered pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRecord {
    pub pool: Pool,
    /// `None` until a risk operator rates the pool.
    pub rating: Option<u8>,
    pub approved: bool,
    /// Registration order, used to break rating ties.
    pub registration: u64,
}

impl PoolRecord {
    pub const fn is_rated(&self) -> bool {
        self.rating.is_some()
    }
}

/// Inclusive rating window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRange {
    pub min: u8,
    pub max: u8,
}

impl RatingRange {
    pub fn new(min: u8, max: u8) -> AllocationResult<Self> {
        if min > max || max > MAX_POOL_RATING {
            return Err(AllocationError::InvalidRatingRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub const fn contains(&self, rating: u8) -> bool {
        rating >= self.min && rating <= self.max
    }
}

/// Named risk tolerance policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub name: String,
    pub can_borrow: bool,
    pub rating_range: RatingRange,
}

impl RiskProfile {
    /// Whether a pool in `record` may back a default strategy.
    pub fn admits(&self, record: &PoolRecord) -> bool {
        record.approved && record.rating.is_some_and(|r| self.rating_range.contains(r))
    }
}

/// Default-strategy state of one `(profile, token hash)` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DefaultStrategyState {
    #[default]
    Unset,
    RatingBased {
        paused: bool,
        cached: StrategyHash,
    },
}

impl DefaultStrategyState {
    pub const fn cached(&self) -> Option<StrategyHash> {
        match self {
            Self::Unset => None,
            Self::RatingBased { cached, .. } => Some(*cached),
        }
    }

    pub const fn is_paused(&self) -> bool {
        matches!(self, Self::RatingBased { paused: true, .. })
    }

    /// Record a freshly computed default. A paused default keeps its
    /// cached hash.
    #[must_use]
    pub const fn cache(self, hash: StrategyHash) -> Self {
        match self {
            Self::RatingBased { paused: true, .. } => self,
            _ => Self::RatingBased {
                paused: false,
                cached: hash,
            },
        }
    }

    pub fn pause(self) -> AllocationResult<Self> {
        match self {
            Self::Unset => Err(AllocationError::InvalidTransition(
                "cannot pause a default strategy that was never computed".into(),
            )),
            Self::RatingBased { cached, .. } => Ok(Self::RatingBased {
                paused: true,
                cached,
            }),
        }
    }

    pub fn resume(self) -> AllocationResult<Self> {
        match self {
            Self::Unset => Err(AllocationError::InvalidTransition(
                "cannot resume a default strategy that was never computed".into(),
            )),
            Self::RatingBased { cached, .. } => Ok(Self::RatingBased {
                paused: false,
                cached,
            }),
        }
    }
}

/// Where a selected strategy came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionSource {
    Override,
    CachedDefault,
    RatingBased,
}

impl SelectionSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Override => "override",
            Self::CachedDefault => "cached_default",
            Self::RatingBased => "rating_based",
        }
    }
}

/// Result of a best-strategy lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySelection {
    pub hash: StrategyHash,
    pub source: SelectionSource,
}
