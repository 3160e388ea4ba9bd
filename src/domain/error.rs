//! Allocation Errors - Failure Taxonomy of the Compiler and Selector
//!
//! "Nothing to do" is never an error: zero balances and exhausted
//! deposit caps produce empty instruction groups. Every variant here
//! aborts the whole request; no partial plan is ever returned.

use alloy::primitives::Address;
use thiserror::Error;

use super::strategy::StrategyHash;
use super::types::{Asset, Pool};

/// Optional adapter capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Stake,
    Rewards,
    Borrow,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Stake => "stake",
            Self::Rewards => "rewards",
            Self::Borrow => "borrow",
        })
    }
}

/// Roles allowed to mutate the configuration store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Governance,
    RiskOperator,
    StrategyOperator,
    FinanceOperator,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Governance => "governance",
            Self::RiskOperator => "risk_operator",
            Self::StrategyOperator => "strategy_operator",
            Self::FinanceOperator => "finance_operator",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error("Adapter {protocol} lacks the {capability} capability")]
    CapabilityMissing {
        protocol: String,
        capability: Capability,
    },

    #[error("No adapter bound to pool {pool}")]
    UnresolvedAdapter { pool: Pool },

    #[error("Pool {pool} is not approved")]
    UnapprovedPool { pool: Pool },

    #[error("No eligible strategy for profile {profile} and asset {asset}")]
    NoEligibleStrategy { profile: String, asset: Asset },

    #[error("Pool {pool} cannot borrow {asset}")]
    UnsupportedBorrowAsset { pool: Pool, asset: Asset },

    #[error("Unknown strategy {0}")]
    UnknownStrategy(StrategyHash),

    #[error("Unknown risk profile: {0}")]
    UnknownRiskProfile(String),

    #[error("Unknown pool {0}")]
    UnknownPool(Pool),

    #[error("Unknown adapter: {0}")]
    UnknownAdapter(String),

    #[error("Adapter already registered: {0}")]
    DuplicateAdapter(String),

    #[error("Risk profile already exists: {0}")]
    DuplicateRiskProfile(String),

    #[error("Pool {pool} is not configured in adapter {protocol}")]
    PoolNotConfigured { protocol: String, pool: Pool },

    #[error("Pool {pool} does not accept asset {asset}")]
    UnsupportedAsset { pool: Pool, asset: Asset },

    #[error("Step {index}: output {actual} does not match receipt token {expected}")]
    StepOutputMismatch {
        index: usize,
        expected: Asset,
        actual: Asset,
    },

    #[error("Invalid strategy: {0}")]
    InvalidStrategy(String),

    #[error("Strategy {strategy} does not allocate {asset}")]
    StrategyMismatch { strategy: StrategyHash, asset: Asset },

    #[error("Profile {profile} may not use borrowing strategy {strategy}")]
    BorrowNotAllowed {
        profile: String,
        strategy: StrategyHash,
    },

    #[error("Pool {0} has no staking support")]
    StakingUnavailable(Pool),

    #[error("Invalid rating range [{min}, {max}]")]
    InvalidRatingRange { min: u8, max: u8 },

    #[error("Invalid pool rating {0}")]
    InvalidRating(u8),

    #[error("Invalid percentage: {0} bps")]
    InvalidPercentage(u32),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("{account} lacks role {role}")]
    Unauthorized { account: Address, role: Role },
}

impl AllocationError {
    /// Stable label used as a metrics dimension.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CapabilityMissing { .. } => "capability_missing",
            Self::UnresolvedAdapter { .. } => "unresolved_adapter",
            Self::UnapprovedPool { .. } => "unapproved_pool",
            Self::NoEligibleStrategy { .. } => "no_eligible_strategy",
            Self::UnsupportedBorrowAsset { .. } => "unsupported_borrow_asset",
            Self::UnknownStrategy(_) => "unknown_strategy",
            Self::UnknownRiskProfile(_) => "unknown_risk_profile",
            Self::UnknownPool(_) => "unknown_pool",
            Self::UnknownAdapter(_) => "unknown_adapter",
            Self::DuplicateAdapter(_) => "duplicate_adapter",
            Self::DuplicateRiskProfile(_) => "duplicate_risk_profile",
            Self::PoolNotConfigured { .. } => "pool_not_configured",
            Self::UnsupportedAsset { .. } => "unsupported_asset",
            Self::StepOutputMismatch { .. } => "step_output_mismatch",
            Self::InvalidStrategy(_) => "invalid_strategy",
            Self::StrategyMismatch { .. } => "strategy_mismatch",
            Self::BorrowNotAllowed { .. } => "borrow_not_allowed",
            Self::StakingUnavailable(_) => "staking_unavailable",
            Self::InvalidRatingRange { .. } => "invalid_rating_range",
            Self::InvalidRating(_) => "invalid_rating",
            Self::InvalidPercentage(_) => "invalid_percentage",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::Unauthorized { .. } => "unauthorized",
        }
    }
}

pub type AllocationResult<T> = Result<T, AllocationError>;
