//! Strategy Model - Ordered Allocation Steps and Content Hashing
//!
//! A strategy is a non-empty chain of steps. Step `i` consumes the
//! output asset of step `i - 1` (the strategy's underlying asset for
//! step 0). Identity is the keccak-256 digest of the canonical ABI
//! encoding of `(underlying, (pool, output, is_borrow)[])`, so equal
//! step lists are the same strategy and a hash never changes.

use alloy::primitives::{Address, B256, keccak256};
use alloy::sol_types::SolValue;
use serde::{Deserialize, Serialize};

use super::error::{AllocationError, AllocationResult};
use super::types::{Asset, Pool};

/// Content hash identifying a strategy.
pub type StrategyHash = B256;

/// Hash of an ordered token list (vault key for selections).
pub type TokenHash = B256;

/// One hop of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrategyStep {
    /// Pool the input asset is deposited into.
    pub pool: Pool,
    /// Asset this step yields: the pool's receipt token, or the
    /// borrowed asset for borrow steps.
    pub output_asset: Asset,
    /// Whether the step borrows `output_asset` against its deposit.
    #[serde(default)]
    pub is_borrow: bool,
}

impl StrategyStep {
    pub const fn new(pool: Pool, output_asset: Asset, is_borrow: bool) -> Self {
        Self {
            pool,
            output_asset,
            is_borrow,
        }
    }
}

/// Serialized form; the hash is always recomputed on load.
#[derive(Deserialize)]
struct StrategyDef {
    underlying: Asset,
    steps: Vec<StrategyStep>,
}

/// Immutable, content-addressed allocation plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StrategyDef")]
pub struct Strategy {
    underlying: Asset,
    steps: Vec<StrategyStep>,
    hash: StrategyHash,
}

impl TryFrom<StrategyDef> for Strategy {
    type Error = AllocationError;

    fn try_from(def: StrategyDef) -> Result<Self, Self::Error> {
        Self::new(def.underlying, def.steps)
    }
}

impl Strategy {
    /// Build a strategy, computing its hash.
    pub fn new(underlying: Asset, steps: Vec<StrategyStep>) -> AllocationResult<Self> {
        if steps.is_empty() {
            return Err(AllocationError::InvalidStrategy(
                "strategy needs at least one step".into(),
            ));
        }
        if underlying == Address::ZERO {
            return Err(AllocationError::InvalidStrategy(
                "underlying asset is the zero address".into(),
            ));
        }
        let hash = compute_hash(underlying, &steps);
        Ok(Self {
            underlying,
            steps,
            hash,
        })
    }

    /// Single deposit into `pool`, yielding its receipt token.
    pub fn single(underlying: Asset, pool: Pool, receipt: Asset) -> AllocationResult<Self> {
        Self::new(underlying, vec![StrategyStep::new(pool, receipt, false)])
    }

    pub const fn underlying(&self) -> Asset {
        self.underlying
    }

    pub fn steps(&self) -> &[StrategyStep] {
        &self.steps
    }

    pub const fn hash(&self) -> StrategyHash {
        self.hash
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn borrow_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.is_borrow).count()
    }

    pub fn has_borrow(&self) -> bool {
        self.steps.iter().any(|s| s.is_borrow)
    }

    /// Input asset of step `index`.
    pub fn input_of(&self, index: usize) -> Option<Asset> {
        match index {
            0 => Some(self.underlying),
            i if i < self.steps.len() => Some(self.steps[i - 1].output_asset),
            _ => None,
        }
    }

    /// Final step.
    pub fn last(&self) -> &StrategyStep {
        // non-empty by construction
        &self.steps[self.steps.len() - 1]
    }
}

/// keccak-256 over the ABI encoding of `(underlying, steps[])`.
pub fn compute_hash(underlying: Asset, steps: &[StrategyStep]) -> StrategyHash {
    let encoded: Vec<(Address, Address, bool)> = steps
        .iter()
        .map(|s| (s.pool, s.output_asset, s.is_borrow))
        .collect();
    keccak256((underlying, encoded).abi_encode())
}

/// keccak-256 over the packed 20-byte addresses of `tokens`.
pub fn token_hash(tokens: &[Asset]) -> TokenHash {
    let mut packed = Vec::with_capacity(tokens.len() * 20);
    for token in tokens {
        packed.extend_from_slice(token.as_slice());
    }
    keccak256(packed)
}
