//! Core Types - Assets, Amounts and Compiled Instructions
//!
//! Shared vocabulary of the allocator. Assets and pools are plain
//! 20-byte addresses, amounts are 256-bit base units. Compiled plans
//! are ordered groups of opaque call descriptors handed to an
//! atomic executor.

use std::fmt;

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use super::strategy::StrategyHash;

/// Fungible token identifier.
pub type Asset = Address;

/// External liquidity venue identifier.
pub type Pool = Address;

/// Unsigned 256-bit quantity of base units.
pub type Amount = U256;

/// Basis-point denominator (100% = 10 000 bps).
pub const BPS_DENOMINATOR: u16 = 10_000;

/// Kind of call an instruction performs.
///
/// Executors treat instructions as opaque; the tag exists for
/// logging, plan auditing and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Approve,
    Deposit,
    Withdraw,
    Stake,
    Unstake,
    Borrow,
    Repay,
    Claim,
    Swap,
}

/// One low-level call: target contract, ABI calldata and native value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Contract to call.
    pub target: Address,
    /// ABI-encoded calldata.
    pub calldata: Bytes,
    /// Native value attached to the call.
    pub value: U256,
    /// Call kind, for auditing.
    pub action: Action,
}

impl Instruction {
    /// Build a call that attaches no native value.
    pub fn call(target: Address, calldata: impl Into<Bytes>, action: Action) -> Self {
        Self {
            target,
            calldata: calldata.into(),
            value: U256::ZERO,
            action,
        }
    }
}

/// What a compiled group of instructions accomplishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Deposit,
    Borrow,
    Stake,
    Withdraw,
    UnstakeAndWithdraw,
    Repay,
    Harvest,
    Claim,
}

/// Instructions emitted for one strategy step.
///
/// A group may be empty when the step had nothing to do (zero
/// balance, exhausted cap); it still counts as a compiled step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionGroup {
    /// Index of the strategy step that produced this group.
    pub step_index: usize,
    /// Pool the step targets.
    pub pool: Pool,
    /// What the group does.
    pub kind: GroupKind,
    /// Ordered calls.
    pub instructions: Vec<Instruction>,
}

/// Operation a plan was compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    DepositAll,
    DepositSome,
    WithdrawAll,
    HarvestAll,
    HarvestSome,
    ClaimAll,
    Rebalance,
}

impl Operation {
    /// Stable label used in logs and metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DepositAll => "deposit_all",
            Self::DepositSome => "deposit_some",
            Self::WithdrawAll => "withdraw_all",
            Self::HarvestAll => "harvest_all",
            Self::HarvestSome => "harvest_some",
            Self::ClaimAll => "claim_all",
            Self::Rebalance => "rebalance",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the strategy compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledPlan {
    /// Strategy the plan executes (the target strategy for rebalances).
    pub strategy: StrategyHash,
    /// Operation compiled.
    pub operation: Operation,
    /// Step groups in execution order.
    pub groups: Vec<InstructionGroup>,
}

impl CompiledPlan {
    /// Number of compiled steps, empty groups included.
    pub fn step_count(&self) -> usize {
        self.groups.len()
    }

    /// Flattened instruction list in execution order.
    pub fn instructions(&self) -> Vec<Instruction> {
        self.groups
            .iter()
            .flat_map(|g| g.instructions.iter().cloned())
            .collect()
    }

    /// Total number of instructions across all groups.
    pub fn instruction_count(&self) -> usize {
        self.groups.iter().map(|g| g.instructions.len()).sum()
    }

    /// True when no group emitted any instruction.
    pub fn is_noop(&self) -> bool {
        self.instruction_count() == 0
    }
}

/// `a * b / c` over 256-bit integers.
///
/// Falls back to dividing first when the product overflows, and
/// returns zero for a zero denominator.
pub fn mul_div(a: U256, b: U256, c: U256) -> U256 {
    if c.is_zero() {
        return U256::ZERO;
    }
    a.checked_mul(b)
        .map_or_else(|| (a / c).saturating_mul(b), |product| product / c)
}

/// Scale `amount` by a basis-point ratio.
pub fn apply_bps(amount: U256, bps: u16) -> U256 {
    mul_div(amount, U256::from(bps), U256::from(BPS_DENOMINATOR))
}
