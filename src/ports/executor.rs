//! Executor Port - Atomic Instruction Batch Submission
//!
//! The allocator never executes anything itself. A compiled plan is
//! wrapped in an [`ExecutionBatch`] and handed to an executor that
//! applies every instruction or none of them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::types::CompiledPlan;

/// A compiled plan queued for atomic execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionBatch {
  /// Unique batch ID.
  pub id: Uuid,
  /// Name of the vault the plan was compiled for.
  pub vault: String,
  /// The plan.
  pub plan: CompiledPlan,
  /// Submission time.
  pub submitted_at: DateTime<Utc>,
}

impl ExecutionBatch {
  pub fn new(vault: impl Into<String>, plan: CompiledPlan) -> Self {
    Self {
      id: Uuid::new_v4(),
      vault: vault.into(),
      plan,
      submitted_at: Utc::now(),
    }
  }
}

/// Final status of a submitted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
  /// Every instruction applied.
  Applied,
  /// Recorded but not sent (dry run).
  Simulated,
  /// Nothing applied.
  Reverted,
}

impl ExecutionStatus {
  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Applied => "applied",
      Self::Simulated => "simulated",
      Self::Reverted => "reverted",
    }
  }
}

/// Executor report for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
  pub batch_id: Uuid,
  pub status: ExecutionStatus,
  /// Number of instructions in the batch.
  pub instructions: usize,
  /// Revert reason, when reverted.
  pub reason: Option<String>,
}

/// Trait for atomic, all-or-nothing batch execution.
#[async_trait]
pub trait Executor: Send + Sync + 'static {
  /// Execute every instruction of `batch`, or none.
  async fn execute(&self, batch: &ExecutionBatch) -> anyhow::Result<ExecutionOutcome>;

  /// Whether the executor can accept batches.
  async fn is_healthy(&self) -> bool;
}
