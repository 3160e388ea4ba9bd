//! Dry-run Executor - Encode and Log Without Submitting
//!
//! Implements the `Executor` port by encoding each batch into its
//! multicall transaction and logging it. Nothing is sent on chain;
//! every batch reports `Simulated`.

use std::sync::atomic::{AtomicU64, Ordering};

use alloy::primitives::Address;
use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::multicall::encode_plan;
use crate::ports::executor::{ExecutionBatch, ExecutionOutcome, ExecutionStatus, Executor};

pub struct DryRunExecutor {
    multicall: Address,
    submitted: AtomicU64,
}

impl DryRunExecutor {
    pub const fn new(multicall: Address) -> Self {
        Self {
            multicall,
            submitted: AtomicU64::new(0),
        }
    }

    /// Batches accepted so far.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Executor for DryRunExecutor {
    #[instrument(skip_all, fields(batch_id = %batch.id, vault = %batch.vault))]
    async fn execute(&self, batch: &ExecutionBatch) -> anyhow::Result<ExecutionOutcome> {
        let encoded = encode_plan(self.multicall, &batch.plan);
        let instructions = batch.plan.instruction_count();
        self.submitted.fetch_add(1, Ordering::Relaxed);

        for (i, group) in batch.plan.groups.iter().enumerate() {
            debug!(
                group = i,
                step = group.step_index,
                kind = ?group.kind,
                pool = %group.pool,
                instructions = group.instructions.len(),
                "Planned group"
            );
        }
        info!(
            operation = %batch.plan.operation,
            strategy = %batch.plan.strategy,
            instructions,
            calldata_bytes = encoded.calldata.len(),
            value = %encoded.value,
            "Dry run: batch not submitted"
        );

        Ok(ExecutionOutcome {
            batch_id: batch.id,
            status: ExecutionStatus::Simulated,
            instructions,
            reason: None,
        })
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}
