//! Plan Log - Append-only JSONL Execution Records
//!
//! Persists every submitted batch and its outcome to daily JSONL files
//! in the format `plans/YYYY-MM-DD.jsonl`. Each line is a self-contained
//! JSON record for easy parsing, streaming, and crash recovery.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

use crate::ports::executor::{ExecutionBatch, ExecutionOutcome};

/// One line of the plan log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub batch: ExecutionBatch,
    pub outcome: ExecutionOutcome,
    pub recorded_at: DateTime<Utc>,
}

impl PlanRecord {
    pub fn new(batch: ExecutionBatch, outcome: ExecutionOutcome) -> Self {
        Self {
            batch,
            outcome,
            recorded_at: Utc::now(),
        }
    }
}

/// Append-only JSONL plan logger with daily file rotation.
pub struct PlanLog {
    plans_dir: PathBuf,
}

impl PlanLog {
    /// Create a plan log in the given data directory.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let plans_dir = Path::new(data_dir).join("plans");
        fs::create_dir_all(&plans_dir)
            .await
            .context("Failed to create plans directory")?;
        Ok(Self { plans_dir })
    }

    /// Append a record to today's JSONL file.
    #[instrument(skip(self, record), fields(batch_id = %record.batch.id))]
    pub async fn append(&self, record: &PlanRecord) -> Result<()> {
        let date = record.recorded_at.format("%Y-%m-%d").to_string();
        let path = self.plans_dir.join(format!("{date}.jsonl"));

        let mut json = serde_json::to_string(record).context("Failed to serialize plan record")?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .context("Failed to open plan log file")?;

        file.write_all(json.as_bytes())
            .await
            .context("Failed to write plan record")?;
        file.flush().await.context("Failed to flush plan log")?;

        Ok(())
    }

    /// Load every record from all daily files, oldest first.
    #[instrument(skip(self))]
    pub async fn load_all(&self) -> Result<Vec<PlanRecord>> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.plans_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "jsonl") {
                continue;
            }
            let content = fs::read_to_string(&path).await?;
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                match serde_json::from_str::<PlanRecord>(line) {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        warn!(
                            file = %path.display(),
                            error = %e,
                            "Skipping malformed plan record"
                        );
                    }
                }
            }
        }

        records.sort_by_key(|r| r.recorded_at);
        info!(count = records.len(), "Loaded plan records");
        Ok(records)
    }

    /// Records of one vault, oldest first.
    pub async fn load_vault(&self, vault: &str) -> Result<Vec<PlanRecord>> {
        let all = self.load_all().await?;
        Ok(all.into_iter().filter(|r| r.batch.vault == vault).collect())
    }

    /// Check if the plans directory is writable.
    pub async fn is_healthy(&self) -> bool {
        let test_path = self.plans_dir.join(".health_check");
        let result = fs::write(&test_path, b"ok").await;
        let _ = fs::remove_file(&test_path).await;
        result.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::B256;

    use crate::domain::types::{CompiledPlan, Operation};
    use crate::ports::executor::ExecutionStatus;

    fn temp_dir(tag: &str) -> String {
        std::env::temp_dir()
            .join(format!("yield-allocator-{tag}-{}", uuid::Uuid::new_v4()))
            .display()
            .to_string()
    }

    fn record(vault: &str) -> PlanRecord {
        let plan = CompiledPlan {
            strategy: B256::repeat_byte(1),
            operation: Operation::DepositAll,
            groups: Vec::new(),
        };
        let batch = ExecutionBatch::new(vault, plan);
        let outcome = ExecutionOutcome {
            batch_id: batch.id,
            status: ExecutionStatus::Simulated,
            instructions: 0,
            reason: None,
        };
        PlanRecord::new(batch, outcome)
    }

    #[tokio::test]
    async fn test_append_and_reload() {
        let dir = temp_dir("plans");
        let log = PlanLog::new(&dir).await.unwrap();
        let first = record("a");
        log.append(&first).await.unwrap();
        log.append(&record("b")).await.unwrap();

        let all = log.load_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], first);

        let only_a = log.load_vault("a").await.unwrap();
        assert_eq!(only_a.len(), 1);
        assert!(log.is_healthy().await);

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_skips_malformed_lines() {
        let dir = temp_dir("plans-bad");
        let log = PlanLog::new(&dir).await.unwrap();
        log.append(&record("a")).await.unwrap();
        let path = Path::new(&dir).join("plans").join("2000-01-01.jsonl");
        fs::write(&path, "not json\n").await.unwrap();

        assert_eq!(log.load_all().await.unwrap().len(), 1);
        let _ = fs::remove_dir_all(&dir).await;
    }
}
