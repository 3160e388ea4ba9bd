//! State Store - Atomic JSON Allocator State Persistence
//!
//! Saves allocator state snapshots to `state.json` using atomic writes
//! (write to tmp file, then rename). The file is always either the old
//! or the new version, never a partial write.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::adapters::registry::RegistrySnapshot;
use crate::domain::strategy::StrategyHash;

/// Snapshot format version.
pub const STATE_VERSION: u32 = 1;

/// Strategy a vault is currently allocated to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultState {
    pub name: String,
    pub active_strategy: Option<StrategyHash>,
    pub last_batch: Option<Uuid>,
}

/// Everything that must survive a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorState {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub registry: RegistrySnapshot,
    pub vaults: Vec<VaultState>,
}

impl AllocatorState {
    pub fn new(registry: RegistrySnapshot, vaults: Vec<VaultState>) -> Self {
        Self {
            version: STATE_VERSION,
            saved_at: Utc::now(),
            registry,
            vaults,
        }
    }
}

/// Atomic JSON state store for crash recovery.
pub struct StateStore {
    state_path: PathBuf,
    tmp_path: PathBuf,
}

impl StateStore {
    /// Create a state store in the given data directory.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let dir = Path::new(data_dir);
        fs::create_dir_all(dir)
            .await
            .context("Failed to create data directory")?;

        Ok(Self {
            state_path: dir.join("state.json"),
            tmp_path: dir.join("state.json.tmp"),
        })
    }

    /// Save a snapshot atomically (tmp → rename).
    #[instrument(skip(self, state))]
    pub async fn save(&self, state: &AllocatorState) -> Result<()> {
        let json = serde_json::to_string_pretty(state).context("Failed to serialize state")?;

        fs::write(&self.tmp_path, &json)
            .await
            .context("Failed to write tmp state file")?;
        fs::rename(&self.tmp_path, &self.state_path)
            .await
            .context("Failed to rename state file")?;

        info!(
            path = %self.state_path.display(),
            strategies = state.registry.strategies.len(),
            vaults = state.vaults.len(),
            "State snapshot saved"
        );
        Ok(())
    }

    /// Load the most recent snapshot, `None` on first startup.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Option<AllocatorState>> {
        if !fs::try_exists(&self.state_path).await.unwrap_or(false) {
            info!("No state file found, starting fresh");
            return Ok(None);
        }

        let json = fs::read_to_string(&self.state_path)
            .await
            .context("Failed to read state file")?;
        let state: AllocatorState =
            serde_json::from_str(&json).context("Failed to parse state JSON")?;

        anyhow::ensure!(
            state.version == STATE_VERSION,
            "Unsupported state version {}, expected {}",
            state.version,
            STATE_VERSION
        );

        info!(
            strategies = state.registry.strategies.len(),
            vaults = state.vaults.len(),
            "State snapshot loaded"
        );
        Ok(Some(state))
    }
}
