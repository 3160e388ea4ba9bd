//! Persistence Adapters - JSONL-based File Storage
//!
//! Append-only JSONL files for submitted plans and atomic JSON
//! snapshots for registry and vault state.
//! No database dependency, lightweight and crash-recoverable.

pub mod plan_log;
pub mod state;

pub use plan_log::{PlanLog, PlanRecord};
pub use state::{AllocatorState, StateStore, VaultState};
