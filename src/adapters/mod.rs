//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! integrations. Each sub-module groups adapters by concern.
//!
//! Adapter categories:
//! - `chain`: JSON chain-state snapshots implementing `ChainView`
//! - `protocols`: ERC-4626 vaults, lending markets, Curve pools
//! - `registry`: role-checked in-memory `ConfigStore`
//! - `execution`: multicall encoding and the dry-run executor
//! - `metrics`: Prometheus metrics export and health checks
//! - `persistence`: JSONL plan logging and state snapshots

pub mod chain;
pub mod execution;
pub mod metrics;
pub mod persistence;
pub mod protocols;
pub mod registry;
