//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! allocator's workflows.
//!
//! Use cases:
//! - `StrategyManager`: compiles strategies into instruction plans and values positions
//! - `RiskManager`: resolves the best strategy per risk profile and asset
//! - `AllocationEngine`: periodic keeper selecting, compiling and submitting plans

pub mod allocation_engine;
pub mod risk_manager;
pub mod simulation;
pub mod strategy_manager;

pub use allocation_engine::{AllocationEngine, CycleReport};
pub use risk_manager::RiskManager;
pub use strategy_manager::StrategyManager;
