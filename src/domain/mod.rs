//! Domain layer - Core allocation models.
//!
//! Pure types and rules: instructions and compiled plans, strategies and
//! their hashes, deposit caps, pool ratings, risk profiles and the
//! default-strategy state machine. No I/O here (hexagonal architecture
//! inner ring). All types are serializable and testable in isolation.

pub mod deposit_cap;
pub mod error;
pub mod risk;
pub mod strategy;
pub mod types;

// Re-export core types for convenience
pub use deposit_cap::{DepositCapMode, DepositCapPolicy};
pub use error::{AllocationError, AllocationResult, Capability, Role};
pub use risk::{DefaultStrategyState, PoolRecord, RatingRange, RiskProfile, StrategySelection};
pub use strategy::{Strategy, StrategyHash, StrategyStep};
pub use types::{Action, CompiledPlan, Instruction, InstructionGroup, Operation};
