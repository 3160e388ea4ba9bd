//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the domain/usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `ChainView`: read-only balances, supplies, rewards, debts and quotes
//! - `ProtocolAdapter` (+ `Stakeable`, `RewardBearing`, `Borrowing`): pool integrations
//! - `ConfigStore` / `SelectionStore`: pools, bindings, strategies and selections
//! - `Executor`: atomic submission of compiled plans

pub mod chain_view;
pub mod config_store;
pub mod executor;
pub mod protocol_adapter;
