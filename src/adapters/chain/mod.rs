//! Chain Adapters - Chain State Sources
//!
//! `ChainSnapshot` serves balances, supplies, pending rewards, debts
//! and prices captured at one block from a JSON file.

pub mod snapshot;

pub use snapshot::ChainSnapshot;
