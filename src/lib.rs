//! Yield Allocator - Library Root
//!
//! Compiles yield strategies into atomic instruction plans across
//! protocol adapters, enforcing deposit caps and risk-profile based
//! strategy selection. Re-exports all modules for integration tests
//! and benchmarks.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
