//! Metrics and Monitoring Adapters
//!
//! Prometheus metrics export plus liveness and readiness probes,
//! served together via axum 0.7.

pub mod health;
pub mod prometheus;

pub use health::HealthState;
pub use prometheus::MetricsRegistry;
