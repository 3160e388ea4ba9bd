//! Health Probes - Liveness and Readiness
//!
//! `/live` answers while the process runs. `/ready` answers only while
//! the keeper loop runs and the last chain snapshot and executor check
//! succeeded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;

/// Shared health flags, updated by the keeper.
#[derive(Debug)]
pub struct HealthState {
    pub snapshot_healthy: AtomicBool,
    pub executor_healthy: AtomicBool,
    pub engine_running: AtomicBool,
}

impl HealthState {
    pub const fn new() -> Self {
        Self {
            snapshot_healthy: AtomicBool::new(true),
            executor_healthy: AtomicBool::new(true),
            engine_running: AtomicBool::new(false),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.engine_running.load(Ordering::Relaxed)
            && self.snapshot_healthy.load(Ordering::Relaxed)
            && self.executor_healthy.load(Ordering::Relaxed)
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

/// `/live` and `/ready` routes over `state`.
pub fn health_routes(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .with_state(state)
}

async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    if state.is_ready() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_requires_running_engine() {
        let state = HealthState::new();
        assert!(!state.is_ready());
        state.engine_running.store(true, Ordering::Relaxed);
        assert!(state.is_ready());
        state.snapshot_healthy.store(false, Ordering::Relaxed);
        assert!(!state.is_ready());
    }
}
