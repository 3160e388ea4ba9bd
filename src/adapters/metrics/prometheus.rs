//! Prometheus Metrics Registry - Allocator Observability
//!
//! Registers and exposes Prometheus metrics for Grafana dashboards.
//! Covers plan compilation, strategy selection, keeper cycles and
//! executor outcomes.

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use super::health::{HealthState, health_routes};

/// Centralized Prometheus metrics for the allocator.
///
/// All metrics follow the naming convention `yield_allocator_*`.
pub struct MetricsRegistry {
    registry: Registry,
    /// Plans compiled, by operation.
    pub plans_compiled: IntCounterVec,
    /// Instructions emitted, by operation.
    pub instructions_emitted: IntCounterVec,
    /// Compilation or selection failures, by operation and error kind.
    pub compile_failures: IntCounterVec,
    /// Best-strategy resolutions, by source.
    pub selections: IntCounterVec,
    /// Executor outcomes, by status.
    pub executions: IntCounterVec,
    /// Keeper cycles completed.
    pub cycles: IntCounter,
    /// Steps per compiled plan.
    pub plan_steps: HistogramVec,
    /// Number of steps of each vault's active strategy.
    pub active_strategy_steps: IntGaugeVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let plans_compiled = IntCounterVec::new(
            Opts::new("yield_allocator_plans_compiled_total", "Plans compiled"),
            &["operation"],
        )?;

        let instructions_emitted = IntCounterVec::new(
            Opts::new(
                "yield_allocator_instructions_emitted_total",
                "Instructions emitted across compiled plans",
            ),
            &["operation"],
        )?;

        let compile_failures = IntCounterVec::new(
            Opts::new(
                "yield_allocator_compile_failures_total",
                "Plans that failed to compile or select",
            ),
            &["operation", "reason"],
        )?;

        let selections = IntCounterVec::new(
            Opts::new(
                "yield_allocator_selections_total",
                "Best-strategy resolutions by source",
            ),
            &["source"],
        )?;

        let executions = IntCounterVec::new(
            Opts::new(
                "yield_allocator_executions_total",
                "Executor outcomes by status",
            ),
            &["status"],
        )?;

        let cycles = IntCounter::new("yield_allocator_cycles_total", "Keeper cycles completed")?;

        let plan_steps = HistogramVec::new(
            HistogramOpts::new("yield_allocator_plan_steps", "Instruction groups per plan")
                .buckets(vec![1.0, 2.0, 3.0, 4.0, 6.0, 8.0, 12.0]),
            &["operation"],
        )?;

        let active_strategy_steps = IntGaugeVec::new(
            Opts::new(
                "yield_allocator_active_strategy_steps",
                "Step count of each vault's active strategy",
            ),
            &["vault"],
        )?;

        registry.register(Box::new(plans_compiled.clone()))?;
        registry.register(Box::new(instructions_emitted.clone()))?;
        registry.register(Box::new(compile_failures.clone()))?;
        registry.register(Box::new(selections.clone()))?;
        registry.register(Box::new(executions.clone()))?;
        registry.register(Box::new(cycles.clone()))?;
        registry.register(Box::new(plan_steps.clone()))?;
        registry.register(Box::new(active_strategy_steps.clone()))?;

        Ok(Self {
            registry,
            plans_compiled,
            instructions_emitted,
            compile_failures,
            selections,
            executions,
            cycles,
            plan_steps,
            active_strategy_steps,
        })
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Serve `/metrics` plus the health probes on `bind_address`.
    #[instrument(skip(self, health, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        health: Arc<HealthState>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics = Arc::clone(&self);

        let app = Router::new()
            .route(
                "/metrics",
                get(move || {
                    let metrics = Arc::clone(&metrics);
                    async move {
                        match metrics.render() {
                            Ok(body) => (StatusCode::OK, body),
                            Err(e) => {
                                warn!(error = %e, "Failed to encode metrics");
                                (StatusCode::INTERNAL_SERVER_ERROR, String::new())
                            }
                        }
                    }
                }),
            )
            .merge(health_routes(health));

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_counters() {
        let metrics = MetricsRegistry::new().unwrap();
        metrics.plans_compiled.with_label_values(&["deposit_all"]).inc();
        metrics.cycles.inc();
        let body = metrics.render().unwrap();
        assert!(body.contains("yield_allocator_plans_compiled_total{operation=\"deposit_all\"} 1"));
        assert!(body.contains("yield_allocator_cycles_total 1"));
    }
}
