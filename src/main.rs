//! Yield Allocator - Entry Point
//!
//! Initializes configuration, logging, the registry, persistence,
//! metrics and the keeper loop. Runs until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Bootstrap the registry from config and restore persisted state
//! 4. Spawn the metrics + health server
//! 5. Spawn the AllocationEngine keeper loop
//! 6. Wait for SIGINT, then shut down gracefully (signal, drain, save)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use yield_allocator::adapters::execution::DryRunExecutor;
use yield_allocator::adapters::metrics::{HealthState, MetricsRegistry};
use yield_allocator::adapters::persistence::{PlanLog, StateStore};
use yield_allocator::adapters::registry::Registry;
use yield_allocator::config;
use yield_allocator::usecases::AllocationEngine;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config =
        config::loader::load_config(&config_path).context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.service.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        dry_run = config.service.dry_run,
        vaults = config.vaults.len(),
        "Starting yield allocator"
    );

    anyhow::ensure!(
        config.service.dry_run,
        "Only dry-run execution is available; set service.dry_run = true"
    );

    // ── 3. Registry and persisted state ─────────────────────
    let registry = Registry::from_config(&config).context("Failed to bootstrap registry")?;
    let plan_log = PlanLog::new(&config.persistence.data_dir).await?;
    let state_store = StateStore::new(&config.persistence.data_dir).await?;
    let saved = state_store.load().await?;

    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let health = Arc::new(HealthState::new());
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);

    // ── 4. Metrics + health server ──────────────────────────
    let metrics_handle = if config.metrics.enabled {
        let server = Arc::clone(&metrics);
        let bind = config.metrics.bind_address.clone();
        let probes = Arc::clone(&health);
        let rx = shutdown_tx.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = server.serve(bind, probes, rx).await {
                error!(error = %e, "Metrics server failed");
            }
        }))
    } else {
        None
    };

    // ── 5. Keeper loop ──────────────────────────────────────
    let executor = Arc::new(DryRunExecutor::new(
        config.service.multicall.unwrap_or(Address::ZERO),
    ));
    let mut engine = AllocationEngine::new(registry, executor, config.vaults.clone())
        .with_metrics(Arc::clone(&metrics))
        .with_health(Arc::clone(&health))
        .with_persistence(plan_log, state_store);
    if let Some(state) = saved {
        engine.restore(state);
    }

    let snapshot_path = PathBuf::from(&config.snapshot.path);
    let interval = Duration::from_secs(config.service.cycle_interval_secs);
    let engine_shutdown = shutdown_tx.subscribe();
    let engine_handle = tokio::spawn(async move {
        if let Err(e) = engine.run(snapshot_path, interval, engine_shutdown).await {
            error!(error = %e, "Allocation engine failed");
        }
    });

    info!("All tasks spawned, allocator is running");

    // ── 6. Wait for SIGINT ──────────────────────────────────
    signal::ctrl_c()
        .await
        .context("Failed to listen for SIGINT")?;
    info!("SIGINT received, initiating graceful shutdown");

    let _ = shutdown_tx.send(());

    if tokio::time::timeout(Duration::from_secs(30), engine_handle)
        .await
        .is_err()
    {
        warn!("Engine did not stop within 30s");
    }
    if let Some(handle) = metrics_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}
