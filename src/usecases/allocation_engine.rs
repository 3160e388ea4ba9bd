//! Allocation Engine - Periodic Keeper Loop
//!
//! Every cycle, for each managed vault:
//! 1. Resolves the best strategy for the vault's risk profile and asset
//! 2. Moves the position when the best strategy changed (rebalance)
//! 3. Harvests rewards of the active strategy into the underlying
//! 4. Deposits idle underlying into the active strategy
//!
//! Each compiled plan is submitted as one atomic batch, logged, and
//! counted. The active strategy of a vault only moves once a batch is
//! reported applied. State is persisted after every cycle.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::adapters::chain::ChainSnapshot;
use crate::adapters::metrics::{HealthState, MetricsRegistry};
use crate::adapters::persistence::{AllocatorState, PlanLog, PlanRecord, StateStore, VaultState};
use crate::adapters::registry::Registry;
use crate::config::VaultConfig;
use crate::domain::error::AllocationError;
use crate::domain::types::{CompiledPlan, Operation};
use crate::ports::chain_view::ChainView;
use crate::ports::config_store::ConfigStore;
use crate::ports::executor::{ExecutionBatch, ExecutionStatus, Executor};

use super::risk_manager::RiskManager;
use super::strategy_manager::StrategyManager;

/// Counters of one keeper cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
  /// Batches handed to the executor.
  pub submitted: usize,
  /// Batches the executor applied.
  pub applied: usize,
  /// Selections, compilations or submissions that failed.
  pub failures: usize,
}

/// Keeper orchestrating selection, compilation and submission.
pub struct AllocationEngine<E: Executor> {
  registry: Registry,
  executor: Arc<E>,
  vaults: Vec<VaultConfig>,
  active: BTreeMap<String, VaultState>,
  metrics: Option<Arc<MetricsRegistry>>,
  health: Arc<HealthState>,
  plan_log: Option<PlanLog>,
  state_store: Option<StateStore>,
}

impl<E: Executor> AllocationEngine<E> {
  pub fn new(registry: Registry, executor: Arc<E>, vaults: Vec<VaultConfig>) -> Self {
    let active = vaults
      .iter()
      .map(|v| {
        (
          v.name.clone(),
          VaultState {
            name: v.name.clone(),
            active_strategy: None,
            last_batch: None,
          },
        )
      })
      .collect();
    Self {
      registry,
      executor,
      vaults,
      active,
      metrics: None,
      health: Arc::new(HealthState::new()),
      plan_log: None,
      state_store: None,
    }
  }

  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  pub fn with_health(mut self, health: Arc<HealthState>) -> Self {
    self.health = health;
    self
  }

  pub fn with_persistence(mut self, plan_log: PlanLog, state_store: StateStore) -> Self {
    self.plan_log = Some(plan_log);
    self.state_store = Some(state_store);
    self
  }

  pub const fn registry(&self) -> &Registry {
    &self.registry
  }

  pub fn registry_mut(&mut self) -> &mut Registry {
    &mut self.registry
  }

  pub fn vault_state(&self, name: &str) -> Option<&VaultState> {
    self.active.get(name)
  }

  /// Reload a persisted state; vaults no longer configured are dropped.
  pub fn restore(&mut self, state: AllocatorState) {
    self.registry.restore(state.registry);
    for vault in state.vaults {
      let known = vault
        .active_strategy
        .is_none_or(|hash| self.registry.strategy(&hash).is_some());
      if let (Some(slot), true) = (self.active.get_mut(&vault.name), known) {
        *slot = vault;
      }
    }
  }

  fn snapshot_state(&self) -> AllocatorState {
    AllocatorState::new(self.registry.snapshot(), self.active.values().cloned().collect())
  }

  /// Run cycles every `interval` until shutdown, reloading the chain
  /// snapshot at `snapshot_path` each time.
  #[instrument(skip_all, name = "allocation_loop")]
  pub async fn run(
    &mut self,
    snapshot_path: PathBuf,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
  ) -> Result<()> {
    info!(
      vaults = self.vaults.len(),
      interval_secs = interval.as_secs(),
      "Starting allocation engine"
    );
    self.health.engine_running.store(true, Ordering::Relaxed);
    let mut ticker = tokio::time::interval(interval);

    loop {
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
          info!("Shutdown signal received, stopping engine");
          break;
        }
        _ = ticker.tick() => {
          let chain = match ChainSnapshot::load(&snapshot_path).await {
            Ok(chain) => {
              self.health.snapshot_healthy.store(true, Ordering::Relaxed);
              chain
            }
            Err(e) => {
              self.health.snapshot_healthy.store(false, Ordering::Relaxed);
              warn!(error = %e, path = %snapshot_path.display(), "Chain snapshot unavailable, skipping cycle");
              continue;
            }
          };
          if let Err(e) = self.run_cycle(&chain).await {
            warn!(error = %e, "Cycle failed");
          }
        }
      }
    }

    self.health.engine_running.store(false, Ordering::Relaxed);
    self.persist().await;
    info!("Engine stopped cleanly");
    Ok(())
  }

  /// One pass over every vault against `chain`.
  #[instrument(skip_all)]
  pub async fn run_cycle(&mut self, chain: &dyn ChainView) -> Result<CycleReport> {
    let healthy = self.executor.is_healthy().await;
    self.health.executor_healthy.store(healthy, Ordering::Relaxed);
    anyhow::ensure!(healthy, "Executor unhealthy");

    let mut report = CycleReport::default();
    let vaults = self.vaults.clone();
    for vault in &vaults {
      let plans = self.plan_vault(vault, chain, &mut report);
      for plan in plans {
        self.submit(vault, plan, &mut report).await;
      }
    }

    if let Some(metrics) = &self.metrics {
      metrics.cycles.inc();
    }
    self.persist().await;
    debug!(
      submitted = report.submitted,
      applied = report.applied,
      failures = report.failures,
      "Cycle complete"
    );
    Ok(report)
  }

  /// Plans to submit for `vault`, in order.
  fn plan_vault(
    &mut self,
    vault: &VaultConfig,
    chain: &dyn ChainView,
    report: &mut CycleReport,
  ) -> Vec<CompiledPlan> {
    let mut selector = RiskManager::new(&mut self.registry);
    let selection = match selector.best_strategy(&vault.risk_profile, vault.asset) {
      Ok(selection) => selection,
      Err(e) => {
        self.record_failure(vault, "select", &e, report);
        return Vec::new();
      }
    };
    if let Some(metrics) = &self.metrics {
      metrics.selections.with_label_values(&[selection.source.as_str()]).inc();
    }

    let current = self.active.get(&vault.name).and_then(|s| s.active_strategy);
    let manager = StrategyManager::new(&self.registry);
    let idle = chain.balance_of(vault.asset, vault.owner);
    let mut compiled = Vec::new();

    match current {
      Some(from) if from != selection.hash => {
        info!(vault = %vault.name, from = %from, to = %selection.hash, "Best strategy changed, rebalancing");
        compiled.push((Operation::Rebalance, manager.rebalance(vault.owner, &from, &selection.hash, chain)));
      }
      Some(hash) => {
        if vault.harvest {
          compiled.push((Operation::HarvestAll, manager.harvest_all(vault.owner, &hash, chain)));
        }
        if !idle.is_zero() {
          compiled.push((Operation::DepositAll, manager.deposit_all(vault.owner, &hash, chain)));
        }
      }
      None if !idle.is_zero() => {
        compiled.push((Operation::DepositAll, manager.deposit_all(vault.owner, &selection.hash, chain)));
      }
      None => debug!(vault = %vault.name, "No position and no idle balance"),
    }

    let mut plans = Vec::new();
    for (operation, result) in compiled {
      match result {
        Ok(plan) if plan.is_noop() => {
          debug!(vault = %vault.name, operation = %operation, "Nothing to do");
        }
        Ok(plan) => {
          if let Some(metrics) = &self.metrics {
            let label = operation.as_str();
            metrics.plans_compiled.with_label_values(&[label]).inc();
            metrics
              .instructions_emitted
              .with_label_values(&[label])
              .inc_by(plan.instruction_count() as u64);
            metrics
              .plan_steps
              .with_label_values(&[label])
              .observe(plan.step_count() as f64);
          }
          plans.push(plan);
        }
        Err(e) => self.record_failure(vault, operation.as_str(), &e, report),
      }
    }
    plans
  }

  fn record_failure(
    &self,
    vault: &VaultConfig,
    operation: &str,
    error: &AllocationError,
    report: &mut CycleReport,
  ) {
    report.failures += 1;
    warn!(vault = %vault.name, operation, error = %error, "Plan not compiled");
    if let Some(metrics) = &self.metrics {
      metrics
        .compile_failures
        .with_label_values(&[operation, error.kind()])
        .inc();
    }
  }

  async fn submit(&mut self, vault: &VaultConfig, plan: CompiledPlan, report: &mut CycleReport) {
    let batch = ExecutionBatch::new(&vault.name, plan);
    report.submitted += 1;

    let outcome = match self.executor.execute(&batch).await {
      Ok(outcome) => outcome,
      Err(e) => {
        report.failures += 1;
        warn!(vault = %vault.name, batch_id = %batch.id, error = %e, "Batch submission failed");
        if let Some(metrics) = &self.metrics {
          metrics.executions.with_label_values(&["error"]).inc();
        }
        return;
      }
    };

    if let Some(metrics) = &self.metrics {
      metrics.executions.with_label_values(&[outcome.status.as_str()]).inc();
    }

    let moves_position = matches!(
      batch.plan.operation,
      Operation::DepositAll | Operation::DepositSome | Operation::Rebalance
    );
    if let Some(state) = self.active.get_mut(&vault.name) {
      state.last_batch = Some(batch.id);
      match outcome.status {
        ExecutionStatus::Applied => {
          report.applied += 1;
          if moves_position {
            state.active_strategy = Some(batch.plan.strategy);
            let steps = self
              .registry
              .strategy(&batch.plan.strategy)
              .map_or(0, |s| s.len());
            if let Some(metrics) = &self.metrics {
              metrics
                .active_strategy_steps
                .with_label_values(&[vault.name.as_str()])
                .set(i64::try_from(steps).unwrap_or(i64::MAX));
            }
          }
        }
        ExecutionStatus::Simulated => {}
        ExecutionStatus::Reverted => {
          report.failures += 1;
          warn!(
            vault = %vault.name,
            batch_id = %batch.id,
            reason = outcome.reason.as_deref().unwrap_or("unknown"),
            "Batch reverted, nothing applied"
          );
        }
      }
    }

    info!(
      vault = %vault.name,
      batch_id = %batch.id,
      operation = %batch.plan.operation,
      status = outcome.status.as_str(),
      instructions = outcome.instructions,
      "Batch executed"
    );

    if let Some(log) = &self.plan_log {
      if let Err(e) = log.append(&PlanRecord::new(batch, outcome)).await {
        warn!(error = %e, "Failed to append plan record");
      }
    }
  }

  async fn persist(&self) {
    if let Some(store) = &self.state_store {
      if let Err(e) = store.save(&self.snapshot_state()).await {
        warn!(error = %e, "Failed to save state snapshot");
      }
    }
  }
}
