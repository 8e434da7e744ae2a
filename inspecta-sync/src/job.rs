//! Reconciliation Background Task
//!
//! Periodically drains the pending queue and compares collection counts
//! between the local cache and the remote service. Divergence is logged,
//! never repaired automatically.
//!
//! ```ignore
//! use tokio::sync::watch;
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let config = ReconciliationConfig::default();
//! let handle = tokio::spawn(reconciliation_task(checker, config, shutdown_rx));
//!
//! let _ = shutdown_tx.send(true);
//! let metrics = handle.await?;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use inspecta_core::SyncConfig;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::checker::IntegrityChecker;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Intervals of the reconciliation task.
#[derive(Debug, Clone)]
pub struct ReconciliationConfig {
    /// How often to replay the pending queue (default: 30 seconds)
    pub drain_interval: Duration,

    /// How often to compare counts (default: 5 minutes)
    pub integrity_interval: Duration,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for ReconciliationConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            drain_interval: config.drain_interval,
            integrity_interval: config.integrity_interval,
        }
    }
}

// ============================================================================
// METRICS
// ============================================================================

#[derive(Debug, Default)]
pub struct ReconciliationMetrics {
    /// Drain cycles run
    pub drains: AtomicU64,

    /// Queued operations replayed
    pub replayed: AtomicU64,

    /// Queued operations the remote refused
    pub rejected: AtomicU64,

    /// Integrity checks run
    pub checks: AtomicU64,

    /// Checks that found a count mismatch
    pub divergent_checks: AtomicU64,

    /// Checks that could not reach the remote
    pub unknown_checks: AtomicU64,

    /// Cycles that failed with a local error
    pub errors: AtomicU64,
}

impl ReconciliationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ReconciliationSnapshot {
        ReconciliationSnapshot {
            drains: self.drains.load(Ordering::Relaxed),
            replayed: self.replayed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            checks: self.checks.load(Ordering::Relaxed),
            divergent_checks: self.divergent_checks.load(Ordering::Relaxed),
            unknown_checks: self.unknown_checks.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationSnapshot {
    pub drains: u64,
    pub replayed: u64,
    pub rejected: u64,
    pub checks: u64,
    pub divergent_checks: u64,
    pub unknown_checks: u64,
    pub errors: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Drain and verify on their own intervals until `shutdown_rx` turns true.
pub async fn reconciliation_task(
    checker: Arc<IntegrityChecker>,
    config: ReconciliationConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<ReconciliationMetrics> {
    let metrics = Arc::new(ReconciliationMetrics::new());

    let mut drain_interval = interval(config.drain_interval);
    drain_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut integrity_interval = interval(config.integrity_interval);
    integrity_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        drain_interval_ms = config.drain_interval.as_millis() as u64,
        integrity_interval_ms = config.integrity_interval.as_millis() as u64,
        "Reconciliation task started"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("Reconciliation task shutting down");
                    break;
                }
            }

            _ = drain_interval.tick() => {
                drain_once(&checker, &metrics).await;
            }

            _ = integrity_interval.tick() => {
                check_once(&checker, &metrics).await;
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        drains = snapshot.drains,
        replayed = snapshot.replayed,
        rejected = snapshot.rejected,
        checks = snapshot.checks,
        divergent_checks = snapshot.divergent_checks,
        errors = snapshot.errors,
        "Reconciliation task completed"
    );

    metrics
}

async fn drain_once(checker: &IntegrityChecker, metrics: &ReconciliationMetrics) {
    metrics.drains.fetch_add(1, Ordering::Relaxed);
    match checker.engine().process_sync_queue().await {
        Ok(report) => {
            metrics
                .replayed
                .fetch_add(report.replayed as u64, Ordering::Relaxed);
            metrics
                .rejected
                .fetch_add(report.rejected as u64, Ordering::Relaxed);
            if report.remaining > 0 && !report.coalesced {
                tracing::debug!(
                    remaining = report.remaining,
                    "Pending operations left after drain"
                );
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Queue drain failed");
            metrics.errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}

async fn check_once(checker: &IntegrityChecker, metrics: &ReconciliationMetrics) {
    metrics.checks.fetch_add(1, Ordering::Relaxed);
    match checker.verify_integrity().await {
        Ok(report) if !report.remote_reachable => {
            metrics.unknown_checks.fetch_add(1, Ordering::Relaxed);
        }
        Ok(report) if !report.is_consistent() => {
            metrics.divergent_checks.fetch_add(1, Ordering::Relaxed);
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!(error = %e, "Integrity check failed");
            metrics.errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}
