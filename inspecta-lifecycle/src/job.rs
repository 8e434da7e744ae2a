//! Lifecycle Scan Background Task
//!
//! Recomputes upcoming status changes on an interval and publishes them on a
//! `watch` channel. With `auto_advance` enabled, due transitions are applied
//! before each scan.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::scheduler::{LifecycleScheduler, UpcomingChanges};

/// Default scan period in seconds.
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct LifecycleScanConfig {
    /// How often to scan (default: 5 minutes)
    pub scan_interval: Duration,

    /// Apply due transitions without waiting for approval (default: false)
    pub auto_advance: bool,
}

impl Default for LifecycleScanConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(DEFAULT_SCAN_INTERVAL_SECS),
            auto_advance: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct LifecycleScanMetrics {
    /// Scans completed
    pub scans: AtomicU64,

    /// Alerts published across all scans
    pub alerts_published: AtomicU64,

    /// Transitions applied by auto-advance
    pub transitions_applied: AtomicU64,

    /// Scans that failed
    pub scan_errors: AtomicU64,
}

impl LifecycleScanMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> LifecycleScanSnapshot {
        LifecycleScanSnapshot {
            scans: self.scans.load(Ordering::Relaxed),
            alerts_published: self.alerts_published.load(Ordering::Relaxed),
            transitions_applied: self.transitions_applied.load(Ordering::Relaxed),
            scan_errors: self.scan_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleScanSnapshot {
    pub scans: u64,
    pub alerts_published: u64,
    pub transitions_applied: u64,
    pub scan_errors: u64,
}

/// Scan until `shutdown_rx` turns true, publishing each result on `alerts_tx`.
pub async fn lifecycle_scan_task(
    scheduler: Arc<LifecycleScheduler>,
    config: LifecycleScanConfig,
    alerts_tx: watch::Sender<UpcomingChanges>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<LifecycleScanMetrics> {
    let metrics = Arc::new(LifecycleScanMetrics::new());

    let mut scan_interval = interval(config.scan_interval);
    scan_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        scan_interval_ms = config.scan_interval.as_millis() as u64,
        auto_advance = config.auto_advance,
        "Lifecycle scan task started"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("Lifecycle scan task shutting down");
                    break;
                }
            }

            _ = scan_interval.tick() => {
                scan_once(&scheduler, &config, &alerts_tx, &metrics).await;
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        scans = snapshot.scans,
        alerts_published = snapshot.alerts_published,
        transitions_applied = snapshot.transitions_applied,
        scan_errors = snapshot.scan_errors,
        "Lifecycle scan task completed"
    );

    metrics
}

async fn scan_once(
    scheduler: &LifecycleScheduler,
    config: &LifecycleScanConfig,
    alerts_tx: &watch::Sender<UpcomingChanges>,
    metrics: &LifecycleScanMetrics,
) {
    if config.auto_advance {
        match scheduler.update_mission_statuses().await {
            Ok(summary) => {
                metrics
                    .transitions_applied
                    .fetch_add(summary.updated as u64, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!(error = %e, "Automatic status update failed");
                metrics.scan_errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    match scheduler.check_upcoming_status_changes().await {
        Ok(changes) => {
            metrics.scans.fetch_add(1, Ordering::Relaxed);
            metrics
                .alerts_published
                .fetch_add(changes.len() as u64, Ordering::Relaxed);
            if !changes.is_empty() {
                tracing::info!(
                    starting_soon = changes.starting_soon.len(),
                    ending_soon = changes.ending_soon.len(),
                    "Upcoming status changes"
                );
            }
            alerts_tx.send_replace(changes);
        }
        Err(e) => {
            tracing::error!(error = %e, "Lifecycle scan failed");
            metrics.scan_errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}
