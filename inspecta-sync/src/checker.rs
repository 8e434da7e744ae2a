//! Integrity verification between the local cache and the remote service.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use inspecta_core::{Collection, InspectaResult, IntegrityReport};
use tokio::sync::Mutex;

use crate::engine::SyncEngine;

/// Compares per-collection counts across both stores.
///
/// Overlapping calls to [`IntegrityChecker::verify_integrity`] are coalesced:
/// a caller that arrives while a check runs waits for it and receives the
/// same report.
pub struct IntegrityChecker {
    engine: Arc<SyncEngine>,
    last: Mutex<Option<IntegrityReport>>,
    completed: AtomicU64,
}

impl IntegrityChecker {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self {
            engine,
            last: Mutex::new(None),
            completed: AtomicU64::new(0),
        }
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    /// Most recent report, if any check has completed.
    pub async fn last_report(&self) -> Option<IntegrityReport> {
        self.last.lock().await.clone()
    }

    pub async fn verify_integrity(&self) -> InspectaResult<IntegrityReport> {
        let generation = self.completed.load(Ordering::SeqCst);
        let mut slot = self.last.lock().await;
        if self.completed.load(Ordering::SeqCst) != generation {
            if let Some(report) = slot.as_ref() {
                return Ok(report.clone());
            }
        }

        let report = self.compute().await?;
        *slot = Some(report.clone());
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(report)
    }

    /// Drain the queue, then verify. True iff the remote was reachable and
    /// every collection matches.
    pub async fn force_sync(&self) -> InspectaResult<bool> {
        let drain = self.engine.process_sync_queue().await?;
        tracing::debug!(
            replayed = drain.replayed,
            rejected = drain.rejected,
            remaining = drain.remaining,
            "Forced drain finished"
        );
        let report = self.verify_integrity().await?;
        Ok(report.is_consistent())
    }

    async fn compute(&self) -> InspectaResult<IntegrityReport> {
        let local_store = self.engine.local_store();
        let mut local = BTreeMap::new();
        for collection in Collection::ALL {
            local.insert(collection, local_store.count(collection)?);
        }

        let remote = self.remote_counts().await;
        let report = IntegrityReport::from_counts(
            local,
            remote,
            self.engine.pending_count(),
            Utc::now(),
        );

        if !report.remote_reachable {
            tracing::info!(
                pending = report.pending_operations,
                "Integrity unknown, remote unreachable"
            );
        } else if report.is_consistent() {
            tracing::debug!("Local cache matches remote");
        } else {
            for (collection, diff) in report.differences.iter().filter(|(_, d)| **d != 0) {
                tracing::warn!(
                    collection = %collection,
                    difference = diff,
                    local = report.local.get(collection).copied().unwrap_or(0),
                    remote = report.remote.get(collection).copied().unwrap_or(0),
                    "Local cache diverges from remote"
                );
            }
        }
        Ok(report)
    }

    /// Per-collection remote counts, or `None` if any count could not be read.
    async fn remote_counts(&self) -> Option<BTreeMap<Collection, u64>> {
        if !self.engine.ensure_reachable().await {
            return None;
        }
        let remote = self.engine.remote()?;
        let mut counts = BTreeMap::new();
        for collection in Collection::ALL {
            match self.engine.call(remote.count(collection)).await {
                Ok(count) => {
                    counts.insert(collection, count);
                }
                Err(e) => {
                    if e.is_transport() {
                        self.engine.mark_degraded(&e);
                    }
                    tracing::warn!(collection = %collection, error = %e, "Remote count failed");
                    return None;
                }
            }
        }
        Some(counts)
    }
}
