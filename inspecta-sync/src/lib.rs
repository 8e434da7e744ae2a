//! INSPECTA Sync - Offline-First Synchronization
//!
//! Routes every read and mutation between the remote data service and the
//! local cache store, queues mutations made while the remote is unreachable,
//! replays them in order, and verifies that both stores agree.

pub mod checker;
pub mod engine;
pub mod job;
pub mod link;
pub mod queue;

pub use checker::IntegrityChecker;
pub use engine::SyncEngine;
pub use job::{
    reconciliation_task, ReconciliationConfig, ReconciliationMetrics, ReconciliationSnapshot,
};
pub use link::{Link, LinkState};
pub use queue::PendingQueue;
