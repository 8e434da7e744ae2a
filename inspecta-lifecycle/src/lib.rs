//! INSPECTA Lifecycle - Mission Status State Machine
//!
//! Pure transition and coherence rules over mission status and dates, and a
//! scheduler that surfaces upcoming changes for approval, rejection or date
//! edits.

pub mod gateway;
pub mod job;
pub mod machine;
pub mod scheduler;

pub use gateway::MissionGateway;
pub use job::{
    lifecycle_scan_task, LifecycleScanConfig, LifecycleScanMetrics, LifecycleScanSnapshot,
};
pub use machine::{check_coherence, decide_transition, next_status, CoherenceCheck};
pub use scheduler::{
    IncoherentMission, LifecycleScheduler, StatusAlert, StatusUpdateSummary, UpcomingChanges,
};
