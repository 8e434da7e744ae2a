//! Pure status transition and coherence rules.
//!
//! Nothing here reads a clock. Callers pass `now`, which keeps every rule
//! deterministic and testable.

use inspecta_core::{LifecyclePolicy, MissionStatus, Timestamp};
use serde::{Deserialize, Serialize};

/// The status a mission should move to at `now`, if any.
///
/// Only one step is taken per call: a PLANNED mission whose end has also
/// passed becomes ONGOING, and COMPLETED on a later evaluation.
///
/// Callers filter out missions that opted out of automatic changes.
pub fn decide_transition(
    status: MissionStatus,
    start: Timestamp,
    end: Timestamp,
    now: Timestamp,
) -> Option<MissionStatus> {
    match status {
        MissionStatus::Planned if now >= start => Some(MissionStatus::Ongoing),
        MissionStatus::Ongoing if now > end => Some(MissionStatus::Completed),
        _ => None,
    }
}

/// The status that approving an alert commits, regardless of timing.
pub fn next_status(status: MissionStatus) -> Option<MissionStatus> {
    match status {
        MissionStatus::Planned => Some(MissionStatus::Ongoing),
        MissionStatus::Ongoing => Some(MissionStatus::Completed),
        _ => None,
    }
}

/// Result of checking a status against its dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoherenceCheck {
    pub coherent: bool,
    /// Human-readable explanation when incoherent.
    pub message: Option<String>,
    pub suggested_start: Option<Timestamp>,
    pub suggested_end: Option<Timestamp>,
}

impl CoherenceCheck {
    fn coherent() -> Self {
        Self {
            coherent: true,
            message: None,
            suggested_start: None,
            suggested_end: None,
        }
    }

    fn incoherent(
        message: impl Into<String>,
        suggested_start: Option<Timestamp>,
        suggested_end: Option<Timestamp>,
    ) -> Self {
        Self {
            coherent: false,
            message: Some(message.into()),
            suggested_start,
            suggested_end,
        }
    }
}

/// Check that `status` agrees with the mission dates at `now`, suggesting
/// corrected dates when it does not.
pub fn check_coherence(
    status: MissionStatus,
    start: Timestamp,
    end: Timestamp,
    now: Timestamp,
    policy: &LifecyclePolicy,
) -> CoherenceCheck {
    match status {
        MissionStatus::Planned => {
            if start > now {
                CoherenceCheck::coherent()
            } else {
                CoherenceCheck::incoherent(
                    "A planned mission must start in the future",
                    Some(now + policy.planned_start_offset),
                    Some(now + policy.planned_end_offset),
                )
            }
        }
        MissionStatus::Ongoing => {
            let started = start <= now;
            let running = now < end;
            match (started, running) {
                (true, true) => CoherenceCheck::coherent(),
                (false, true) => CoherenceCheck::incoherent(
                    "An ongoing mission cannot start in the future",
                    Some(now - policy.ongoing_shift),
                    None,
                ),
                (true, false) => CoherenceCheck::incoherent(
                    "An ongoing mission cannot have already ended",
                    None,
                    Some(now + policy.ongoing_shift),
                ),
                (false, false) => CoherenceCheck::incoherent(
                    "An ongoing mission must have started and not yet ended",
                    Some(now - policy.ongoing_shift),
                    Some(now + policy.ongoing_shift),
                ),
            }
        }
        MissionStatus::Completed | MissionStatus::AwaitingResponse => {
            if end <= now {
                CoherenceCheck::coherent()
            } else {
                CoherenceCheck::incoherent(
                    format!("A mission in status {} must have ended", status),
                    None,
                    Some(now - policy.completed_end_offset),
                )
            }
        }
        MissionStatus::Cancelled => CoherenceCheck::coherent(),
    }
}
