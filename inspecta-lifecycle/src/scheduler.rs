//! Lifecycle scheduler: upcoming status changes and their resolution.

use std::sync::Arc;

use chrono::Utc;
use inspecta_core::{
    InspectaResult, LifecyclePolicy, Mission, MissionId, MissionPatch, MissionStatus, Timestamp,
    ValidationError,
};
use serde::{Deserialize, Serialize};

use crate::gateway::MissionGateway;
use crate::machine::{check_coherence, decide_transition, next_status, CoherenceCheck};

// ============================================================================
// REPORT TYPES
// ============================================================================

/// A mission whose status is about to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusAlert {
    pub mission: Mission,
    pub proposed_status: MissionStatus,
    /// The transition is already due, not merely upcoming.
    pub due: bool,
}

/// Missions entering or leaving their active period soon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpcomingChanges {
    pub starting_soon: Vec<StatusAlert>,
    pub ending_soon: Vec<StatusAlert>,
}

impl UpcomingChanges {
    pub fn is_empty(&self) -> bool {
        self.starting_soon.is_empty() && self.ending_soon.is_empty()
    }

    pub fn len(&self) -> usize {
        self.starting_soon.len() + self.ending_soon.len()
    }
}

/// Outcome of one automatic status pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdateSummary {
    pub updated: usize,
    pub started: usize,
    pub completed: usize,
}

/// A mission whose status disagrees with its dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncoherentMission {
    pub mission: Mission,
    pub check: CoherenceCheck,
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// Detects and resolves mission status changes.
pub struct LifecycleScheduler {
    missions: Arc<dyn MissionGateway>,
    policy: LifecyclePolicy,
}

impl LifecycleScheduler {
    pub fn new(missions: Arc<dyn MissionGateway>, policy: LifecyclePolicy) -> Self {
        Self { missions, policy }
    }

    pub fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    pub async fn check_upcoming_status_changes(&self) -> InspectaResult<UpcomingChanges> {
        self.check_upcoming_status_changes_at(Utc::now()).await
    }

    /// Eligible PLANNED missions starting within the starting window and
    /// ONGOING missions ending within the ending window, as of `now`.
    pub async fn check_upcoming_status_changes_at(
        &self,
        now: Timestamp,
    ) -> InspectaResult<UpcomingChanges> {
        let starting_horizon = now + self.policy.starting_window;
        let ending_horizon = now + self.policy.ending_window;
        let mut changes = UpcomingChanges::default();

        for mission in self.missions.list_missions().await? {
            if !mission.is_auto_status_eligible() {
                continue;
            }
            let due = decide_transition(mission.status, mission.start_date, mission.end_date, now)
                .is_some();
            match mission.status {
                MissionStatus::Planned if mission.start_date <= starting_horizon => {
                    changes.starting_soon.push(StatusAlert {
                        mission,
                        proposed_status: MissionStatus::Ongoing,
                        due,
                    });
                }
                MissionStatus::Ongoing if mission.end_date <= ending_horizon => {
                    changes.ending_soon.push(StatusAlert {
                        mission,
                        proposed_status: MissionStatus::Completed,
                        due,
                    });
                }
                _ => {}
            }
        }

        changes
            .starting_soon
            .sort_by_key(|alert| alert.mission.start_date);
        changes.ending_soon.sort_by_key(|alert| alert.mission.end_date);
        tracing::debug!(
            starting_soon = changes.starting_soon.len(),
            ending_soon = changes.ending_soon.len(),
            "Checked upcoming status changes"
        );
        Ok(changes)
    }

    /// Commit the proposed transition for a mission.
    ///
    /// Returns `None` if the mission does not exist.
    pub async fn approve_transition(&self, id: MissionId) -> InspectaResult<Option<Mission>> {
        let Some(mission) = self.missions.find_mission(id).await? else {
            return Ok(None);
        };
        let Some(next) = next_status(mission.status) else {
            return Err(ValidationError::InvalidValue {
                field: "status".to_string(),
                reason: format!("no transition from {}", mission.status),
            }
            .into());
        };
        let updated = self
            .missions
            .patch_mission(id, &MissionPatch::status(next))
            .await?;
        tracing::info!(
            mission_id = %id,
            from = %mission.status,
            to = %next,
            "Approved status change"
        );
        Ok(updated)
    }

    /// Opt a mission out of automatic status changes.
    pub async fn reject_transition(&self, id: MissionId) -> InspectaResult<Option<Mission>> {
        let updated = self
            .missions
            .patch_mission(id, &MissionPatch::ignore_auto_status_change())
            .await?;
        if updated.is_some() {
            tracing::info!(mission_id = %id, "Rejected status change, automatic changes disabled");
        }
        Ok(updated)
    }

    /// Commit new dates, leaving the status unchanged.
    pub async fn edit_mission_dates(
        &self,
        id: MissionId,
        start: Timestamp,
        end: Timestamp,
    ) -> InspectaResult<Option<Mission>> {
        if end < start {
            return Err(ValidationError::InvalidValue {
                field: "end_date".to_string(),
                reason: "must not precede start_date".to_string(),
            }
            .into());
        }
        self.missions
            .patch_mission(id, &MissionPatch::dates(start, end))
            .await
    }

    pub async fn update_mission_statuses(&self) -> InspectaResult<StatusUpdateSummary> {
        self.update_mission_statuses_at(Utc::now()).await
    }

    /// Apply every due transition in one pass.
    pub async fn update_mission_statuses_at(
        &self,
        now: Timestamp,
    ) -> InspectaResult<StatusUpdateSummary> {
        let mut summary = StatusUpdateSummary::default();
        for mission in self.missions.list_missions().await? {
            if !mission.is_auto_status_eligible() {
                continue;
            }
            let Some(next) =
                decide_transition(mission.status, mission.start_date, mission.end_date, now)
            else {
                continue;
            };
            if self
                .missions
                .patch_mission(mission.id, &MissionPatch::status(next))
                .await?
                .is_none()
            {
                continue;
            }
            summary.updated += 1;
            match next {
                MissionStatus::Ongoing => summary.started += 1,
                MissionStatus::Completed => summary.completed += 1,
                _ => {}
            }
        }
        if summary.updated > 0 {
            tracing::info!(
                updated = summary.updated,
                started = summary.started,
                completed = summary.completed,
                "Advanced mission statuses"
            );
        }
        Ok(summary)
    }

    pub async fn find_incoherent_missions(&self) -> InspectaResult<Vec<IncoherentMission>> {
        self.find_incoherent_missions_at(Utc::now()).await
    }

    pub async fn find_incoherent_missions_at(
        &self,
        now: Timestamp,
    ) -> InspectaResult<Vec<IncoherentMission>> {
        Ok(self
            .missions
            .list_missions()
            .await?
            .into_iter()
            .filter_map(|mission| {
                let check = check_coherence(
                    mission.status,
                    mission.start_date,
                    mission.end_date,
                    now,
                    &self.policy,
                );
                (!check.coherent).then_some(IncoherentMission { mission, check })
            })
            .collect())
    }
}
