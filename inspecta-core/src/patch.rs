//! Partial updates.
//!
//! A patch serializes to a JSON object holding only the fields that are set.
//! The same object is sent to the remote and shallow-merged into the local
//! store, so both backends see identical changes.

use crate::{
    record::UPDATED_AT_FIELD, ControlMotive, DecisionInfo, DocumentFile, DocumentType, FindingType,
    MissionStatus, MissionType, SanctionType, TeamMember, Timestamp,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Common behavior of the partial update types.
pub trait Patch: Serialize {
    /// JSON object for this patch with `updated_at` set to `now`.
    fn to_value(&self, now: Timestamp) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.insert(UPDATED_AT_FIELD.to_string(), serde_json::to_value(now)?);
        }
        Ok(value)
    }

    /// Whether no field is set.
    fn is_empty(&self) -> bool {
        serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_object().map(|m| m.is_empty()))
            .unwrap_or(true)
    }
}

/// Partial update of a mission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission_type: Option<MissionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::datetime::deserialize_option"
    )]
    pub start_date: Option<Timestamp>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::datetime::deserialize_option"
    )]
    pub end_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MissionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_motive: Option<ControlMotive>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<DecisionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_members: Option<Vec<TeamMember>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objectives: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_auto_status_change: Option<bool>,
}

impl Patch for MissionPatch {}

impl MissionPatch {
    /// Patch that only changes the status.
    pub fn status(status: MissionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Patch that only changes the dates.
    pub fn dates(start_date: Timestamp, end_date: Timestamp) -> Self {
        Self {
            start_date: Some(start_date),
            end_date: Some(end_date),
            ..Self::default()
        }
    }

    /// Patch that opts the mission out of automatic transitions.
    pub fn ignore_auto_status_change() -> Self {
        Self {
            ignore_auto_status_change: Some(true),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Partial update of a finding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindingPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finding_type: Option<FindingType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction_deadline_days: Option<u32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::datetime::deserialize_option"
    )]
    pub observed_at: Option<Timestamp>,
}

impl Patch for FindingPatch {}

/// Partial update of a sanction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SanctionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sanction_type: Option<SanctionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::datetime::deserialize_option"
    )]
    pub decided_at: Option<Timestamp>,
}

impl Patch for SanctionPatch {}

/// Partial update of a remark.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemarkPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Patch for RemarkPatch {}

/// Partial update of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<DocumentFile>,
}

impl Patch for DocumentPatch {}
