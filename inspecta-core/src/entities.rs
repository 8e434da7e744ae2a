//! Core entity structures

use crate::{
    compute_content_hash, ActorId, ControlMotive, DocumentId, DocumentType, EntityIdType, FindingId,
    FindingType, MissionId, MissionStatus, MissionType, RemarkId, SanctionId, SanctionType,
    Timestamp, ValidationError,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Decision taken at the end of a control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DecisionInfo {
    pub reference: Option<String>,
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "crate::datetime::deserialize_option")]
    pub decided_at: Option<Timestamp>,
    pub decided_by: Option<String>,
}

/// Member of the inspection team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub role: Option<String>,
}

/// Mission - the root case record of a control/inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    pub reference: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mission_type: MissionType,
    pub organization: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(deserialize_with = "crate::datetime::deserialize")]
    pub start_date: Timestamp,
    #[serde(deserialize_with = "crate::datetime::deserialize")]
    pub end_date: Timestamp,
    #[serde(default)]
    pub status: MissionStatus,
    #[serde(default)]
    pub control_motive: ControlMotive,
    #[serde(default)]
    pub decision: Option<DecisionInfo>,
    #[serde(default)]
    pub team_members: Vec<TeamMember>,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub ignore_auto_status_change: bool,
    #[serde(default)]
    pub created_by: Option<ActorId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Mission {
    /// Whether the lifecycle scheduler may touch this mission.
    pub fn is_auto_status_eligible(&self) -> bool {
        !self.ignore_auto_status_change && self.status.is_auto_advanceable()
    }

    /// Whether the stored dates are in the expected order.
    pub fn has_ordered_dates(&self) -> bool {
        self.start_date <= self.end_date
    }
}

/// Generate a human-readable mission reference such as `MSN-20260314-4F2A9C`.
///
/// The suffix is taken from the random tail of the UUIDv7, not its timestamp prefix.
pub fn generate_reference(id: MissionId, now: Timestamp) -> String {
    let simple = id.as_uuid().simple().to_string();
    let suffix = &simple[simple.len() - 6..];
    format!("MSN-{}-{}", now.format("%Y%m%d"), suffix.to_ascii_uppercase())
}

/// Finding - an observation recorded during a mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: FindingId,
    pub mission_id: MissionId,
    #[serde(default)]
    pub finding_type: FindingType,
    pub description: String,
    #[serde(default)]
    pub legal_reference: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
    /// Days granted to correct the finding.
    #[serde(default)]
    pub correction_deadline_days: Option<u32>,
    #[serde(default, deserialize_with = "crate::datetime::deserialize_option")]
    pub observed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Sanction - a measure pronounced against the controlled organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sanction {
    pub id: SanctionId,
    pub mission_id: MissionId,
    #[serde(default)]
    pub sanction_type: SanctionType,
    pub description: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "crate::datetime::deserialize_option")]
    pub decided_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Remark - a free-text note on a mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remark {
    pub id: RemarkId,
    pub mission_id: MissionId,
    pub content: String,
    #[serde(default)]
    pub author: Option<ActorId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// File metadata for an attached document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFile {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    /// Hex-encoded SHA-256 of the decoded content.
    pub content_hash: String,
}

/// Document - a file attached to a mission, stored inline as base64 text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub mission_id: MissionId,
    pub title: String,
    #[serde(default)]
    pub document_type: DocumentType,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub file: Option<DocumentFile>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Document {
    /// Encode a binary payload and compute its file metadata.
    pub fn encode_payload(
        bytes: &[u8],
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> (String, DocumentFile) {
        let file = DocumentFile {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            size_bytes: bytes.len() as u64,
            content_hash: hex::encode(compute_content_hash(bytes)),
        };
        (BASE64.encode(bytes), file)
    }

    /// Decode the stored payload, verifying it against the recorded hash.
    pub fn decode_content(&self) -> Result<Option<Vec<u8>>, ValidationError> {
        let Some(content) = &self.content else {
            return Ok(None);
        };
        let bytes = BASE64
            .decode(content.as_bytes())
            .map_err(|e| ValidationError::InvalidValue {
                field: "content".to_string(),
                reason: e.to_string(),
            })?;
        if let Some(file) = &self.file {
            let actual = hex::encode(compute_content_hash(&bytes));
            if !actual.eq_ignore_ascii_case(&file.content_hash) {
                return Err(ValidationError::InvalidValue {
                    field: "content".to_string(),
                    reason: format!(
                        "content hash mismatch: expected {}, got {}",
                        file.content_hash, actual
                    ),
                });
            }
        }
        Ok(Some(bytes))
    }
}
