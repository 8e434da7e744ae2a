//! Creation inputs, resolved once at the boundary into canonical records.
//!
//! Findings and sanctions are accepted either as bare text or as a
//! structured record. Both shapes deserialize through the same untagged
//! union so callers never branch on the input form downstream.

use crate::{
    generate_reference, ActorId, ControlMotive, DecisionInfo, Document, DocumentFile, DocumentId,
    DocumentType, Finding, FindingId, FindingType, Mission, MissionId, MissionStatus, MissionType,
    Remark, RemarkId, Sanction, SanctionId, SanctionType, TeamMember, Timestamp, ValidationError,
};
use serde::{Deserialize, Serialize};

fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: field.to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// MISSION
// ============================================================================

/// Fields supplied by the caller when creating a mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMission {
    #[serde(default)]
    pub reference: Option<String>,
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
    /// Defaults to PLANNED.
    #[serde(default)]
    pub status: Option<MissionStatus>,
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
}

impl NewMission {
    /// Minimal mission input; every optional field left at its default.
    pub fn new(
        title: impl Into<String>,
        organization: impl Into<String>,
        start_date: Timestamp,
        end_date: Timestamp,
    ) -> Self {
        Self {
            reference: None,
            title: title.into(),
            description: None,
            mission_type: MissionType::default(),
            organization: organization.into(),
            address: None,
            start_date,
            end_date,
            status: None,
            control_motive: ControlMotive::default(),
            decision: None,
            team_members: Vec::new(),
            objectives: Vec::new(),
            ignore_auto_status_change: false,
        }
    }

    pub fn with_status(mut self, status: MissionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_mission_type(mut self, mission_type: MissionType) -> Self {
        self.mission_type = mission_type;
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Build the canonical mission record.
    pub fn into_mission(
        self,
        id: MissionId,
        created_by: Option<ActorId>,
        now: Timestamp,
    ) -> Result<Mission, ValidationError> {
        require_text("title", &self.title)?;
        require_text("organization", &self.organization)?;
        let reference = match self.reference {
            Some(r) if !r.trim().is_empty() => r,
            _ => generate_reference(id, now),
        };
        Ok(Mission {
            id,
            reference,
            title: self.title,
            description: self.description,
            mission_type: self.mission_type,
            organization: self.organization,
            address: self.address,
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status.unwrap_or_default(),
            control_motive: self.control_motive,
            decision: self.decision,
            team_members: self.team_members,
            objectives: self.objectives,
            ignore_auto_status_change: self.ignore_auto_status_change,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }
}

// ============================================================================
// FINDING
// ============================================================================

/// Structured finding input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFinding {
    #[serde(default)]
    pub finding_type: FindingType,
    pub description: String,
    #[serde(default)]
    pub legal_reference: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub correction_deadline_days: Option<u32>,
    #[serde(default, deserialize_with = "crate::datetime::deserialize_option")]
    pub observed_at: Option<Timestamp>,
}

/// A finding given as bare text or as a structured record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FindingInput {
    RawText(String),
    Structured(NewFinding),
}

impl From<&str> for FindingInput {
    fn from(text: &str) -> Self {
        FindingInput::RawText(text.to_string())
    }
}

impl From<NewFinding> for FindingInput {
    fn from(finding: NewFinding) -> Self {
        FindingInput::Structured(finding)
    }
}

impl FindingInput {
    /// Resolve into a canonical finding. Bare text becomes an OBSERVATION.
    pub fn resolve(
        self,
        id: FindingId,
        mission_id: MissionId,
        now: Timestamp,
    ) -> Result<Finding, ValidationError> {
        let input = match self {
            FindingInput::RawText(description) => NewFinding {
                finding_type: FindingType::Observation,
                description,
                legal_reference: None,
                recommendation: None,
                correction_deadline_days: None,
                observed_at: None,
            },
            FindingInput::Structured(input) => input,
        };
        require_text("description", &input.description)?;
        Ok(Finding {
            id,
            mission_id,
            finding_type: input.finding_type,
            description: input.description,
            legal_reference: input.legal_reference,
            recommendation: input.recommendation,
            correction_deadline_days: input.correction_deadline_days,
            observed_at: input.observed_at,
            created_at: now,
            updated_at: now,
        })
    }
}

// ============================================================================
// SANCTION
// ============================================================================

/// Structured sanction input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSanction {
    #[serde(default)]
    pub sanction_type: SanctionType,
    pub description: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "crate::datetime::deserialize_option")]
    pub decided_at: Option<Timestamp>,
}

/// A sanction given as bare text or as a structured record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SanctionInput {
    RawText(String),
    Structured(NewSanction),
}

impl From<&str> for SanctionInput {
    fn from(text: &str) -> Self {
        SanctionInput::RawText(text.to_string())
    }
}

impl From<NewSanction> for SanctionInput {
    fn from(sanction: NewSanction) -> Self {
        SanctionInput::Structured(sanction)
    }
}

impl SanctionInput {
    /// Resolve into a canonical sanction. Bare text becomes a WARNING.
    pub fn resolve(
        self,
        id: SanctionId,
        mission_id: MissionId,
        now: Timestamp,
    ) -> Result<Sanction, ValidationError> {
        let input = match self {
            SanctionInput::RawText(description) => NewSanction {
                sanction_type: SanctionType::Warning,
                description,
                amount: None,
                decided_at: None,
            },
            SanctionInput::Structured(input) => input,
        };
        require_text("description", &input.description)?;
        if let Some(amount) = input.amount {
            if !amount.is_finite() || amount < 0.0 {
                return Err(ValidationError::InvalidValue {
                    field: "amount".to_string(),
                    reason: format!("must be a non-negative number, got {amount}"),
                });
            }
        }
        Ok(Sanction {
            id,
            mission_id,
            sanction_type: input.sanction_type,
            description: input.description,
            amount: input.amount,
            decided_at: input.decided_at,
            created_at: now,
            updated_at: now,
        })
    }
}

// ============================================================================
// REMARK & DOCUMENT
// ============================================================================

/// Remark input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRemark {
    pub content: String,
    #[serde(default)]
    pub author: Option<ActorId>,
}

impl NewRemark {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            author: None,
        }
    }

    pub fn into_remark(
        self,
        id: RemarkId,
        mission_id: MissionId,
        now: Timestamp,
    ) -> Result<Remark, ValidationError> {
        require_text("content", &self.content)?;
        Ok(Remark {
            id,
            mission_id,
            content: self.content,
            author: self.author,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Document input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    #[serde(default)]
    pub document_type: DocumentType,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub file: Option<DocumentFile>,
}

impl NewDocument {
    /// Document input carrying an encoded binary payload.
    pub fn from_bytes(
        title: impl Into<String>,
        document_type: DocumentType,
        bytes: &[u8],
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        let (content, file) = Document::encode_payload(bytes, file_name, mime_type);
        Self {
            title: title.into(),
            document_type,
            content: Some(content),
            file: Some(file),
        }
    }

    pub fn into_document(
        self,
        id: DocumentId,
        mission_id: MissionId,
        now: Timestamp,
    ) -> Result<Document, ValidationError> {
        require_text("title", &self.title)?;
        let document = Document {
            id,
            mission_id,
            title: self.title,
            document_type: self.document_type,
            content: self.content,
            file: self.file,
            created_at: now,
            updated_at: now,
        };
        document.decode_content()?;
        Ok(document)
    }
}
