//! Enum types for INSPECTA entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// PARSE ERROR
// ============================================================================

/// Error when parsing an invalid enum string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for EnumParseError {}

/// Implements `as_db_str`, `from_db_str`, `Display` and `FromStr` from one
/// variant/string table so the wire form is defined exactly once.
macro_rules! db_enum_strings {
    ($ty:ident, $kind:literal, { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            /// Convert to database string representation.
            pub fn as_db_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $s,)+
                }
            }

            /// Parse from database string representation (case-insensitive).
            pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
                let upper = s.trim().to_ascii_uppercase();
                match upper.as_str() {
                    $($s => Ok($ty::$variant),)+
                    _ => Err(EnumParseError { kind: $kind, value: s.to_string() }),
                }
            }

            /// All variants in declaration order.
            pub fn all() -> &'static [$ty] {
                &[$($ty::$variant,)+]
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_db_str())
            }
        }

        impl FromStr for $ty {
            type Err = EnumParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_db_str(s)
            }
        }
    };
}

// ============================================================================
// MISSION ENUMS
// ============================================================================

/// Lifecycle status of a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionStatus {
    #[default]
    Planned,
    Ongoing,
    Completed,
    Cancelled,
    AwaitingResponse,
}

db_enum_strings!(MissionStatus, "mission status", {
    Planned => "PLANNED",
    Ongoing => "ONGOING",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
    AwaitingResponse => "AWAITING_RESPONSE",
});

impl MissionStatus {
    /// Whether the lifecycle scheduler may advance this status on its own.
    pub fn is_auto_advanceable(&self) -> bool {
        matches!(self, MissionStatus::Planned | MissionStatus::Ongoing)
    }
}

/// How the control is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionType {
    #[default]
    OnSite,
    Desk,
    Online,
}

db_enum_strings!(MissionType, "mission type", {
    OnSite => "ON_SITE",
    Desk => "DESK",
    Online => "ONLINE",
});

/// Why the control was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMotive {
    #[default]
    AnnualProgram,
    Complaint,
    Referral,
    FollowUp,
    ExOfficio,
}

db_enum_strings!(ControlMotive, "control motive", {
    AnnualProgram => "ANNUAL_PROGRAM",
    Complaint => "COMPLAINT",
    Referral => "REFERRAL",
    FollowUp => "FOLLOW_UP",
    ExOfficio => "EX_OFFICIO",
});

// ============================================================================
// NESTED RECORD ENUMS
// ============================================================================

/// Severity class of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingType {
    MajorNonConformity,
    MinorNonConformity,
    #[default]
    Observation,
    Conformity,
}

db_enum_strings!(FindingType, "finding type", {
    MajorNonConformity => "MAJOR_NON_CONFORMITY",
    MinorNonConformity => "MINOR_NON_CONFORMITY",
    Observation => "OBSERVATION",
    Conformity => "CONFORMITY",
});

/// Kind of sanction pronounced after a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SanctionType {
    #[default]
    Warning,
    FormalNotice,
    Injunction,
    ProcessingRestriction,
    MonetaryPenalty,
}

db_enum_strings!(SanctionType, "sanction type", {
    Warning => "WARNING",
    FormalNotice => "FORMAL_NOTICE",
    Injunction => "INJUNCTION",
    ProcessingRestriction => "PROCESSING_RESTRICTION",
    MonetaryPenalty => "MONETARY_PENALTY",
});

impl SanctionType {
    /// Whether a sanction of this type carries an amount.
    pub fn is_monetary(&self) -> bool {
        matches!(self, SanctionType::MonetaryPenalty)
    }
}

/// Kind of document attached to a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Report,
    NoticeLetter,
    Correspondence,
    Evidence,
    Decision,
    #[default]
    Other,
}

db_enum_strings!(DocumentType, "document type", {
    Report => "REPORT",
    NoticeLetter => "NOTICE_LETTER",
    Correspondence => "CORRESPONDENCE",
    Evidence => "EVIDENCE",
    Decision => "DECISION",
    Other => "OTHER",
});

// ============================================================================
// STORAGE ENUMS
// ============================================================================

/// Named entity collection, shared by the local store and the remote service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Missions,
    Findings,
    Sanctions,
    Remarks,
    Documents,
}

impl Collection {
    /// Every collection, missions first.
    pub const ALL: [Collection; 5] = [
        Collection::Missions,
        Collection::Findings,
        Collection::Sanctions,
        Collection::Remarks,
        Collection::Documents,
    ];

    /// Collections owned by a mission and removed with it.
    pub const NESTED: [Collection; 4] = [
        Collection::Findings,
        Collection::Sanctions,
        Collection::Remarks,
        Collection::Documents,
    ];

    /// Table / storage key name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Missions => "missions",
            Collection::Findings => "findings",
            Collection::Sanctions => "sanctions",
            Collection::Remarks => "remarks",
            Collection::Documents => "documents",
        }
    }

    /// Whether records of this collection carry a `mission_id`.
    pub fn is_nested(&self) -> bool {
        !matches!(self, Collection::Missions)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EnumParseError {
                kind: "collection",
                value: s.to_string(),
            })
    }
}

/// Kind of mutation recorded in the pending queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncAction::Create => f.write_str("create"),
            SyncAction::Update => f.write_str("update"),
            SyncAction::Delete => f.write_str("delete"),
        }
    }
}

/// Connection status reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Offline,
    Syncing,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connected => f.write_str("connected"),
            ConnectionStatus::Offline => f.write_str("offline"),
            ConnectionStatus::Syncing => f.write_str("syncing"),
        }
    }
}
