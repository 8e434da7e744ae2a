//! Error types for INSPECTA operations

use crate::Collection;
use thiserror::Error;
use uuid::Uuid;

/// Local store errors.
///
/// A corrupt collection payload is recovered inside the store and only
/// reported through [`StorageError::Corrupted`] by the medium layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Corrupted payload in {key}: {reason}")]
    Corrupted { key: String, reason: String },

    #[error("Storage medium failure: {reason}")]
    Medium { reason: String },

    #[error("Serialization failed for {collection}: {reason}")]
    Serialization {
        collection: Collection,
        reason: String,
    },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Remote data service errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Transport failure: {reason}")]
    Transport { reason: String },

    #[error("Remote call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid response from remote: {reason}")]
    InvalidResponse { reason: String },

    #[error("Remote rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Permission denied by remote (status {status})")]
    PermissionDenied { status: u16 },
}

impl RemoteError {
    /// Whether this error belongs to the transport class handled by the offline path.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            RemoteError::Transport { .. }
                | RemoteError::Timeout { .. }
                | RemoteError::InvalidResponse { .. }
        )
    }
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Unknown mission: {mission_id}")]
    UnknownMission { mission_id: Uuid },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read config file {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Failed to parse config: {reason}")]
    ParseFailed { reason: String },
}

/// Master error type for all INSPECTA errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InspectaError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl InspectaError {
    /// Whether this error is a transport-class remote failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, InspectaError::Remote(e) if e.is_transport())
    }
}

/// Result type alias for INSPECTA operations.
pub type InspectaResult<T> = Result<T, InspectaError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_class() {
        assert!(RemoteError::Transport { reason: "reset".into() }.is_transport());
        assert!(RemoteError::Timeout { timeout_ms: 500 }.is_transport());
        assert!(RemoteError::InvalidResponse { reason: "html".into() }.is_transport());
        assert!(!RemoteError::Rejected {
            status: 422,
            message: "bad".into()
        }
        .is_transport());
        assert!(!RemoteError::PermissionDenied { status: 403 }.is_transport());
    }

    #[test]
    fn test_master_error_wraps_sub_errors() {
        let err: InspectaError = RemoteError::Timeout { timeout_ms: 10 }.into();
        assert!(err.is_transport());
        assert!(format!("{}", err).contains("timed out"));

        let err: InspectaError = ValidationError::UnknownMission {
            mission_id: Uuid::nil(),
        }
        .into();
        assert!(!err.is_transport());
        assert!(format!("{}", err).contains("Unknown mission"));
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Serialization {
            collection: Collection::Findings,
            reason: "eof".into(),
        };
        assert_eq!(format!("{}", err), "Serialization failed for findings: eof");
    }
}
