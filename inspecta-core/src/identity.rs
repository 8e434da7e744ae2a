//! Identity types for INSPECTA entities

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// SHA-256 content hash for document integrity verification.
pub type ContentHash = [u8; 32];

/// Compute SHA-256 hash of content.
pub fn compute_content_hash(content: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Common behavior of the strongly-typed entity identifiers.
pub trait EntityIdType: Copy + Eq + std::hash::Hash {
    /// Wrap an existing UUID.
    fn new(id: Uuid) -> Self;

    /// Access the underlying UUID.
    fn as_uuid(&self) -> Uuid;

    /// Generate a fresh timestamp-sortable identifier.
    fn now_v7() -> Self {
        Self::new(Uuid::now_v7())
    }
}

macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl EntityIdType for $name {
            fn new(id: Uuid) -> Self {
                Self(id)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_entity_id!(
    /// Identifier of a mission (the root case record).
    MissionId
);
define_entity_id!(
    /// Identifier of a finding attached to a mission.
    FindingId
);
define_entity_id!(
    /// Identifier of a sanction attached to a mission.
    SanctionId
);
define_entity_id!(
    /// Identifier of a remark attached to a mission.
    RemarkId
);
define_entity_id!(
    /// Identifier of a document attached to a mission.
    DocumentId
);
define_entity_id!(
    /// Identifier of the actor (user) that performed a mutation.
    ActorId
);
define_entity_id!(
    /// Identifier of an entry in the pending sync queue.
    OperationId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_id_roundtrips_through_string() {
        let id = MissionId::now_v7();
        let parsed: MissionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_typed_id_serializes_as_bare_uuid() {
        let uuid = Uuid::now_v7();
        let id = FindingId::new(uuid);
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(uuid.to_string()));
    }

    #[test]
    fn test_content_hash_is_stable() {
        let a = compute_content_hash(b"rapport de controle");
        let b = compute_content_hash(b"rapport de controle");
        assert_eq!(a, b);
        assert_ne!(a, compute_content_hash(b"other"));
    }
}
