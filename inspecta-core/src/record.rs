//! Record trait shared by every persisted entity.
//!
//! Both stores address entities by `(collection, id)` and scope nested
//! records by `mission_id`. Types implementing [`Record`] tell the stores
//! which collection they live in and how to find those keys.

use crate::{Collection, Document, EntityIdType, Finding, Mission, MissionId, Remark, Sanction};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

/// JSON field holding a record's identifier.
pub const ID_FIELD: &str = "id";

/// JSON field holding the owning mission's identifier on nested records.
pub const MISSION_ID_FIELD: &str = "mission_id";

/// JSON field refreshed on every mutation.
pub const UPDATED_AT_FIELD: &str = "updated_at";

/// Marker trait for types that can be stored in a collection.
///
/// # Implementation Requirements
///
/// - `collection()` must return a consistent value for all instances
/// - `record_id()` must match the serialized `id` field
/// - `mission_id()` returns the owning mission, or the record's own id for missions
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection this record type lives in.
    fn collection() -> Collection;

    /// Unique identifier of this record.
    fn record_id(&self) -> Uuid;

    /// Mission that owns this record.
    fn mission_id(&self) -> MissionId;
}

impl Record for Mission {
    fn collection() -> Collection {
        Collection::Missions
    }

    fn record_id(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn mission_id(&self) -> MissionId {
        self.id
    }
}

impl Record for Finding {
    fn collection() -> Collection {
        Collection::Findings
    }

    fn record_id(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn mission_id(&self) -> MissionId {
        self.mission_id
    }
}

impl Record for Sanction {
    fn collection() -> Collection {
        Collection::Sanctions
    }

    fn record_id(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn mission_id(&self) -> MissionId {
        self.mission_id
    }
}

impl Record for Remark {
    fn collection() -> Collection {
        Collection::Remarks
    }

    fn record_id(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn mission_id(&self) -> MissionId {
        self.mission_id
    }
}

impl Record for Document {
    fn collection() -> Collection {
        Collection::Documents
    }

    fn record_id(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn mission_id(&self) -> MissionId {
        self.mission_id
    }
}

/// Read the `id` field of a stored JSON entity.
pub fn json_record_id(value: &serde_json::Value) -> Option<Uuid> {
    value
        .get(ID_FIELD)
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Read the `mission_id` field of a stored JSON entity.
pub fn json_mission_id(value: &serde_json::Value) -> Option<Uuid> {
    value
        .get(MISSION_ID_FIELD)
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Shallow-merge `patch` into `target`, field by field.
///
/// Non-object patches are ignored. Returns whether `target` was an object.
pub fn merge_patch(target: &mut serde_json::Value, patch: &serde_json::Value) -> bool {
    let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) else {
        return false;
    };
    for (key, value) in patch {
        if key == ID_FIELD {
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collections() {
        assert_eq!(Mission::collection(), Collection::Missions);
        assert_eq!(Finding::collection(), Collection::Findings);
        assert_eq!(Sanction::collection(), Collection::Sanctions);
        assert_eq!(Remark::collection(), Collection::Remarks);
        assert_eq!(Document::collection(), Collection::Documents);
    }

    #[test]
    fn test_merge_patch_never_rewrites_id() {
        let id = Uuid::now_v7();
        let mut target = json!({"id": id.to_string(), "title": "old", "status": "PLANNED"});
        let patch = json!({"id": Uuid::nil().to_string(), "title": "new"});
        assert!(merge_patch(&mut target, &patch));
        assert_eq!(json_record_id(&target), Some(id));
        assert_eq!(target["title"], "new");
        assert_eq!(target["status"], "PLANNED");
    }

    #[test]
    fn test_merge_patch_rejects_non_objects() {
        let mut target = json!([1, 2, 3]);
        assert!(!merge_patch(&mut target, &json!({"a": 1})));
    }
}
