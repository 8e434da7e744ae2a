//! Typed access on top of the JSON store.

use inspecta_core::{InspectaResult, MissionId, Record, StorageError, EntityIdType};
use uuid::Uuid;

use crate::store::LocalStore;

/// Typed extension of [`LocalStore`].
///
/// Individual entries that no longer decode as `R` are skipped and logged
/// rather than failing the whole read.
pub trait RecordStore: LocalStore {
    /// Every decodable record of `R`'s collection.
    fn records<R: Record>(&self) -> InspectaResult<Vec<R>> {
        let values = self.get_all(R::collection())?;
        Ok(values.into_iter().filter_map(decode_logged::<R>).collect())
    }

    /// Records of `R`'s collection owned by `mission_id`.
    fn records_for_mission<R: Record>(&self, mission_id: MissionId) -> InspectaResult<Vec<R>> {
        Ok(self
            .records::<R>()?
            .into_iter()
            .filter(|r| r.mission_id() == mission_id)
            .collect())
    }

    /// One record by id.
    fn record<R: Record>(&self, id: Uuid) -> InspectaResult<Option<R>> {
        Ok(self.get(R::collection(), id)?.and_then(decode_logged::<R>))
    }

    /// Insert or replace a record.
    fn put_record<R: Record>(&self, record: &R) -> InspectaResult<()> {
        let value = serde_json::to_value(record).map_err(|e| StorageError::Serialization {
            collection: R::collection(),
            reason: e.to_string(),
        })?;
        self.put(R::collection(), value)
    }

    /// Whether a mission with this id is cached.
    fn has_mission(&self, mission_id: MissionId) -> InspectaResult<bool> {
        Ok(self
            .get(inspecta_core::Collection::Missions, mission_id.as_uuid())?
            .is_some())
    }
}

impl<T: LocalStore + ?Sized> RecordStore for T {}

fn decode_logged<R: Record>(value: serde_json::Value) -> Option<R> {
    match serde_json::from_value::<R>(value) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(
                collection = %R::collection(),
                error = %e,
                "Skipping undecodable local record"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{medium::MemoryMedium, store::CollectionStore};
    use chrono::Utc;
    use inspecta_core::{Collection, NewRemark, RemarkId, Remark};
    use serde_json::json;

    #[test]
    fn test_typed_round_trip_and_skip() {
        let store = CollectionStore::new(MemoryMedium::new());
        let mission_id = MissionId::now_v7();
        let remark: Remark = NewRemark::new("RAS")
            .into_remark(RemarkId::now_v7(), mission_id, Utc::now())
            .expect("remark should build");
        store.put_record(&remark).expect("put_record should succeed");
        store
            .put(Collection::Remarks, json!({"id": Uuid::now_v7().to_string()}))
            .expect("put should succeed");

        let remarks: Vec<Remark> = store.records().expect("records should succeed");
        assert_eq!(remarks, vec![remark.clone()]);

        let scoped: Vec<Remark> = store
            .records_for_mission(mission_id)
            .expect("records_for_mission should succeed");
        assert_eq!(scoped.len(), 1);
        assert!(store
            .records_for_mission::<Remark>(MissionId::now_v7())
            .expect("records_for_mission should succeed")
            .is_empty());

        let fetched: Option<Remark> = store
            .record(remark.id.as_uuid())
            .expect("record should succeed");
        assert_eq!(fetched, Some(remark));
    }
}
