//! Collection-oriented local cache store.
//!
//! Each collection is a single key whose value is a JSON array of entities.
//! Operations are synchronous and never error for "not found". A payload
//! that fails to decode is treated as an empty collection and its key is
//! reset so the next write starts clean.

use std::sync::Mutex;

use inspecta_core::{
    record::{json_mission_id, json_record_id, merge_patch},
    Collection, InspectaResult, QueuedOperation, RejectedOperation, StorageError, ValidationError,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::medium::StoreMedium;

/// Reserved key holding the persisted pending queue.
pub const QUEUE_KEY: &str = "sync_queue";

/// Reserved key holding operations the remote refused during replay.
pub const REJECTED_KEY: &str = "sync_rejected";

/// Local store of JSON entities grouped by collection.
pub trait LocalStore: Send + Sync {
    /// All entities of a collection, in insertion order.
    fn get_all(&self, collection: Collection) -> InspectaResult<Vec<Value>>;

    /// One entity by id.
    fn get(&self, collection: Collection, id: Uuid) -> InspectaResult<Option<Value>>;

    /// Insert or replace an entity, keyed by its `id` field.
    fn put(&self, collection: Collection, entity: Value) -> InspectaResult<()>;

    /// Shallow-merge `patch` into an existing entity. Returns false if absent.
    fn update(&self, collection: Collection, id: Uuid, patch: &Value) -> InspectaResult<bool>;

    /// Remove an entity. Returns false if absent.
    fn delete(&self, collection: Collection, id: Uuid) -> InspectaResult<bool>;

    /// Remove every entity owned by `mission_id`. Returns how many were removed.
    fn delete_by_mission(&self, collection: Collection, mission_id: Uuid) -> InspectaResult<usize>;

    /// Remove every entity of a collection.
    fn clear(&self, collection: Collection) -> InspectaResult<()>;

    /// Replace a whole collection.
    fn replace_all(&self, collection: Collection, entities: Vec<Value>) -> InspectaResult<()>;

    /// Replace the entities owned by `mission_id`, leaving other missions untouched.
    fn replace_for_mission(
        &self,
        collection: Collection,
        mission_id: Uuid,
        entities: Vec<Value>,
    ) -> InspectaResult<()>;

    /// Number of entities in a collection.
    fn count(&self, collection: Collection) -> InspectaResult<u64>;

    /// Load the persisted pending queue.
    fn load_queue(&self) -> InspectaResult<Vec<QueuedOperation>>;

    /// Persist the pending queue.
    fn save_queue(&self, ops: &[QueuedOperation]) -> InspectaResult<()>;

    /// Load operations the remote refused.
    fn load_rejected(&self) -> InspectaResult<Vec<RejectedOperation>>;

    /// Persist operations the remote refused.
    fn save_rejected(&self, ops: &[RejectedOperation]) -> InspectaResult<()>;
}

/// [`LocalStore`] over any [`StoreMedium`].
///
/// Read-modify-write sequences are serialized by an internal write guard so
/// two concurrent `put`s on one collection never lose an entity.
pub struct CollectionStore<M: StoreMedium> {
    medium: M,
    write_guard: Mutex<()>,
}

impl<M: StoreMedium> CollectionStore<M> {
    pub fn new(medium: M) -> Self {
        Self {
            medium,
            write_guard: Mutex::new(()),
        }
    }

    /// Access the underlying medium.
    pub fn medium(&self) -> &M {
        &self.medium
    }

    /// Decode the JSON array stored under `key`. `None` means the payload is corrupt.
    fn decode_array<T: DeserializeOwned>(&self, key: &str) -> InspectaResult<Option<Vec<T>>> {
        let Some(bytes) = self.medium.read(key)? else {
            return Ok(Some(Vec::new()));
        };
        match serde_json::from_slice::<Vec<T>>(&bytes) {
            Ok(items) => Ok(Some(items)),
            Err(e) => {
                tracing::warn!(
                    key = key,
                    error = %e,
                    bytes = bytes.len(),
                    "Corrupt local payload, resetting to empty"
                );
                Ok(None)
            }
        }
    }

    /// Like [`Self::load_array`], for callers already holding the write guard.
    fn load_array_locked<T: DeserializeOwned>(&self, key: &str) -> InspectaResult<Vec<T>> {
        match self.decode_array(key)? {
            Some(items) => Ok(items),
            None => {
                self.medium.write(key, b"[]")?;
                Ok(Vec::new())
            }
        }
    }

    /// Decode a JSON array stored under `key`, resetting the key if it is corrupt.
    fn load_array<T: DeserializeOwned>(&self, key: &str) -> InspectaResult<Vec<T>> {
        if let Some(items) = self.decode_array(key)? {
            return Ok(items);
        }
        let _guard = self
            .write_guard
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        // A writer may have replaced the payload since the unguarded read.
        self.load_array_locked(key)
    }

    fn store_array<T: Serialize>(&self, key: &str, items: &[T]) -> InspectaResult<()> {
        let bytes = serde_json::to_vec(items).map_err(|e| StorageError::Corrupted {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.medium.write(key, &bytes)?;
        Ok(())
    }

    fn load(&self, collection: Collection) -> InspectaResult<Vec<Value>> {
        self.load_array(collection.as_str())
    }

    fn store(&self, collection: Collection, entities: &[Value]) -> InspectaResult<()> {
        self.store_array(collection.as_str(), entities)
    }

    /// Run a read-modify-write cycle on one collection under the write guard.
    fn modify<R>(
        &self,
        collection: Collection,
        f: impl FnOnce(&mut Vec<Value>) -> (bool, R),
    ) -> InspectaResult<R> {
        let _guard = self
            .write_guard
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        let mut entities = self.load_array_locked(collection.as_str())?;
        let (dirty, result) = f(&mut entities);
        if dirty {
            self.store(collection, &entities)?;
        }
        Ok(result)
    }
}

fn has_id(entity: &Value, id: Uuid) -> bool {
    json_record_id(entity) == Some(id)
}

impl<M: StoreMedium> LocalStore for CollectionStore<M> {
    fn get_all(&self, collection: Collection) -> InspectaResult<Vec<Value>> {
        self.load(collection)
    }

    fn get(&self, collection: Collection, id: Uuid) -> InspectaResult<Option<Value>> {
        Ok(self.load(collection)?.into_iter().find(|e| has_id(e, id)))
    }

    fn put(&self, collection: Collection, entity: Value) -> InspectaResult<()> {
        let Some(id) = json_record_id(&entity) else {
            return Err(ValidationError::RequiredFieldMissing {
                field: "id".to_string(),
            }
            .into());
        };
        self.modify(collection, |entities| {
            match entities.iter_mut().find(|e| has_id(e, id)) {
                Some(existing) => *existing = entity,
                None => entities.push(entity),
            }
            (true, ())
        })
    }

    fn update(&self, collection: Collection, id: Uuid, patch: &Value) -> InspectaResult<bool> {
        self.modify(collection, |entities| {
            match entities.iter_mut().find(|e| has_id(e, id)) {
                Some(existing) => {
                    let merged = merge_patch(existing, patch);
                    (merged, merged)
                }
                None => (false, false),
            }
        })
    }

    fn delete(&self, collection: Collection, id: Uuid) -> InspectaResult<bool> {
        self.modify(collection, |entities| {
            let before = entities.len();
            entities.retain(|e| !has_id(e, id));
            let removed = entities.len() != before;
            (removed, removed)
        })
    }

    fn delete_by_mission(&self, collection: Collection, mission_id: Uuid) -> InspectaResult<usize> {
        self.modify(collection, |entities| {
            let before = entities.len();
            entities.retain(|e| json_mission_id(e) != Some(mission_id));
            let removed = before - entities.len();
            (removed > 0, removed)
        })
    }

    fn clear(&self, collection: Collection) -> InspectaResult<()> {
        let _guard = self
            .write_guard
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        self.medium.remove(collection.as_str())?;
        Ok(())
    }

    fn replace_all(&self, collection: Collection, entities: Vec<Value>) -> InspectaResult<()> {
        let _guard = self
            .write_guard
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        self.store(collection, &entities)
    }

    fn replace_for_mission(
        &self,
        collection: Collection,
        mission_id: Uuid,
        fresh: Vec<Value>,
    ) -> InspectaResult<()> {
        self.modify(collection, |entities| {
            entities.retain(|e| json_mission_id(e) != Some(mission_id));
            entities.extend(fresh);
            (true, ())
        })
    }

    fn count(&self, collection: Collection) -> InspectaResult<u64> {
        Ok(self.load(collection)?.len() as u64)
    }

    fn load_queue(&self) -> InspectaResult<Vec<QueuedOperation>> {
        self.load_array(QUEUE_KEY)
    }

    fn save_queue(&self, ops: &[QueuedOperation]) -> InspectaResult<()> {
        let _guard = self
            .write_guard
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        self.store_array(QUEUE_KEY, ops)
    }

    fn load_rejected(&self) -> InspectaResult<Vec<RejectedOperation>> {
        self.load_array(REJECTED_KEY)
    }

    fn save_rejected(&self, ops: &[RejectedOperation]) -> InspectaResult<()> {
        let _guard = self
            .write_guard
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        self.store_array(REJECTED_KEY, ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medium::MemoryMedium;
    use chrono::Utc;
    use inspecta_core::{InspectaError, SyncAction};
    use serde_json::json;

    fn store() -> CollectionStore<MemoryMedium> {
        CollectionStore::new(MemoryMedium::new())
    }

    fn entity(id: Uuid, mission_id: Uuid, text: &str) -> Value {
        json!({"id": id.to_string(), "mission_id": mission_id.to_string(), "content": text})
    }

    #[test]
    fn test_put_is_upsert() {
        let store = store();
        let id = Uuid::now_v7();
        let mission = Uuid::now_v7();
        store
            .put(Collection::Remarks, entity(id, mission, "first"))
            .expect("put should succeed");
        store
            .put(Collection::Remarks, entity(id, mission, "second"))
            .expect("put should succeed");

        let all = store.get_all(Collection::Remarks).expect("get_all should succeed");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0]["content"], "second");
    }

    #[test]
    fn test_put_without_id_is_rejected() {
        let store = store();
        let err = store
            .put(Collection::Missions, json!({"title": "no id"}))
            .unwrap_err();
        assert!(matches!(err, InspectaError::Validation(_)));
    }

    #[test]
    fn test_not_found_is_not_an_error() {
        let store = store();
        let id = Uuid::now_v7();
        assert_eq!(store.get(Collection::Missions, id).expect("get should succeed"), None);
        assert!(!store
            .update(Collection::Missions, id, &json!({"title": "x"}))
            .expect("update should succeed"));
        assert!(!store.delete(Collection::Missions, id).expect("delete should succeed"));
    }

    #[test]
    fn test_update_merges_shallowly() {
        let store = store();
        let id = Uuid::now_v7();
        store
            .put(
                Collection::Missions,
                json!({"id": id.to_string(), "title": "t", "status": "PLANNED"}),
            )
            .expect("put should succeed");
        assert!(store
            .update(Collection::Missions, id, &json!({"status": "ONGOING"}))
            .expect("update should succeed"));

        let mission = store
            .get(Collection::Missions, id)
            .expect("get should succeed")
            .expect("mission should exist");
        assert_eq!(mission["status"], "ONGOING");
        assert_eq!(mission["title"], "t");
    }

    #[test]
    fn test_delete_by_mission_leaves_other_missions() {
        let store = store();
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        for text in ["1", "2", "3"] {
            store
                .put(Collection::Findings, entity(Uuid::now_v7(), a, text))
                .expect("put should succeed");
        }
        store
            .put(Collection::Findings, entity(Uuid::now_v7(), b, "other"))
            .expect("put should succeed");

        let removed = store
            .delete_by_mission(Collection::Findings, a)
            .expect("delete_by_mission should succeed");
        assert_eq!(removed, 3);
        assert_eq!(store.count(Collection::Findings).expect("count should succeed"), 1);
    }

    #[test]
    fn test_replace_for_mission() {
        let store = store();
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        store
            .put(Collection::Remarks, entity(Uuid::now_v7(), a, "stale"))
            .expect("put should succeed");
        store
            .put(Collection::Remarks, entity(Uuid::now_v7(), b, "keep"))
            .expect("put should succeed");

        let fresh = vec![
            entity(Uuid::now_v7(), a, "fresh-1"),
            entity(Uuid::now_v7(), a, "fresh-2"),
        ];
        store
            .replace_for_mission(Collection::Remarks, a, fresh)
            .expect("replace_for_mission should succeed");

        let all = store.get_all(Collection::Remarks).expect("get_all should succeed");
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|e| e["content"] != "stale"));
    }

    #[test]
    fn test_corrupt_collection_resets_only_itself() {
        let store = store();
        let id = Uuid::now_v7();
        store
            .put(Collection::Missions, json!({"id": id.to_string()}))
            .expect("put should succeed");
        store
            .medium()
            .inject("findings", b"{not json")
            .expect("inject should succeed");

        assert!(store
            .get_all(Collection::Findings)
            .expect("corrupt collection should read as empty")
            .is_empty());
        assert_eq!(
            store.medium().read("findings").expect("read should succeed"),
            Some(b"[]".to_vec())
        );
        assert_eq!(store.count(Collection::Missions).expect("count should succeed"), 1);
    }

    #[test]
    fn test_corrupt_reset_does_not_drop_concurrent_writes() {
        let store = store();
        store
            .medium()
            .inject("remarks", b"{not json")
            .expect("inject should succeed");
        let mission_id = Uuid::now_v7();
        let ids: Vec<Uuid> = (0..16).map(|_| Uuid::now_v7()).collect();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..8 {
                        store
                            .get_all(Collection::Remarks)
                            .expect("get_all should succeed");
                    }
                });
            }
            for id in &ids {
                let store = &store;
                scope.spawn(move || {
                    store
                        .put(Collection::Remarks, entity(*id, mission_id, "r"))
                        .expect("put should succeed");
                });
            }
        });

        let all = store.get_all(Collection::Remarks).expect("get_all should succeed");
        assert_eq!(all.len(), ids.len());
        assert!(ids.iter().all(|id| all.iter().any(|e| has_id(e, *id))));
    }

    #[test]
    fn test_put_over_corrupt_collection_starts_clean() {
        let store = store();
        store
            .medium()
            .inject("documents", b"\x00\x01")
            .expect("inject should succeed");
        let id = Uuid::now_v7();
        store
            .put(Collection::Documents, entity(id, Uuid::now_v7(), "d"))
            .expect("put should succeed");
        let all = store.get_all(Collection::Documents).expect("get_all should succeed");
        assert_eq!(all.len(), 1);
        assert!(has_id(&all[0], id));
    }

    #[test]
    fn test_clear() {
        let store = store();
        store
            .put(Collection::Documents, entity(Uuid::now_v7(), Uuid::now_v7(), "d"))
            .expect("put should succeed");
        store.clear(Collection::Documents).expect("clear should succeed");
        assert_eq!(store.count(Collection::Documents).expect("count should succeed"), 0);
    }

    #[test]
    fn test_queue_persists_in_order() {
        let store = store();
        let ops: Vec<QueuedOperation> = (0..3)
            .map(|_| {
                QueuedOperation::new(
                    Collection::Missions,
                    SyncAction::Create,
                    Uuid::now_v7(),
                    json!({}),
                    Utc::now(),
                )
            })
            .collect();
        store.save_queue(&ops).expect("save_queue should succeed");
        assert_eq!(store.load_queue().expect("load_queue should succeed"), ops);
    }

    #[test]
    fn test_corrupt_queue_reads_as_empty() {
        let store = store();
        store
            .medium()
            .inject(QUEUE_KEY, b"garbage")
            .expect("inject should succeed");
        assert!(store.load_queue().expect("load_queue should succeed").is_empty());
    }
}
