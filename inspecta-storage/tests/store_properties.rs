//! Property tests for the collection store, checked against a map model.

use std::collections::BTreeMap;

use inspecta_core::Collection;
use inspecta_storage::{LmdbLocalStore, LocalStore, MemoryLocalStore};
use proptest::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;
use uuid::Uuid;

#[derive(Debug, Clone)]
enum Op {
    Put { slot: usize, version: u32 },
    Update { slot: usize, version: u32 },
    Delete { slot: usize },
    DeleteByMission { mission: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..6, any::<u32>()).prop_map(|(slot, version)| Op::Put { slot, version }),
        (0usize..6, any::<u32>()).prop_map(|(slot, version)| Op::Update { slot, version }),
        (0usize..6).prop_map(|slot| Op::Delete { slot }),
        (0usize..2).prop_map(|mission| Op::DeleteByMission { mission }),
    ]
}

/// Six record ids split over two missions.
struct Fixture {
    ids: Vec<Uuid>,
    missions: [Uuid; 2],
}

impl Fixture {
    fn new() -> Self {
        Self {
            ids: (0..6).map(|_| Uuid::now_v7()).collect(),
            missions: [Uuid::now_v7(), Uuid::now_v7()],
        }
    }

    fn mission_of(&self, slot: usize) -> Uuid {
        self.missions[slot % 2]
    }
}

fn apply(store: &dyn LocalStore, fixture: &Fixture, ops: &[Op]) -> BTreeMap<Uuid, u32> {
    let mut model: BTreeMap<Uuid, u32> = BTreeMap::new();
    for op in ops {
        match op {
            Op::Put { slot, version } => {
                let id = fixture.ids[*slot];
                let entity = json!({
                    "id": id.to_string(),
                    "mission_id": fixture.mission_of(*slot).to_string(),
                    "version": version,
                });
                store
                    .put(Collection::Findings, entity)
                    .expect("put should succeed");
                model.insert(id, *version);
            }
            Op::Update { slot, version } => {
                let id = fixture.ids[*slot];
                let updated = store
                    .update(Collection::Findings, id, &json!({ "version": version }))
                    .expect("update should succeed");
                assert_eq!(updated, model.contains_key(&id));
                if let Some(v) = model.get_mut(&id) {
                    *v = *version;
                }
            }
            Op::Delete { slot } => {
                let id = fixture.ids[*slot];
                let deleted = store
                    .delete(Collection::Findings, id)
                    .expect("delete should succeed");
                assert_eq!(deleted, model.remove(&id).is_some());
            }
            Op::DeleteByMission { mission } => {
                let mission_id = fixture.missions[*mission];
                let owned: Vec<Uuid> = model
                    .keys()
                    .copied()
                    .filter(|id| {
                        let slot = fixture.ids.iter().position(|x| x == id).unwrap_or(0);
                        fixture.mission_of(slot) == mission_id
                    })
                    .collect();
                let removed = store
                    .delete_by_mission(Collection::Findings, mission_id)
                    .expect("delete_by_mission should succeed");
                assert_eq!(removed, owned.len());
                for id in owned {
                    model.remove(&id);
                }
            }
        }
    }
    model
}

fn snapshot(store: &dyn LocalStore) -> BTreeMap<Uuid, u32> {
    store
        .get_all(Collection::Findings)
        .expect("get_all should succeed")
        .iter()
        .map(|v: &Value| {
            let id = Uuid::parse_str(v["id"].as_str().unwrap_or_default()).unwrap_or_default();
            (id, v["version"].as_u64().unwrap_or_default() as u32)
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any sequence of mutations leaves the store equal to the map model.
    #[test]
    fn prop_memory_store_matches_model(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let fixture = Fixture::new();
        let store = MemoryLocalStore::in_memory();
        let model = apply(&store, &fixture, &ops);
        prop_assert_eq!(snapshot(&store), model.clone());
        prop_assert_eq!(store.count(Collection::Findings).unwrap(), model.len() as u64);
        prop_assert_eq!(store.count(Collection::Missions).unwrap(), 0);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// The LMDB medium behaves like the in-memory one and survives reopening.
    #[test]
    fn prop_lmdb_store_matches_model(ops in prop::collection::vec(op_strategy(), 0..20)) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let fixture = Fixture::new();
        let model = {
            let store = LmdbLocalStore::open(temp_dir.path(), 10).expect("open should succeed");
            apply(&store, &fixture, &ops)
        };
        let reopened = LmdbLocalStore::open(temp_dir.path(), 10).expect("reopen should succeed");
        prop_assert_eq!(snapshot(&reopened), model);
    }
}
