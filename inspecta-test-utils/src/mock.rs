//! In-memory stand-in for the remote data service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use inspecta_core::{
    record::{json_mission_id, json_record_id, merge_patch, ID_FIELD},
    Collection, RemoteError,
};
use inspecta_remote::RemoteDataService;
use serde_json::Value;
use uuid::Uuid;

/// Mock remote service with failure injection and call counters.
///
/// - `set_offline(true)` makes every call fail with a transport error
/// - `fail_next(n)` fails the next `n` calls with a transport error
/// - `reject_next(n)` rejects the next `n` writes with a 422
/// - `assign_server_ids(true)` replaces client ids on create
/// - `set_latency(d)` delays every call
#[derive(Debug, Default)]
pub struct MockRemoteService {
    tables: Mutex<HashMap<Collection, Vec<Value>>>,
    offline: AtomicBool,
    fail_next: AtomicUsize,
    reject_next: AtomicUsize,
    deny_all: AtomicBool,
    assign_ids: AtomicBool,
    latency: Mutex<Option<Duration>>,
    writes: AtomicU64,
    reads: AtomicU64,
    probes: AtomicU64,
}

impl MockRemoteService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    pub fn reject_next(&self, count: usize) {
        self.reject_next.store(count, Ordering::SeqCst);
    }

    pub fn deny_all(&self, deny: bool) {
        self.deny_all.store(deny, Ordering::SeqCst);
    }

    pub fn assign_server_ids(&self, enabled: bool) {
        self.assign_ids.store(enabled, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut guard) = self.latency.lock() {
            *guard = latency;
        }
    }

    /// Number of successful mutating calls.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of successful read calls (list, read, count).
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `test_connection` calls.
    pub fn probe_count(&self) -> u64 {
        self.probes.load(Ordering::SeqCst)
    }

    /// Insert rows directly, bypassing counters and failure injection.
    pub fn seed(&self, collection: Collection, rows: Vec<Value>) {
        self.tables().entry(collection).or_default().extend(rows);
    }

    /// Snapshot of a collection's rows.
    pub fn rows(&self, collection: Collection) -> Vec<Value> {
        self.tables().get(&collection).cloned().unwrap_or_default()
    }

    /// One row by id.
    pub fn row(&self, collection: Collection, id: Uuid) -> Option<Value> {
        self.rows(collection)
            .into_iter()
            .find(|r| json_record_id(r) == Some(id))
    }

    fn tables(&self) -> MutexGuard<'_, HashMap<Collection, Vec<Value>>> {
        match self.tables.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    async fn gate(&self, write: bool) -> Result<(), RemoteError> {
        let latency = self.latency.lock().ok().and_then(|g| *g);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Transport {
                reason: "mock remote offline".to_string(),
            });
        }
        if take_one(&self.fail_next) {
            return Err(RemoteError::Transport {
                reason: "injected transport failure".to_string(),
            });
        }
        if self.deny_all.load(Ordering::SeqCst) {
            return Err(RemoteError::PermissionDenied { status: 403 });
        }
        if write && take_one(&self.reject_next) {
            return Err(RemoteError::Rejected {
                status: 422,
                message: "injected rejection".to_string(),
            });
        }
        Ok(())
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl RemoteDataService for MockRemoteService {
    async fn create(&self, collection: Collection, entity: &Value) -> Result<Value, RemoteError> {
        self.gate(true).await?;
        let mut row = entity.clone();
        if self.assign_ids.load(Ordering::SeqCst) {
            if let Value::Object(map) = &mut row {
                map.insert(
                    ID_FIELD.to_string(),
                    Value::String(Uuid::now_v7().to_string()),
                );
            }
        }
        let Some(id) = json_record_id(&row) else {
            return Err(RemoteError::Rejected {
                status: 400,
                message: "missing id".to_string(),
            });
        };
        let mut tables = self.tables();
        let rows = tables.entry(collection).or_default();
        if rows.iter().any(|r| json_record_id(r) == Some(id)) {
            return Err(RemoteError::Rejected {
                status: 409,
                message: format!("duplicate key {}", id),
            });
        }
        rows.push(row.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(row)
    }

    async fn read(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, RemoteError> {
        self.gate(false).await?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.row(collection, id))
    }

    async fn update(
        &self,
        collection: Collection,
        id: Uuid,
        patch: &Value,
    ) -> Result<Value, RemoteError> {
        self.gate(true).await?;
        let mut tables = self.tables();
        let row = tables
            .entry(collection)
            .or_default()
            .iter_mut()
            .find(|r| json_record_id(r) == Some(id))
            .ok_or_else(|| RemoteError::Rejected {
                status: 404,
                message: format!("no {} row with id {}", collection, id),
            })?;
        merge_patch(row, patch);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(row.clone())
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, RemoteError> {
        self.gate(true).await?;
        let mut tables = self.tables();
        let rows = tables.entry(collection).or_default();
        let before = rows.len();
        rows.retain(|r| json_record_id(r) != Some(id));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(rows.len() != before)
    }

    async fn delete_by_mission(
        &self,
        collection: Collection,
        mission_id: Uuid,
    ) -> Result<(), RemoteError> {
        self.gate(true).await?;
        self.tables()
            .entry(collection)
            .or_default()
            .retain(|r| json_mission_id(r) != Some(mission_id));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list(
        &self,
        collection: Collection,
        mission_id: Option<Uuid>,
    ) -> Result<Vec<Value>, RemoteError> {
        self.gate(false).await?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .rows(collection)
            .into_iter()
            .filter(|r| mission_id.is_none() || json_mission_id(r) == mission_id)
            .collect())
    }

    async fn count(&self, collection: Collection) -> Result<u64, RemoteError> {
        self.gate(false).await?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows(collection).len() as u64)
    }

    async fn test_connection(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.gate(false).await.is_ok()
    }
}
