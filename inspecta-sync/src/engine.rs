//! Synchronization engine.
//!
//! Every mutation goes to the remote data service when it is believed
//! reachable and the pending queue is empty, and is mirrored into the local
//! cache store on success. A transport failure degrades the link, applies
//! the mutation locally and queues it for replay. Rejections surface.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use inspecta_core::record::{json_mission_id, json_record_id, ID_FIELD, MISSION_ID_FIELD};
use inspecta_core::{
    ActorId, Collection, ConnectionStatus, Document, DocumentId, DocumentPatch, DrainReport,
    EntityIdType, Finding, FindingId, FindingInput, FindingPatch, InspectaResult, Mission,
    MissionId, MissionPatch, NewDocument, NewMission, NewRemark, Patch, QueuedOperation, Record,
    RejectedOperation, Remark, RemarkId, RemarkPatch, RemoteError, Sanction, SanctionId,
    SanctionInput, SanctionPatch, StorageError, SyncAction, SyncConfig, ValidationError,
};
use inspecta_remote::RemoteDataService;
use inspecta_storage::{LocalStore, RecordStore};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::link::{Link, LinkState};
use crate::queue::PendingQueue;

/// Where a mutation is applied.
enum Route<'a> {
    Remote(&'a dyn RemoteDataService),
    /// No remote configured.
    LocalOnly,
    /// Remote configured but believed unreachable.
    Unreachable,
    /// Remote reachable but older operations are still queued.
    Backlog,
}

/// Clears the syncing flag when a drain ends, however it ends.
struct SyncingGuard<'a>(&'a AtomicBool);

impl<'a> SyncingGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Offline-first data access over a remote service and a local cache.
pub struct SyncEngine {
    local: Arc<dyn LocalStore>,
    remote: Option<Arc<dyn RemoteDataService>>,
    config: SyncConfig,
    link: Link,
    queue: PendingQueue,
    /// Serializes mutations and replayed operations.
    write_gate: Mutex<()>,
    drain_gate: Mutex<()>,
    syncing: AtomicBool,
    actor: Option<ActorId>,
}

impl SyncEngine {
    /// Build an engine, reloading any queue persisted by a previous session.
    ///
    /// Passing `None` for `remote` runs the engine local-only.
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Option<Arc<dyn RemoteDataService>>,
        config: SyncConfig,
    ) -> InspectaResult<Self> {
        config.validate()?;
        let queue = PendingQueue::load(local.clone())?;
        let initial = if remote.is_some() {
            LinkState::Connected
        } else {
            LinkState::Degraded
        };
        tracing::info!(
            remote = remote.is_some(),
            local_fallback = config.local_fallback,
            pending = queue.len(),
            "Sync engine ready"
        );
        Ok(Self {
            local,
            remote,
            config,
            link: Link::new(initial),
            queue,
            write_gate: Mutex::new(()),
            drain_gate: Mutex::new(()),
            syncing: AtomicBool::new(false),
            actor: None,
        })
    }

    /// Attribute created missions to `actor`.
    pub fn with_actor(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn local_store(&self) -> &Arc<dyn LocalStore> {
        &self.local
    }

    pub(crate) fn remote(&self) -> Option<&dyn RemoteDataService> {
        self.remote.as_deref()
    }

    // ========================================================================
    // STATUS & QUEUE
    // ========================================================================

    pub fn get_connection_status(&self) -> ConnectionStatus {
        if self.syncing.load(Ordering::SeqCst) {
            ConnectionStatus::Syncing
        } else if self.remote.is_none() || !self.link.is_connected() {
            ConnectionStatus::Offline
        } else {
            ConnectionStatus::Connected
        }
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn pending_operations(&self) -> Vec<QueuedOperation> {
        self.queue.snapshot()
    }

    /// Operations the remote refused during replay.
    pub fn rejected_operations(&self) -> Vec<RejectedOperation> {
        self.queue.rejected_snapshot()
    }

    /// Empty the rejected list, returning its entries.
    pub fn take_rejected_operations(&self) -> InspectaResult<Vec<RejectedOperation>> {
        self.queue.take_rejected()
    }

    /// Replay queued operations in order.
    ///
    /// Returns immediately with a coalesced report if another drain is running.
    pub async fn process_sync_queue(&self) -> InspectaResult<DrainReport> {
        let Some(remote) = self.remote() else {
            return Ok(DrainReport::default());
        };
        let Ok(_drain) = self.drain_gate.try_lock() else {
            tracing::debug!(pending = self.queue.len(), "Drain already running");
            return Ok(DrainReport::coalesced(self.queue.len()));
        };
        if self.queue.is_empty() {
            return Ok(DrainReport::default());
        }
        if !self.link.is_connected() && !self.probe(remote).await {
            return Ok(DrainReport {
                remaining: self.queue.len(),
                ..DrainReport::default()
            });
        }
        let _write = self.write_gate.lock().await;
        self.drain_locked(remote).await
    }

    /// Probe the remote even if the link is degraded. Returns reachability.
    pub(crate) async fn ensure_reachable(&self) -> bool {
        let Some(remote) = self.remote() else {
            return false;
        };
        self.link.is_connected() || self.probe(remote).await
    }

    pub(crate) fn mark_degraded(&self, err: &RemoteError) {
        self.link.mark_degraded(&err.to_string());
    }

    // ========================================================================
    // MISSIONS
    // ========================================================================

    pub async fn create_mission(&self, input: NewMission) -> InspectaResult<Mission> {
        let mission = input.into_mission(MissionId::now_v7(), self.actor, Utc::now())?;
        self.create_record(mission).await
    }

    pub async fn update_mission(
        &self,
        id: MissionId,
        patch: &MissionPatch,
    ) -> InspectaResult<Option<Mission>> {
        self.update_record::<Mission, _>(id.as_uuid(), patch).await
    }

    /// Delete a mission and every record nested under it.
    pub async fn delete_mission(&self, id: MissionId) -> InspectaResult<bool> {
        self.delete_record(Collection::Missions, id.as_uuid()).await
    }

    pub async fn get_all_missions(&self) -> InspectaResult<Vec<Mission>> {
        self.list_records::<Mission>(None).await
    }

    pub async fn get_mission(&self, id: MissionId) -> InspectaResult<Option<Mission>> {
        self.read_record::<Mission>(id.as_uuid()).await
    }

    // ========================================================================
    // FINDINGS
    // ========================================================================

    pub async fn create_finding(
        &self,
        mission_id: MissionId,
        input: impl Into<FindingInput>,
    ) -> InspectaResult<Finding> {
        let finding = input
            .into()
            .resolve(FindingId::now_v7(), mission_id, Utc::now())?;
        self.create_nested(finding).await
    }

    pub async fn update_finding(
        &self,
        id: FindingId,
        patch: &FindingPatch,
    ) -> InspectaResult<Option<Finding>> {
        self.update_record::<Finding, _>(id.as_uuid(), patch).await
    }

    pub async fn delete_finding(&self, id: FindingId) -> InspectaResult<bool> {
        self.delete_record(Collection::Findings, id.as_uuid()).await
    }

    pub async fn get_findings_for_mission(
        &self,
        mission_id: MissionId,
    ) -> InspectaResult<Vec<Finding>> {
        self.list_records::<Finding>(Some(mission_id)).await
    }

    // ========================================================================
    // SANCTIONS
    // ========================================================================

    pub async fn create_sanction(
        &self,
        mission_id: MissionId,
        input: impl Into<SanctionInput>,
    ) -> InspectaResult<Sanction> {
        let sanction = input
            .into()
            .resolve(SanctionId::now_v7(), mission_id, Utc::now())?;
        self.create_nested(sanction).await
    }

    pub async fn update_sanction(
        &self,
        id: SanctionId,
        patch: &SanctionPatch,
    ) -> InspectaResult<Option<Sanction>> {
        if let Some(amount) = patch.amount {
            if !amount.is_finite() || amount < 0.0 {
                return Err(ValidationError::InvalidValue {
                    field: "amount".to_string(),
                    reason: format!("must be a non-negative number, got {amount}"),
                }
                .into());
            }
        }
        self.update_record::<Sanction, _>(id.as_uuid(), patch).await
    }

    pub async fn delete_sanction(&self, id: SanctionId) -> InspectaResult<bool> {
        self.delete_record(Collection::Sanctions, id.as_uuid()).await
    }

    pub async fn get_sanctions_for_mission(
        &self,
        mission_id: MissionId,
    ) -> InspectaResult<Vec<Sanction>> {
        self.list_records::<Sanction>(Some(mission_id)).await
    }

    // ========================================================================
    // REMARKS
    // ========================================================================

    pub async fn create_remark(
        &self,
        mission_id: MissionId,
        input: NewRemark,
    ) -> InspectaResult<Remark> {
        let remark = input.into_remark(RemarkId::now_v7(), mission_id, Utc::now())?;
        self.create_nested(remark).await
    }

    pub async fn update_remark(
        &self,
        id: RemarkId,
        patch: &RemarkPatch,
    ) -> InspectaResult<Option<Remark>> {
        self.update_record::<Remark, _>(id.as_uuid(), patch).await
    }

    pub async fn delete_remark(&self, id: RemarkId) -> InspectaResult<bool> {
        self.delete_record(Collection::Remarks, id.as_uuid()).await
    }

    pub async fn get_remarks_for_mission(
        &self,
        mission_id: MissionId,
    ) -> InspectaResult<Vec<Remark>> {
        self.list_records::<Remark>(Some(mission_id)).await
    }

    // ========================================================================
    // DOCUMENTS
    // ========================================================================

    pub async fn create_document(
        &self,
        mission_id: MissionId,
        input: NewDocument,
    ) -> InspectaResult<Document> {
        let document = input.into_document(DocumentId::now_v7(), mission_id, Utc::now())?;
        self.create_nested(document).await
    }

    pub async fn update_document(
        &self,
        id: DocumentId,
        patch: &DocumentPatch,
    ) -> InspectaResult<Option<Document>> {
        self.update_record::<Document, _>(id.as_uuid(), patch).await
    }

    pub async fn delete_document(&self, id: DocumentId) -> InspectaResult<bool> {
        self.delete_record(Collection::Documents, id.as_uuid()).await
    }

    pub async fn get_documents_for_mission(
        &self,
        mission_id: MissionId,
    ) -> InspectaResult<Vec<Document>> {
        self.list_records::<Document>(Some(mission_id)).await
    }

    // ========================================================================
    // ROUTING
    // ========================================================================

    /// Run a remote call under the configured timeout.
    pub(crate) async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, RemoteError>>,
    ) -> Result<T, RemoteError> {
        match tokio::time::timeout(self.config.remote_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout {
                timeout_ms: self.config.remote_timeout.as_millis() as u64,
            }),
        }
    }

    async fn probe(&self, remote: &dyn RemoteDataService) -> bool {
        let reachable = tokio::time::timeout(self.config.remote_timeout, remote.test_connection())
            .await
            .unwrap_or(false);
        if reachable {
            self.link.mark_connected();
        } else {
            tracing::debug!("Remote probe failed");
        }
        reachable
    }

    /// Decide where a mutation goes. Must be called with the write gate held.
    async fn route(&self) -> InspectaResult<Route<'_>> {
        let Some(remote) = self.remote() else {
            return Ok(Route::LocalOnly);
        };
        if !self.link.is_connected()
            && !(self.link.claim_probe(self.config.probe_interval) && self.probe(remote).await)
        {
            return Ok(Route::Unreachable);
        }
        if !self.queue.is_empty() {
            if let Ok(_drain) = self.drain_gate.try_lock() {
                self.drain_locked(remote).await?;
            }
            if !self.queue.is_empty() {
                return Ok(if self.link.is_connected() {
                    Route::Backlog
                } else {
                    Route::Unreachable
                });
            }
        }
        Ok(Route::Remote(remote))
    }

    /// Route for reads: remote only when reachable with nothing queued.
    async fn read_route(&self) -> Option<&dyn RemoteDataService> {
        let remote = self.remote()?;
        if !self.queue.is_empty() {
            return None;
        }
        if !self.link.is_connected()
            && !(self.link.claim_probe(self.config.probe_interval) && self.probe(remote).await)
        {
            return None;
        }
        Some(remote)
    }

    /// Handle a transport failure on a mutation.
    fn absorb(&self, err: RemoteError) -> InspectaResult<()> {
        self.link.mark_degraded(&err.to_string());
        if self.config.local_fallback {
            Ok(())
        } else {
            Err(err.into())
        }
    }

    /// Whether a locally applied mutation may proceed for this route.
    fn accept_local(&self, route: &Route<'_>) -> InspectaResult<()> {
        match route {
            Route::Unreachable if !self.config.local_fallback => Err(RemoteError::Transport {
                reason: "remote unreachable and local fallback disabled".to_string(),
            }
            .into()),
            _ => Ok(()),
        }
    }

    fn enqueue(
        &self,
        collection: Collection,
        action: SyncAction,
        record_id: Uuid,
        payload: Value,
    ) -> InspectaResult<()> {
        if self.remote.is_none() {
            return Ok(());
        }
        self.queue.push(QueuedOperation::new(
            collection,
            action,
            record_id,
            payload,
            Utc::now(),
        ))
    }

    // ========================================================================
    // GENERIC MUTATIONS
    // ========================================================================

    async fn create_nested<R: Record>(&self, record: R) -> InspectaResult<R> {
        let _write = self.write_gate.lock().await;
        self.ensure_mission(record.mission_id()).await?;
        self.create_locked(record).await
    }

    async fn create_record<R: Record>(&self, record: R) -> InspectaResult<R> {
        let _write = self.write_gate.lock().await;
        self.create_locked(record).await
    }

    async fn create_locked<R: Record>(&self, record: R) -> InspectaResult<R> {
        let collection = R::collection();
        let value = encode(collection, &record)?;
        let route = self.route().await?;
        if let Route::Remote(remote) = &route {
            match self.call(remote.create(collection, &value)).await {
                Ok(returned) => {
                    return match serde_json::from_value::<R>(returned.clone()) {
                        Ok(created) => {
                            self.local.put(collection, returned)?;
                            Ok(created)
                        }
                        Err(e) => {
                            tracing::warn!(
                                collection = %collection,
                                record_id = %record.record_id(),
                                error = %e,
                                "Remote returned an undecodable record, keeping local copy"
                            );
                            self.local.put(collection, value)?;
                            Ok(record)
                        }
                    };
                }
                Err(e) if e.is_transport() => self.absorb(e)?,
                Err(e) => return Err(e.into()),
            }
        } else {
            self.accept_local(&route)?;
        }

        self.local.put(collection, value.clone())?;
        self.enqueue(collection, SyncAction::Create, record.record_id(), value)?;
        Ok(record)
    }

    /// Fail with `UnknownMission` unless the owning mission exists somewhere.
    async fn ensure_mission(&self, mission_id: MissionId) -> InspectaResult<()> {
        if self.local.has_mission(mission_id)? {
            return Ok(());
        }
        if let Some(remote) = self.read_route().await {
            match self
                .call(remote.read(Collection::Missions, mission_id.as_uuid()))
                .await
            {
                Ok(Some(_)) => return Ok(()),
                Ok(None) => {}
                Err(e) if e.is_transport() => self.mark_degraded(&e),
                Err(e) => return Err(e.into()),
            }
        }
        Err(ValidationError::UnknownMission {
            mission_id: mission_id.as_uuid(),
        }
        .into())
    }

    async fn update_record<R: Record, P: Patch>(
        &self,
        id: Uuid,
        patch: &P,
    ) -> InspectaResult<Option<R>> {
        let collection = R::collection();
        let patch = patch
            .to_value(Utc::now())
            .map_err(|e| StorageError::Serialization {
                collection,
                reason: e.to_string(),
            })?;
        let _write = self.write_gate.lock().await;
        let route = self.route().await?;
        if let Route::Remote(remote) = &route {
            match self.call(remote.update(collection, id, &patch)).await {
                Ok(returned) => {
                    if let Ok(updated) = serde_json::from_value::<R>(returned.clone()) {
                        self.local.put(collection, returned)?;
                        return Ok(Some(updated));
                    }
                    tracing::warn!(
                        collection = %collection,
                        record_id = %id,
                        "Remote returned an undecodable record, merging patch locally"
                    );
                    self.local.update(collection, id, &patch)?;
                    return self.local.record::<R>(id);
                }
                Err(RemoteError::Rejected { status: 404, .. }) => return Ok(None),
                Err(e) if e.is_transport() => self.absorb(e)?,
                Err(e) => return Err(e.into()),
            }
        } else {
            self.accept_local(&route)?;
        }

        if !self.local.update(collection, id, &patch)? {
            return Ok(None);
        }
        self.enqueue(collection, SyncAction::Update, id, patch)?;
        self.local.record::<R>(id)
    }

    async fn delete_record(&self, collection: Collection, id: Uuid) -> InspectaResult<bool> {
        let _write = self.write_gate.lock().await;
        let route = self.route().await?;
        if let Route::Remote(remote) = &route {
            match self.delete_remote(*remote, collection, id).await {
                Ok(existed) => {
                    let cached = self.delete_local(collection, id)?;
                    return Ok(existed || cached);
                }
                Err(e) if e.is_transport() => self.absorb(e)?,
                Err(e) => return Err(e.into()),
            }
        } else {
            self.accept_local(&route)?;
        }

        let cached = self.delete_local(collection, id)?;
        if self.remote.is_some() && !self.queue.discard_unsynced(id)? {
            if collection == Collection::Missions {
                self.queue.discard_children(id)?;
            }
            self.enqueue(collection, SyncAction::Delete, id, Value::Null)?;
        }
        Ok(cached)
    }

    /// Remote delete, removing nested records first for a mission.
    async fn delete_remote(
        &self,
        remote: &dyn RemoteDataService,
        collection: Collection,
        id: Uuid,
    ) -> Result<bool, RemoteError> {
        if collection == Collection::Missions {
            for nested in Collection::NESTED {
                self.call(remote.delete_by_mission(nested, id)).await?;
            }
        }
        self.call(remote.delete(collection, id)).await
    }

    fn delete_local(&self, collection: Collection, id: Uuid) -> InspectaResult<bool> {
        if collection == Collection::Missions {
            for nested in Collection::NESTED {
                let removed = self.local.delete_by_mission(nested, id)?;
                if removed > 0 {
                    tracing::debug!(
                        collection = %nested,
                        mission_id = %id,
                        removed,
                        "Cascaded delete"
                    );
                }
            }
        }
        self.local.delete(collection, id)
    }

    // ========================================================================
    // GENERIC READS
    // ========================================================================

    async fn list_records<R: Record>(
        &self,
        mission_id: Option<MissionId>,
    ) -> InspectaResult<Vec<R>> {
        let collection = R::collection();
        if let Some(remote) = self.read_route().await {
            let scope = mission_id.map(|m| m.as_uuid());
            match self.call(remote.list(collection, scope)).await {
                Ok(rows) => {
                    self.mirror_rows(collection, scope, &rows);
                    return Ok(decode_rows::<R>(rows));
                }
                Err(e) if e.is_transport() => self.mark_degraded(&e),
                Err(e) => return Err(e.into()),
            }
        }
        match mission_id {
            Some(mission_id) => self.local.records_for_mission::<R>(mission_id),
            None => self.local.records::<R>(),
        }
    }

    async fn read_record<R: Record>(&self, id: Uuid) -> InspectaResult<Option<R>> {
        let collection = R::collection();
        if let Some(remote) = self.read_route().await {
            match self.call(remote.read(collection, id)).await {
                Ok(row) => {
                    self.mirror_row(collection, id, row.as_ref());
                    return Ok(row.and_then(|v| serde_json::from_value::<R>(v).ok()));
                }
                Err(e) if e.is_transport() => self.mark_degraded(&e),
                Err(e) => return Err(e.into()),
            }
        }
        self.local.record::<R>(id)
    }

    /// Refresh the local copy from a remote listing when nothing is in flight.
    fn mirror_rows(&self, collection: Collection, mission_id: Option<Uuid>, rows: &[Value]) {
        if !self.config.mirror_reads {
            return;
        }
        let Ok(_write) = self.write_gate.try_lock() else {
            return;
        };
        if !self.queue.is_empty() {
            return;
        }
        let result = match mission_id {
            Some(mission_id) => {
                self.local
                    .replace_for_mission(collection, mission_id, rows.to_vec())
            }
            None => self.local.replace_all(collection, rows.to_vec()),
        };
        if let Err(e) = result {
            tracing::warn!(collection = %collection, error = %e, "Failed to mirror remote read");
        }
    }

    fn mirror_row(&self, collection: Collection, id: Uuid, row: Option<&Value>) {
        if !self.config.mirror_reads {
            return;
        }
        let Ok(_write) = self.write_gate.try_lock() else {
            return;
        };
        if !self.queue.is_empty() {
            return;
        }
        let result = match row {
            Some(row) => self.local.put(collection, row.clone()),
            None => self.delete_local(collection, id).map(|_| ()),
        };
        if let Err(e) = result {
            tracing::warn!(
                collection = %collection,
                record_id = %id,
                error = %e,
                "Failed to mirror remote read"
            );
        }
    }

    // ========================================================================
    // DRAIN
    // ========================================================================

    /// Replay the queue head-first. Caller holds both gates.
    async fn drain_locked(&self, remote: &dyn RemoteDataService) -> InspectaResult<DrainReport> {
        let _syncing = SyncingGuard::enter(&self.syncing);
        let mut report = DrainReport::default();

        while let Some(op) = self.queue.front()? {
            let contended = self.queue.touched_later(op.record_id);
            match self.replay(remote, &op).await {
                Ok(returned) => {
                    self.queue.pop_front(op.id)?;
                    report.replayed += 1;
                    match returned {
                        Some(returned) => self.settle(&op, returned, contended)?,
                        // Earlier replays may have mirrored children back in.
                        None if op.action == SyncAction::Delete => {
                            self.delete_local(op.collection, op.record_id)?;
                        }
                        None => {}
                    }
                }
                Err(e) if e.is_transport() => {
                    self.mark_degraded(&e);
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        collection = %op.collection,
                        action = %op.action,
                        record_id = %op.record_id,
                        error = %e,
                        "Remote rejected queued operation"
                    );
                    self.queue.pop_front(op.id)?;
                    self.queue.reject(op, e.to_string())?;
                    report.rejected += 1;
                }
            }
        }

        report.remaining = self.queue.len();
        if report.replayed > 0 || report.rejected > 0 {
            tracing::info!(
                replayed = report.replayed,
                rejected = report.rejected,
                remaining = report.remaining,
                "Drained sync queue"
            );
        }
        Ok(report)
    }

    /// Send one queued operation. Returns the remote representation if any.
    async fn replay(
        &self,
        remote: &dyn RemoteDataService,
        op: &QueuedOperation,
    ) -> Result<Option<Value>, RemoteError> {
        match op.action {
            SyncAction::Create => match self.call(remote.create(op.collection, &op.payload)).await {
                Ok(returned) => Ok(Some(returned)),
                // An earlier replay reached the remote but its response was lost.
                Err(RemoteError::Rejected { status: 409, .. }) => Ok(None),
                Err(e) => Err(e),
            },
            SyncAction::Update => self
                .call(remote.update(op.collection, op.record_id, &op.payload))
                .await
                .map(Some),
            SyncAction::Delete => self
                .delete_remote(remote, op.collection, op.record_id)
                .await
                .map(|_| None),
        }
    }

    /// Apply a replayed operation's remote result to the local store.
    fn settle(&self, op: &QueuedOperation, returned: Value, contended: bool) -> InspectaResult<()> {
        if op.action == SyncAction::Create {
            if let Some(server_id) = json_record_id(&returned) {
                if server_id != op.record_id {
                    self.rekey_local(op.collection, op.record_id, server_id)?;
                    let remapped = self.queue.remap(op.record_id, server_id)?;
                    tracing::info!(
                        collection = %op.collection,
                        client_id = %op.record_id,
                        server_id = %server_id,
                        remapped,
                        "Remote assigned a new id"
                    );
                }
            }
        }
        if !contended && json_record_id(&returned).is_some() {
            self.local.put(op.collection, returned)?;
        }
        Ok(())
    }

    /// Move a locally cached record to a new id, carrying nested records along.
    fn rekey_local(&self, collection: Collection, from: Uuid, to: Uuid) -> InspectaResult<()> {
        if let Some(mut entity) = self.local.get(collection, from)? {
            self.local.delete(collection, from)?;
            if let Value::Object(map) = &mut entity {
                map.insert(ID_FIELD.to_string(), Value::String(to.to_string()));
            }
            self.local.put(collection, entity)?;
        }
        if collection == Collection::Missions {
            let reparent = json!({ MISSION_ID_FIELD: to.to_string() });
            for nested in Collection::NESTED {
                for child in self.local.get_all(nested)? {
                    if json_mission_id(&child) != Some(from) {
                        continue;
                    }
                    if let Some(child_id) = json_record_id(&child) {
                        self.local.update(nested, child_id, &reparent)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn encode<T: Serialize>(collection: Collection, record: &T) -> InspectaResult<Value> {
    serde_json::to_value(record).map_err(|e| {
        StorageError::Serialization {
            collection,
            reason: e.to_string(),
        }
        .into()
    })
}

fn decode_rows<R: Record>(rows: Vec<Value>) -> Vec<R> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<R>(row) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(
                    collection = %R::collection(),
                    error = %e,
                    "Skipping undecodable remote record"
                );
                None
            }
        })
        .collect()
}
