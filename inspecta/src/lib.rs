//! INSPECTA - Offline-First Inspection Missions
//!
//! [`Inspecta`] is the context handle applications hold. It is built once
//! from an [`InspectaConfig`] and wires the local cache store, the optional
//! remote data service, the sync engine, the integrity checker and the
//! lifecycle scheduler together. There is no global state.

pub mod config;
pub mod telemetry;

use std::sync::Arc;

pub use config::{
    InspectaConfig, LifecycleSection, RemoteConfig, StoreConfig, SyncSection, TelemetryConfig,
};
pub use inspecta_core::*;
pub use inspecta_lifecycle::{
    CoherenceCheck, IncoherentMission, LifecycleScanSnapshot, StatusAlert, StatusUpdateSummary,
    UpcomingChanges,
};
pub use inspecta_remote::{RemoteDataService, RestClientConfig};
pub use inspecta_storage::{LocalStore, MemoryLocalStore};
pub use inspecta_sync::ReconciliationSnapshot;

use inspecta_lifecycle::{lifecycle_scan_task, LifecycleScanMetrics, LifecycleScheduler};
use inspecta_remote::RestRemoteClient;
use inspecta_storage::LmdbLocalStore;
use inspecta_sync::{
    reconciliation_task, IntegrityChecker, ReconciliationConfig, ReconciliationMetrics, SyncEngine,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Application context.
pub struct Inspecta {
    config: InspectaConfig,
    engine: Arc<SyncEngine>,
    checker: Arc<IntegrityChecker>,
    scheduler: Arc<LifecycleScheduler>,
    alerts: watch::Sender<UpcomingChanges>,
}

/// Handles of the jobs started by [`Inspecta::spawn_background`].
pub struct BackgroundTasks {
    reconciliation: JoinHandle<Arc<ReconciliationMetrics>>,
    lifecycle: JoinHandle<Arc<LifecycleScanMetrics>>,
}

impl BackgroundTasks {
    /// Wait for both jobs to stop and return their final metrics.
    pub async fn join(self) -> (Option<ReconciliationSnapshot>, Option<LifecycleScanSnapshot>) {
        let reconciliation = match self.reconciliation.await {
            Ok(metrics) => Some(metrics.snapshot()),
            Err(e) => {
                tracing::error!(error = %e, "Reconciliation task failed");
                None
            }
        };
        let lifecycle = match self.lifecycle.await {
            Ok(metrics) => Some(metrics.snapshot()),
            Err(e) => {
                tracing::error!(error = %e, "Lifecycle scan task failed");
                None
            }
        };
        (reconciliation, lifecycle)
    }
}

impl Inspecta {
    /// Open the configured backends.
    pub fn open(config: InspectaConfig) -> InspectaResult<Self> {
        config.validate()?;
        let local: Arc<dyn LocalStore> = match &config.store.path {
            Some(path) => Arc::new(LmdbLocalStore::open(path, config.store.max_size_mb)?),
            None => {
                tracing::warn!("No store path configured, local cache will not survive restarts");
                Arc::new(MemoryLocalStore::in_memory())
            }
        };
        let remote = match &config.remote {
            Some(remote) => {
                let client = RestRemoteClient::new(&remote.client_config())?;
                Some(Arc::new(client) as Arc<dyn RemoteDataService>)
            }
            None => None,
        };
        Self::with_backends(config, local, remote)
    }

    /// Build over caller-provided backends.
    pub fn with_backends(
        config: InspectaConfig,
        local: Arc<dyn LocalStore>,
        remote: Option<Arc<dyn RemoteDataService>>,
    ) -> InspectaResult<Self> {
        config.validate()?;
        let mut engine = SyncEngine::new(local, remote, config.sync.to_sync_config())?;
        if let Some(actor) = config.actor_id {
            engine = engine.with_actor(actor);
        }
        let engine = Arc::new(engine);
        let checker = Arc::new(IntegrityChecker::new(engine.clone()));
        let scheduler = Arc::new(LifecycleScheduler::new(
            engine.clone(),
            config.lifecycle.policy()?,
        ));
        let (alerts, _) = watch::channel(UpcomingChanges::default());
        Ok(Self {
            config,
            engine,
            checker,
            scheduler,
            alerts,
        })
    }

    pub fn config(&self) -> &InspectaConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    /// Alerts published by the lifecycle scan job.
    pub fn subscribe_alerts(&self) -> watch::Receiver<UpcomingChanges> {
        self.alerts.subscribe()
    }

    /// Start the reconciliation and lifecycle scan jobs. They stop when
    /// `shutdown` turns true.
    pub fn spawn_background(&self, shutdown: watch::Receiver<bool>) -> BackgroundTasks {
        let reconciliation = tokio::spawn(reconciliation_task(
            self.checker.clone(),
            ReconciliationConfig::from(self.engine.config()),
            shutdown.clone(),
        ));
        let lifecycle = tokio::spawn(lifecycle_scan_task(
            self.scheduler.clone(),
            self.config.lifecycle.scan_config(),
            self.alerts.clone(),
            shutdown,
        ));
        BackgroundTasks {
            reconciliation,
            lifecycle,
        }
    }

    // ========================================================================
    // MISSIONS
    // ========================================================================

    pub async fn create_mission(&self, input: NewMission) -> InspectaResult<Mission> {
        self.engine.create_mission(input).await
    }

    pub async fn update_mission(
        &self,
        id: MissionId,
        patch: &MissionPatch,
    ) -> InspectaResult<Option<Mission>> {
        self.engine.update_mission(id, patch).await
    }

    pub async fn delete_mission(&self, id: MissionId) -> InspectaResult<bool> {
        self.engine.delete_mission(id).await
    }

    pub async fn get_all_missions(&self) -> InspectaResult<Vec<Mission>> {
        self.engine.get_all_missions().await
    }

    pub async fn get_mission(&self, id: MissionId) -> InspectaResult<Option<Mission>> {
        self.engine.get_mission(id).await
    }

    // ========================================================================
    // NESTED RECORDS
    // ========================================================================

    pub async fn create_finding(
        &self,
        mission_id: MissionId,
        input: impl Into<FindingInput>,
    ) -> InspectaResult<Finding> {
        self.engine.create_finding(mission_id, input).await
    }

    pub async fn update_finding(
        &self,
        id: FindingId,
        patch: &FindingPatch,
    ) -> InspectaResult<Option<Finding>> {
        self.engine.update_finding(id, patch).await
    }

    pub async fn delete_finding(&self, id: FindingId) -> InspectaResult<bool> {
        self.engine.delete_finding(id).await
    }

    pub async fn get_findings_for_mission(
        &self,
        mission_id: MissionId,
    ) -> InspectaResult<Vec<Finding>> {
        self.engine.get_findings_for_mission(mission_id).await
    }

    pub async fn create_sanction(
        &self,
        mission_id: MissionId,
        input: impl Into<SanctionInput>,
    ) -> InspectaResult<Sanction> {
        self.engine.create_sanction(mission_id, input).await
    }

    pub async fn update_sanction(
        &self,
        id: SanctionId,
        patch: &SanctionPatch,
    ) -> InspectaResult<Option<Sanction>> {
        self.engine.update_sanction(id, patch).await
    }

    pub async fn delete_sanction(&self, id: SanctionId) -> InspectaResult<bool> {
        self.engine.delete_sanction(id).await
    }

    pub async fn get_sanctions_for_mission(
        &self,
        mission_id: MissionId,
    ) -> InspectaResult<Vec<Sanction>> {
        self.engine.get_sanctions_for_mission(mission_id).await
    }

    pub async fn create_remark(
        &self,
        mission_id: MissionId,
        input: NewRemark,
    ) -> InspectaResult<Remark> {
        self.engine.create_remark(mission_id, input).await
    }

    pub async fn update_remark(
        &self,
        id: RemarkId,
        patch: &RemarkPatch,
    ) -> InspectaResult<Option<Remark>> {
        self.engine.update_remark(id, patch).await
    }

    pub async fn delete_remark(&self, id: RemarkId) -> InspectaResult<bool> {
        self.engine.delete_remark(id).await
    }

    pub async fn get_remarks_for_mission(
        &self,
        mission_id: MissionId,
    ) -> InspectaResult<Vec<Remark>> {
        self.engine.get_remarks_for_mission(mission_id).await
    }

    pub async fn create_document(
        &self,
        mission_id: MissionId,
        input: NewDocument,
    ) -> InspectaResult<Document> {
        self.engine.create_document(mission_id, input).await
    }

    pub async fn update_document(
        &self,
        id: DocumentId,
        patch: &DocumentPatch,
    ) -> InspectaResult<Option<Document>> {
        self.engine.update_document(id, patch).await
    }

    pub async fn delete_document(&self, id: DocumentId) -> InspectaResult<bool> {
        self.engine.delete_document(id).await
    }

    pub async fn get_documents_for_mission(
        &self,
        mission_id: MissionId,
    ) -> InspectaResult<Vec<Document>> {
        self.engine.get_documents_for_mission(mission_id).await
    }

    // ========================================================================
    // SYNCHRONIZATION
    // ========================================================================

    pub fn get_connection_status(&self) -> ConnectionStatus {
        self.engine.get_connection_status()
    }

    pub async fn process_sync_queue(&self) -> InspectaResult<DrainReport> {
        self.engine.process_sync_queue().await
    }

    pub async fn verify_integrity(&self) -> InspectaResult<IntegrityReport> {
        self.checker.verify_integrity().await
    }

    pub async fn force_sync(&self) -> InspectaResult<bool> {
        self.checker.force_sync().await
    }

    pub fn pending_operations(&self) -> Vec<QueuedOperation> {
        self.engine.pending_operations()
    }

    pub fn rejected_operations(&self) -> Vec<RejectedOperation> {
        self.engine.rejected_operations()
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    pub async fn check_upcoming_status_changes(&self) -> InspectaResult<UpcomingChanges> {
        self.scheduler.check_upcoming_status_changes().await
    }

    pub async fn update_mission_statuses(&self) -> InspectaResult<StatusUpdateSummary> {
        self.scheduler.update_mission_statuses().await
    }

    pub async fn approve_transition(&self, id: MissionId) -> InspectaResult<Option<Mission>> {
        self.scheduler.approve_transition(id).await
    }

    pub async fn reject_transition(&self, id: MissionId) -> InspectaResult<Option<Mission>> {
        self.scheduler.reject_transition(id).await
    }

    pub async fn edit_mission_dates(
        &self,
        id: MissionId,
        start: Timestamp,
        end: Timestamp,
    ) -> InspectaResult<Option<Mission>> {
        self.scheduler.edit_mission_dates(id, start, end).await
    }

    pub async fn find_incoherent_missions(&self) -> InspectaResult<Vec<IncoherentMission>> {
        self.scheduler.find_incoherent_missions().await
    }

    /// Coherence of a single mission as of now.
    pub fn check_coherence(&self, mission: &Mission) -> CoherenceCheck {
        inspecta_lifecycle::check_coherence(
            mission.status,
            mission.start_date,
            mission.end_date,
            chrono::Utc::now(),
            self.scheduler.policy(),
        )
    }
}
