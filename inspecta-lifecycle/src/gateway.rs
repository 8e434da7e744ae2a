//! Mission access used by the scheduler.

use async_trait::async_trait;
use inspecta_core::{InspectaResult, Mission, MissionId, MissionPatch};
use inspecta_sync::SyncEngine;

/// Reads and patches missions on behalf of the scheduler.
///
/// Implemented by [`SyncEngine`], so scheduler mutations follow the same
/// offline-first path as any other caller's.
#[async_trait]
pub trait MissionGateway: Send + Sync {
    async fn list_missions(&self) -> InspectaResult<Vec<Mission>>;

    async fn find_mission(&self, id: MissionId) -> InspectaResult<Option<Mission>>;

    async fn patch_mission(
        &self,
        id: MissionId,
        patch: &MissionPatch,
    ) -> InspectaResult<Option<Mission>>;
}

#[async_trait]
impl MissionGateway for SyncEngine {
    async fn list_missions(&self) -> InspectaResult<Vec<Mission>> {
        self.get_all_missions().await
    }

    async fn find_mission(&self, id: MissionId) -> InspectaResult<Option<Mission>> {
        self.get_mission(id).await
    }

    async fn patch_mission(
        &self,
        id: MissionId,
        patch: &MissionPatch,
    ) -> InspectaResult<Option<Mission>> {
        self.update_mission(id, patch).await
    }
}
