//! Remote data service contract.

use async_trait::async_trait;
use inspecta_core::{Collection, RemoteError};
use serde_json::Value;
use uuid::Uuid;

/// The network-backed authoritative store.
///
/// Entities travel as JSON objects carrying an `id` field. Implementations
/// never retry: a transport-class [`RemoteError`] is returned to the caller,
/// which decides whether to degrade and queue.
#[async_trait]
pub trait RemoteDataService: Send + Sync {
    /// Insert an entity and return the stored representation.
    async fn create(&self, collection: Collection, entity: &Value) -> Result<Value, RemoteError>;

    /// Fetch one entity, `None` if it does not exist.
    async fn read(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, RemoteError>;

    /// Apply a partial update and return the stored representation.
    ///
    /// Updating an absent entity is a [`RemoteError::Rejected`] with status 404.
    async fn update(
        &self,
        collection: Collection,
        id: Uuid,
        patch: &Value,
    ) -> Result<Value, RemoteError>;

    /// Delete one entity. Returns whether a row was removed; deleting an
    /// absent entity succeeds with `false`.
    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, RemoteError>;

    /// Delete every entity of `collection` owned by `mission_id`.
    async fn delete_by_mission(
        &self,
        collection: Collection,
        mission_id: Uuid,
    ) -> Result<(), RemoteError>;

    /// List a collection, optionally scoped to one mission.
    async fn list(
        &self,
        collection: Collection,
        mission_id: Option<Uuid>,
    ) -> Result<Vec<Value>, RemoteError>;

    /// Number of entities in a collection.
    async fn count(&self, collection: Collection) -> Result<u64, RemoteError>;

    /// Perform a trivial read. Never errors.
    async fn test_connection(&self) -> bool;
}
