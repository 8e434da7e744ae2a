//! INSPECTA Storage - Local Cache Store
//!
//! Durable on-device fallback for the remote data service. Collections are
//! stored as JSON arrays over a pluggable [`StoreMedium`]: LMDB for real
//! deployments, memory for tests and ephemeral sessions.

pub mod lmdb;
pub mod medium;
pub mod store;
pub mod typed;

pub use lmdb::LmdbMedium;
pub use medium::{MemoryMedium, StoreMedium};
pub use store::{CollectionStore, LocalStore, QUEUE_KEY, REJECTED_KEY};
pub use typed::RecordStore;

/// Local store backed by LMDB.
pub type LmdbLocalStore = CollectionStore<LmdbMedium>;

/// Local store held in memory.
pub type MemoryLocalStore = CollectionStore<MemoryMedium>;

impl MemoryLocalStore {
    /// Empty in-memory store.
    pub fn in_memory() -> Self {
        CollectionStore::new(MemoryMedium::new())
    }
}

impl LmdbLocalStore {
    /// Open or create an LMDB-backed store at `path`.
    pub fn open<P: AsRef<std::path::Path>>(
        path: P,
        max_size_mb: usize,
    ) -> Result<Self, inspecta_core::StorageError> {
        Ok(CollectionStore::new(LmdbMedium::open(path, max_size_mb)?))
    }
}
