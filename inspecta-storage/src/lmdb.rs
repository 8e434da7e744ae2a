//! LMDB-backed durable medium.
//!
//! Uses the heed crate (Rust bindings for LMDB). Every collection lives under
//! one key in a single unnamed database, so each write is one ACID
//! transaction and a crash never leaves a collection half-written.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use inspecta_core::StorageError;

use crate::medium::StoreMedium;

/// Durable medium stored in an LMDB environment directory.
pub struct LmdbMedium {
    env: Env,
    db: Database<Bytes, Bytes>,
}

impl LmdbMedium {
    /// Open or create the environment at `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&path).map_err(|e| StorageError::Medium {
            reason: format!("cannot create {}: {}", path.as_ref().display(), e),
        })?;

        // SAFETY: the environment directory is owned by this process for its lifetime.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(medium_error)?;

        let mut wtxn = env.write_txn().map_err(medium_error)?;
        let db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, None).map_err(medium_error)?;
        wtxn.commit().map_err(medium_error)?;

        tracing::debug!(path = %path.as_ref().display(), max_size_mb, "Opened LMDB store");
        Ok(Self { env, db })
    }
}

fn medium_error(e: heed::Error) -> StorageError {
    StorageError::Medium {
        reason: e.to_string(),
    }
}

impl StoreMedium for LmdbMedium {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let rtxn = self.env.read_txn().map_err(medium_error)?;
        let value = self
            .db
            .get(&rtxn, key.as_bytes())
            .map_err(medium_error)?
            .map(|bytes| bytes.to_vec());
        Ok(value)
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let mut wtxn = self.env.write_txn().map_err(medium_error)?;
        self.db
            .put(&mut wtxn, key.as_bytes(), value)
            .map_err(medium_error)?;
        wtxn.commit().map_err(medium_error)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut wtxn = self.env.write_txn().map_err(medium_error)?;
        self.db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(medium_error)?;
        wtxn.commit().map_err(medium_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_medium() -> (LmdbMedium, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let medium = LmdbMedium::open(temp_dir.path(), 10).expect("medium creation should succeed");
        (medium, temp_dir)
    }

    #[test]
    fn test_write_and_read() {
        let (medium, _temp_dir) = create_test_medium();
        medium
            .write("missions", br#"[{"id":"x"}]"#)
            .expect("write should succeed");
        assert_eq!(
            medium.read("missions").expect("read should succeed"),
            Some(br#"[{"id":"x"}]"#.to_vec())
        );
        assert_eq!(medium.read("findings").expect("read should succeed"), None);
    }

    #[test]
    fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        {
            let medium =
                LmdbMedium::open(temp_dir.path(), 10).expect("medium creation should succeed");
            medium.write("sync_queue", b"[]").expect("write should succeed");
        }
        let medium = LmdbMedium::open(temp_dir.path(), 10).expect("reopen should succeed");
        assert_eq!(
            medium.read("sync_queue").expect("read should succeed"),
            Some(b"[]".to_vec())
        );
    }

    #[test]
    fn test_remove() {
        let (medium, _temp_dir) = create_test_medium();
        medium.write("remarks", b"[]").expect("write should succeed");
        medium.remove("remarks").expect("remove should succeed");
        medium.remove("remarks").expect("remove of absent key should succeed");
        assert_eq!(medium.read("remarks").expect("read should succeed"), None);
    }
}
