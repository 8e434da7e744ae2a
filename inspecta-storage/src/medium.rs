//! Raw key/value media underneath the collection store.

use inspecta_core::StorageError;
use std::collections::HashMap;
use std::sync::RwLock;

/// A byte-oriented key/value medium.
///
/// Each key holds one whole value; the collection store never needs
/// partial reads or range scans.
pub trait StoreMedium: Send + Sync {
    /// Read the value stored under `key`.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the value stored under `key`.
    fn write(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process medium for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store arbitrary bytes under `key`, bypassing the collection encoding.
    pub fn inject(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.write(key, bytes)
    }

    /// Number of keys currently held.
    pub fn key_count(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }
}

impl StoreMedium for MemoryMedium {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        entries.remove(key);
        Ok(())
    }
}
