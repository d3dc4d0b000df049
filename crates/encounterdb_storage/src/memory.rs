//! In-memory blob store for testing.

use crate::backend::BlobStore;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// An in-memory blob store.
///
/// Clones share the same entries, so a test can hand one clone to a
/// database handle and keep another to inspect or to reopen from later:
///
/// ```rust
/// use encounterdb_storage::{BlobStore, InMemoryBlobStore};
///
/// let shared = InMemoryBlobStore::new();
/// let mut writer = shared.clone();
/// writer.set("k", b"v").unwrap();
/// assert_eq!(shared.get("k").unwrap(), Some(b"v".to_vec()));
/// ```
///
/// A size quota can be configured to exercise write-failure paths the way a
/// browser storage limit would.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlobStore {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    quota: Option<usize>,
}

impl InMemoryBlobStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that rejects values larger than `limit` bytes.
    #[must_use]
    pub fn with_quota(limit: usize) -> Self {
        Self {
            entries: Arc::default(),
            quota: Some(limit),
        }
    }

    /// Creates a store holding one pre-existing value.
    ///
    /// Useful for testing recovery scenarios.
    #[must_use]
    pub fn with_entry(key: &str, value: Vec<u8>) -> Self {
        let store = Self::new();
        store.entries.write().insert(key.to_string(), value);
        store
    }

    /// Changes the quota for this handle. `None` removes the limit.
    pub fn set_quota(&mut self, quota: Option<usize>) {
        self.quota = quota;
    }

    /// Returns the number of keys held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if no key has been set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Overwrites a value without quota checks.
    ///
    /// Used by tests to plant corrupt or legacy snapshots.
    pub fn put_raw(&self, key: &str, value: Vec<u8>) {
        self.entries.write().insert(key.to_string(), value);
    }
}

impl BlobStore for InMemoryBlobStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> StorageResult<()> {
        if let Some(limit) = self.quota {
            if value.len() > limit {
                return Err(StorageError::QuotaExceeded {
                    needed: value.len(),
                    limit,
                });
            }
        }
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
