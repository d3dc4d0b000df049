//! Blob store wrappers for observing and breaking storage.
//!
//! Both wrappers hand out a cloneable probe or switch before the store is
//! moved into a repository, so a test keeps control afterwards.

use encounterdb_storage::{BlobStore, StorageError, StorageResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Operation counts shared with a [`CountingBlobStore`].
#[derive(Debug, Clone, Default)]
pub struct StoreCounters {
    gets: Arc<AtomicUsize>,
    sets: Arc<AtomicUsize>,
}

impl StoreCounters {
    /// Number of `get` calls so far.
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of successful `set` calls so far.
    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

/// Counts every operation passed to the inner store.
pub struct CountingBlobStore<S> {
    inner: S,
    counters: StoreCounters,
}

impl<S: BlobStore> CountingBlobStore<S> {
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            counters: StoreCounters::default(),
        }
    }

    /// A handle on the counters that outlives moving the store.
    pub fn counters(&self) -> StoreCounters {
        self.counters.clone()
    }

    /// Returns the wrapped store.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: BlobStore> BlobStore for CountingBlobStore<S> {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.counters.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.inner.set(key, value)?;
        self.counters.sets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Fault toggles shared with a [`FailingBlobStore`].
#[derive(Debug, Clone, Default)]
pub struct FaultSwitch {
    fail_gets: Arc<AtomicBool>,
    fail_sets: Arc<AtomicBool>,
}

impl FaultSwitch {
    /// Makes every subsequent `get` fail (or succeed again).
    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `set` fail (or succeed again).
    pub fn fail_sets(&self, fail: bool) {
        self.fail_sets.store(fail, Ordering::SeqCst);
    }

    /// Clears both faults.
    pub fn heal(&self) {
        self.fail_gets(false);
        self.fail_sets(false);
    }
}

/// Fails operations on demand; otherwise delegates to the inner store.
///
/// A failed `set` leaves the inner store untouched.
pub struct FailingBlobStore<S> {
    inner: S,
    switch: FaultSwitch,
}

impl<S: BlobStore> FailingBlobStore<S> {
    /// Wraps `inner` with no faults enabled.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            switch: FaultSwitch::default(),
        }
    }

    /// A handle on the fault toggles that outlives moving the store.
    pub fn switch(&self) -> FaultSwitch {
        self.switch.clone()
    }

    /// Returns the wrapped store.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: BlobStore> BlobStore for FailingBlobStore<S> {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        if self.switch.fail_gets.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("injected read failure".into()));
        }
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> StorageResult<()> {
        if self.switch.fail_sets.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("injected write failure".into()));
        }
        self.inner.set(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encounterdb_storage::InMemoryBlobStore;

    #[test]
    fn counts_operations() {
        let mut store = CountingBlobStore::new(InMemoryBlobStore::new());
        let counters = store.counters();
        store.set("k", b"v").unwrap();
        store.get("k").unwrap();
        store.get("k").unwrap();
        assert_eq!(counters.sets(), 1);
        assert_eq!(counters.gets(), 2);
    }

    #[test]
    fn failed_set_keeps_previous_value() {
        let mut store = FailingBlobStore::new(InMemoryBlobStore::new());
        let switch = store.switch();
        store.set("k", b"old").unwrap();

        switch.fail_sets(true);
        assert!(store.set("k", b"new").is_err());
        assert_eq!(store.get("k").unwrap().as_deref(), Some(&b"old"[..]));

        switch.heal();
        store.set("k", b"new").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some(&b"new"[..]));
    }

    #[test]
    fn failing_get() {
        let store = FailingBlobStore::new(InMemoryBlobStore::new());
        store.switch().fail_gets(true);
        assert!(matches!(store.get("k"), Err(StorageError::Unavailable(_))));
    }
}
