//! Lazily initialized owner of the live engine.
//!
//! The handle is the only component that holds a decoded [`Engine`]. It
//! loads the snapshot on first use, reconciles the schema, and writes the
//! whole engine back to the blob store after every mutation:
//!
//! ```text
//! Uninitialized ──get──► decode ──► migrate ──► Ready
//!        │                  │           │
//!        │ (absent)         └─(fatal)───┴──► fresh schema ──► Ready
//!        └──────────────────────────────────► fresh schema ──► Ready
//! ```
//!
//! A fresh or migrated engine is persisted before the handle reports Ready.
//! Mutations are staged on a copy of the engine and swapped in only when
//! they succeed, so a failing mutation never leaves half its rows behind.

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{CoreError, CoreResult};
use crate::migration::{MigrationReport, MigrationRunner};
use encounterdb_storage::BlobStore;
use tracing::{debug, info, warn};

enum State {
    Uninitialized,
    Ready(Engine),
}

/// Owns the blob store and the live engine decoded from it.
pub struct EngineHandle<S: BlobStore> {
    store: S,
    config: Config,
    runner: MigrationRunner,
    state: State,
    dirty: bool,
}

impl<S: BlobStore> EngineHandle<S> {
    /// Creates an uninitialized handle. No I/O happens until first use.
    pub fn new(store: S, config: Config) -> Self {
        Self::with_runner(store, config, MigrationRunner::current())
    }

    /// Creates an uninitialized handle reconciling against `runner`.
    pub fn with_runner(store: S, config: Config, runner: MigrationRunner) -> Self {
        Self {
            store,
            config,
            runner,
            state: State::Uninitialized,
            dirty: false,
        }
    }

    /// Creates a handle and initializes it immediately.
    ///
    /// # Errors
    ///
    /// See [`EngineHandle::initialize`].
    pub fn open(store: S, config: Config) -> CoreResult<Self> {
        let mut handle = Self::new(store, config);
        handle.initialize()?;
        Ok(handle)
    }

    /// Loads and reconciles the engine if that has not happened yet.
    ///
    /// An unreadable snapshot is replaced by a fresh schema when
    /// [`Config::discard_corrupt_snapshot`] is set. A failure to persist the
    /// initial state is logged and leaves the handle dirty but Ready.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snapshot cannot be read at all, or
    /// [`CoreError::Corrupted`] for an unreadable snapshot when discarding
    /// is disabled.
    pub fn initialize(&mut self) -> CoreResult<()> {
        if matches!(self.state, State::Ready(_)) {
            return Ok(());
        }

        let key = self.config.snapshot_key.as_str();
        let (engine, needs_flush) = match self.store.get(key)? {
            None => {
                info!(key, "no snapshot stored, creating schema");
                (self.runner.fresh()?, true)
            }
            Some(bytes) => match restore(&self.runner, &bytes) {
                Ok((engine, report)) => {
                    debug!(
                        key,
                        bytes = bytes.len(),
                        from = report.from_revision,
                        to = report.to_revision,
                        "snapshot loaded"
                    );
                    (engine, report.changed())
                }
                Err(e) if e.is_initialization_fatal() => {
                    if !self.config.discard_corrupt_snapshot {
                        return Err(CoreError::corrupted(e.to_string()));
                    }
                    warn!(key, error = %e, "discarding unreadable snapshot, starting fresh");
                    (self.runner.fresh()?, true)
                }
                Err(e) => return Err(e),
            },
        };

        self.state = State::Ready(engine);
        if needs_flush {
            if let Err(e) = self.flush() {
                warn!(error = %e, "initial snapshot not persisted");
            }
        }
        Ok(())
    }

    /// Drops the live engine and runs initialization again from the store.
    ///
    /// Pending changes from an earlier failed flush are written first; if
    /// that write fails again the live engine is kept and nothing is lost.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::FlushFailed`] if pending changes cannot be
    /// stored, otherwise see [`EngineHandle::initialize`].
    pub fn reload(&mut self) -> CoreResult<()> {
        if self.dirty && self.is_ready() {
            self.flush()?;
        }
        self.state = State::Uninitialized;
        self.dirty = false;
        self.initialize()
    }

    /// Returns the live engine, initializing first if needed.
    ///
    /// # Errors
    ///
    /// See [`EngineHandle::initialize`].
    pub fn engine(&mut self) -> CoreResult<&Engine> {
        self.initialize()?;
        self.ready()
    }

    /// Applies `mutation` to the engine and persists the result.
    ///
    /// The closure works on a copy; if it fails the live engine is
    /// untouched and nothing is written. If it succeeds the copy becomes
    /// the live engine and is flushed before returning.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or [`CoreError::FlushFailed`] if the
    /// snapshot could not be stored. In the latter case the mutation stays
    /// applied in memory and goes out with the next successful flush.
    pub fn mutate<T>(
        &mut self,
        mutation: impl FnOnce(&mut Engine) -> CoreResult<T>,
    ) -> CoreResult<T> {
        self.initialize()?;
        let mut staged = self.ready()?.clone();
        let value = mutation(&mut staged)?;
        self.state = State::Ready(staged);
        self.flush()?;
        Ok(value)
    }

    /// Re-runs schema reconciliation, persisting only if something changed.
    ///
    /// # Errors
    ///
    /// Returns a migration error, or [`CoreError::FlushFailed`].
    pub fn ensure_schema(&mut self) -> CoreResult<MigrationReport> {
        self.initialize()?;
        let runner = self.runner;
        let report = match &mut self.state {
            State::Ready(engine) => runner.ensure_schema(engine)?,
            State::Uninitialized => return Err(not_ready()),
        };
        if report.changed() {
            self.flush()?;
        }
        Ok(report)
    }

    /// Encodes the live engine and stores it under the snapshot key.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::FlushFailed`] if the store rejects the write.
    pub fn flush(&mut self) -> CoreResult<()> {
        let bytes = self.ready()?.encode()?;
        let key = self.config.snapshot_key.as_str();
        match self.store.set(key, &bytes) {
            Ok(()) => {
                self.dirty = false;
                debug!(key, bytes = bytes.len(), "snapshot flushed");
                Ok(())
            }
            Err(source) => {
                self.dirty = true;
                warn!(key, error = %source, "snapshot flush failed");
                Err(CoreError::FlushFailed { source })
            }
        }
    }

    /// Returns the raw snapshot bytes currently held by the store.
    ///
    /// Pending changes are flushed first so the export matches the live
    /// engine. Returns `None` if nothing has ever been stored.
    ///
    /// # Errors
    ///
    /// Returns a storage error, or [`CoreError::FlushFailed`] if pending
    /// changes cannot be written.
    pub fn export_snapshot(&mut self) -> CoreResult<Option<Vec<u8>>> {
        self.initialize()?;
        if self.dirty {
            self.flush()?;
        }
        Ok(self.store.get(&self.config.snapshot_key)?)
    }

    /// Returns `true` once the engine has been loaded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    /// Returns `true` if the live engine is ahead of the stored snapshot.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The handle's configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The migration runner used at initialization.
    #[must_use]
    pub fn runner(&self) -> MigrationRunner {
        self.runner
    }

    /// The underlying blob store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The underlying blob store, mutably.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consumes the handle, returning the blob store.
    pub fn into_store(self) -> S {
        self.store
    }

    fn ready(&self) -> CoreResult<&Engine> {
        match &self.state {
            State::Ready(engine) => Ok(engine),
            State::Uninitialized => Err(not_ready()),
        }
    }
}

impl<S: BlobStore> std::fmt::Debug for EngineHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("snapshot_key", &self.config.snapshot_key)
            .field("ready", &self.is_ready())
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

fn restore(runner: &MigrationRunner, bytes: &[u8]) -> CoreResult<(Engine, MigrationReport)> {
    let mut engine = Engine::decode(bytes)?;
    let report = runner.ensure_schema(&mut engine)?;
    Ok((engine, report))
}

fn not_ready() -> CoreError {
    CoreError::invalid_operation("engine is not initialized")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{records, CLINICAL_RECORDS, REVISIONS};
    use encounterdb_storage::InMemoryBlobStore;

    const KEY: &str = crate::config::DEFAULT_SNAPSHOT_KEY;

    #[test]
    fn construction_is_lazy() {
        let store = InMemoryBlobStore::new();
        let handle = EngineHandle::new(store.clone(), Config::default());
        assert!(!handle.is_ready());
        assert!(store.is_empty());
    }

    #[test]
    fn fresh_store_persists_schema() {
        let store = InMemoryBlobStore::new();
        let mut handle = EngineHandle::new(store.clone(), Config::default());
        let engine = handle.engine().unwrap();
        assert_eq!(engine.revision(), 4);

        let bytes = store.get(KEY).unwrap().expect("snapshot written");
        let stored = Engine::decode(&bytes).unwrap();
        assert!(stored.has_table(CLINICAL_RECORDS));
    }

    #[test]
    fn reopen_reads_existing_snapshot() {
        let store = InMemoryBlobStore::new();
        let mut first = EngineHandle::new(store.clone(), Config::default());
        first
            .mutate(|e| {
                e.table_mut(CLINICAL_RECORDS)?.insert(vec![
                    (records::PATIENT_ID, "1".into()),
                    (records::CREATED_AT, "2024-01-01T00:00:00.000Z".into()),
                ])
            })
            .unwrap();

        let mut second = EngineHandle::new(store, Config::default());
        assert_eq!(
            second.engine().unwrap().table(CLINICAL_RECORDS).unwrap().len(),
            1
        );
    }

    #[test]
    fn corrupt_snapshot_is_discarded() {
        let store = InMemoryBlobStore::with_entry(KEY, b"not a snapshot".to_vec());
        let mut handle = EngineHandle::new(store.clone(), Config::default());
        let engine = handle.engine().unwrap();
        assert!(engine.table(CLINICAL_RECORDS).unwrap().is_empty());

        let bytes = store.get(KEY).unwrap().unwrap();
        assert!(Engine::decode(&bytes).is_ok());
    }

    #[test]
    fn corrupt_snapshot_is_reported_when_not_discarding() {
        let store = InMemoryBlobStore::with_entry(KEY, b"garbage".to_vec());
        let mut handle =
            EngineHandle::new(store.clone(), Config::default().discard_corrupt_snapshot(false));
        assert!(matches!(
            handle.initialize(),
            Err(CoreError::Corrupted { .. })
        ));
        assert!(!handle.is_ready());
        assert_eq!(store.get(KEY).unwrap().unwrap(), b"garbage");
    }

    #[test]
    fn failed_mutation_leaves_engine_untouched() {
        let mut handle = EngineHandle::new(InMemoryBlobStore::new(), Config::default());
        let result: CoreResult<()> = handle.mutate(|e| {
            e.table_mut(CLINICAL_RECORDS)?.insert(vec![
                (records::PATIENT_ID, "1".into()),
                (records::CREATED_AT, "2024-01-01T00:00:00.000Z".into()),
            ])?;
            Err(CoreError::invalid_operation("abort"))
        });
        assert!(result.is_err());
        assert!(handle
            .engine()
            .unwrap()
            .table(CLINICAL_RECORDS)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn flush_failure_keeps_mutation_in_memory() {
        let mut handle = EngineHandle::new(InMemoryBlobStore::new(), Config::default());
        handle.initialize().unwrap();
        handle.store_mut().set_quota(Some(1));

        let err = handle
            .mutate(|e| {
                e.table_mut(CLINICAL_RECORDS)?.insert(vec![
                    (records::PATIENT_ID, "1".into()),
                    (records::CREATED_AT, "2024-01-01T00:00:00.000Z".into()),
                ])
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::FlushFailed { .. }));
        assert!(handle.is_dirty());
        assert_eq!(
            handle.engine().unwrap().table(CLINICAL_RECORDS).unwrap().len(),
            1
        );

        handle.store_mut().set_quota(None);
        let exported = handle.export_snapshot().unwrap().unwrap();
        assert!(!handle.is_dirty());
        assert_eq!(
            Engine::decode(&exported)
                .unwrap()
                .table(CLINICAL_RECORDS)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn reload_writes_pending_changes_first() {
        let mut handle = EngineHandle::new(InMemoryBlobStore::new(), Config::default());
        handle.initialize().unwrap();
        handle.store_mut().set_quota(Some(10));
        let insert = |e: &mut Engine| {
            e.table_mut(CLINICAL_RECORDS)?.insert(vec![
                (records::PATIENT_ID, "1".into()),
                (records::CREATED_AT, "2024-01-01T00:00:00.000Z".into()),
            ])
        };
        assert!(handle.mutate(insert).is_err());
        assert!(handle.is_dirty());

        assert!(matches!(
            handle.reload(),
            Err(CoreError::FlushFailed { .. })
        ));
        assert!(handle.is_dirty());
        assert_eq!(
            handle.engine().unwrap().table(CLINICAL_RECORDS).unwrap().len(),
            1
        );

        handle.store_mut().set_quota(None);
        handle.reload().unwrap();
        assert!(!handle.is_dirty());
        assert_eq!(
            handle.engine().unwrap().table(CLINICAL_RECORDS).unwrap().len(),
            1
        );
    }

    #[test]
    fn reload_picks_up_external_writes() {
        let store = InMemoryBlobStore::new();
        let mut handle = EngineHandle::new(store.clone(), Config::default());
        handle.initialize().unwrap();

        let mut other = EngineHandle::new(store, Config::default());
        other
            .mutate(|e| {
                e.table_mut(CLINICAL_RECORDS)?.insert(vec![
                    (records::PATIENT_ID, "1".into()),
                    (records::CREATED_AT, "2024-01-01T00:00:00.000Z".into()),
                ])
            })
            .unwrap();

        assert!(handle.engine().unwrap().table(CLINICAL_RECORDS).unwrap().is_empty());
        handle.reload().unwrap();
        assert_eq!(
            handle.engine().unwrap().table(CLINICAL_RECORDS).unwrap().len(),
            1
        );
    }

    #[test]
    fn initial_flush_failure_still_becomes_ready() {
        let mut handle = EngineHandle::new(InMemoryBlobStore::with_quota(1), Config::default());
        handle.initialize().unwrap();
        assert!(handle.is_ready());
        assert!(handle.is_dirty());
        assert!(handle.store().is_empty());
    }

    #[test]
    fn old_snapshot_is_upgraded_and_persisted() {
        let store = InMemoryBlobStore::new();
        let mut old = EngineHandle::with_runner(
            store.clone(),
            Config::default(),
            MigrationRunner::new(&REVISIONS[..2]),
        );
        assert_eq!(old.engine().unwrap().revision(), 2);

        let mut current = EngineHandle::new(store.clone(), Config::default());
        assert_eq!(current.engine().unwrap().revision(), 4);
        let stored = Engine::decode(&store.get(KEY).unwrap().unwrap()).unwrap();
        assert!(stored
            .column_names(CLINICAL_RECORDS)
            .unwrap()
            .contains(&records::IMPACT.to_string()));
    }

    #[test]
    fn ensure_schema_on_current_engine_is_noop() {
        let mut handle = EngineHandle::new(InMemoryBlobStore::new(), Config::default());
        handle.initialize().unwrap();
        let report = handle.ensure_schema().unwrap();
        assert!(!report.changed());
    }

    #[test]
    fn export_before_any_write_is_some_after_init() {
        let mut handle = EngineHandle::new(InMemoryBlobStore::new(), Config::default());
        assert!(handle.export_snapshot().unwrap().is_some());
    }
}
