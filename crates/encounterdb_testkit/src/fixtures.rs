//! Test fixtures and repository helpers.
//!
//! Provides repositories over throwaway stores, sample documents, and
//! common pre-populated scenarios.

use crate::clock::SteppingClock;
use encounterdb_core::{Config, PatientKey, RecordRepository};
use encounterdb_storage::{FileBlobStore, InMemoryBlobStore};
use std::path::Path;
use tempfile::TempDir;

/// Parses a patient key, panicking on invalid input.
pub fn patient_key(key: &str) -> PatientKey {
    PatientKey::new(key).expect("valid patient key")
}

/// A repository over an in-memory store with a stepping clock.
pub struct TestRepository {
    /// The repository instance.
    pub repo: RecordRepository<InMemoryBlobStore>,
    store: InMemoryBlobStore,
    config: Config,
    clock: SteppingClock,
}

impl TestRepository {
    /// Creates a repository over an empty in-memory store.
    pub fn memory() -> Self {
        Self::over(InMemoryBlobStore::new(), Config::default())
    }

    /// Creates a repository with a custom configuration.
    pub fn with_config(config: Config) -> Self {
        Self::over(InMemoryBlobStore::new(), config)
    }

    /// Creates a repository over an existing store.
    ///
    /// The store is shared, not copied: writes through the repository are
    /// visible through `store`.
    pub fn over(store: InMemoryBlobStore, config: Config) -> Self {
        let clock = SteppingClock::default();
        let repo = RecordRepository::new(store.clone(), config.clone()).with_clock(clock.clone());
        Self {
            repo,
            store,
            config,
            clock,
        }
    }

    /// The backing store.
    pub fn store(&self) -> &InMemoryBlobStore {
        &self.store
    }

    /// The clock stamping new records.
    pub fn clock(&self) -> &SteppingClock {
        &self.clock
    }

    /// Raw snapshot bytes under the configured key.
    pub fn stored_snapshot(&self) -> Option<Vec<u8>> {
        use encounterdb_storage::BlobStore;
        self.store
            .get(&self.config.snapshot_key)
            .expect("in-memory get never fails")
    }

    /// Opens a second repository over the same store, as a new process
    /// would. The clock timeline continues.
    pub fn reopen(&self) -> Self {
        let repo = RecordRepository::new(self.store.clone(), self.config.clone())
            .with_clock(self.clock.clone());
        Self {
            repo,
            store: self.store.clone(),
            config: self.config.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl std::ops::Deref for TestRepository {
    type Target = RecordRepository<InMemoryBlobStore>;

    fn deref(&self) -> &Self::Target {
        &self.repo
    }
}

impl std::ops::DerefMut for TestRepository {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.repo
    }
}

/// A repository over a file store in a temporary directory.
pub struct TestFileRepository {
    /// The repository instance.
    pub repo: RecordRepository<FileBlobStore>,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl TestFileRepository {
    /// Creates a repository over an empty temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let repo = Self::open_repo(temp_dir.path());
        Self { repo, temp_dir }
    }

    /// The store directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Drops the repository and opens a new one on the same directory.
    pub fn reopen(self) -> Self {
        let Self { repo, temp_dir } = self;
        drop(repo);
        let repo = Self::open_repo(temp_dir.path());
        Self { repo, temp_dir }
    }

    fn open_repo(path: &Path) -> RecordRepository<FileBlobStore> {
        let store = FileBlobStore::open(path).expect("Failed to open file store");
        RecordRepository::new(store, Config::default()).with_clock(SteppingClock::default())
    }
}

impl Default for TestFileRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestFileRepository {
    type Target = RecordRepository<FileBlobStore>;

    fn deref(&self) -> &Self::Target {
        &self.repo
    }
}

impl std::ops::DerefMut for TestFileRepository {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.repo
    }
}

/// Sample clinical documents.
pub mod samples {
    use encounterdb_codec::Document;
    use encounterdb_core::NewEncounter;
    use serde_json::json;

    /// Demographics with a display name.
    pub fn demographics(name: &str) -> Document {
        Document::from(json!({
            "nombre": name,
            "edad": 42,
            "ocupacion": "docente",
        }))
    }

    /// A low back pain anamnesis.
    pub fn anamnesis() -> Document {
        Document::from(json!({
            "motivo": "dolor lumbar",
            "evolucion_dias": 21,
            "irradiacion": false,
        }))
    }

    /// A physical exam with range-of-motion findings.
    pub fn physical_exam() -> Document {
        Document::from(json!({
            "flexion_lumbar": 45,
            "lasegue": { "izquierdo": false, "derecho": true },
        }))
    }

    /// Pain and disability scores.
    pub fn scales() -> Document {
        Document::from(json!({ "eva": 6, "oswestry": 32 }))
    }

    /// An imaging report.
    pub fn imaging() -> Document {
        Document::from(json!({ "rx": "sin hallazgos", "rm": null }))
    }

    /// A psychosocial impact assessment.
    pub fn impact() -> Document {
        Document::from(json!({ "kinesiofobia": "moderada", "ausentismo": true }))
    }

    /// A derived classification profile.
    pub fn classification_profile() -> Document {
        Document::from(json!({ "b280": 2, "d415": 1, "d850": 3 }))
    }

    /// A derived hypothesis comparison.
    pub fn hypothesis_comparison() -> Document {
        Document::from(json!({
            "principal": "lumbalgia mecánica",
            "alternativas": ["radiculopatía L5"],
        }))
    }

    /// A complete encounter for a patient called `name`.
    pub fn encounter(name: &str) -> NewEncounter {
        NewEncounter {
            demographics: demographics(name),
            anamnesis: anamnesis(),
            physical_exam: physical_exam(),
            scales: scales(),
            imaging: imaging(),
            impact: Some(impact()),
            summary: Some(Document::text("Lumbalgia subaguda, plan de ejercicio.")),
        }
    }
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// A repository holding `patients` patients with `visits` encounters each.
    ///
    /// Keys are `"P000"`, `"P001"`, ... and names `"Patient 000"`, ...
    pub fn populated_repository(patients: usize, visits: usize) -> TestRepository {
        let mut test = TestRepository::memory();
        for p in 0..patients {
            let key = patient_key(&format!("P{p:03}"));
            for _ in 0..visits {
                test.insert_clinical_record(&key, samples::encounter(&format!("Patient {p:03}")))
                    .expect("Failed to insert encounter");
            }
        }
        test
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_repository_starts_empty() {
        let mut test = TestRepository::memory();
        assert!(test.list_patient_summaries().unwrap().is_empty());
        assert!(test.stored_snapshot().is_some());
    }

    #[test]
    fn reopen_shares_store() {
        let test = scenarios::populated_repository(2, 1);
        let mut reopened = test.reopen();
        assert_eq!(reopened.list_patient_summaries().unwrap().len(), 2);
    }

    #[test]
    fn populated_scenario() {
        let mut test = scenarios::populated_repository(3, 2);
        let detail = test
            .get_patient_detail(&patient_key("P001"))
            .unwrap()
            .unwrap();
        assert_eq!(detail.records.len(), 2);
    }

    #[test]
    fn file_repository_survives_reopen() {
        let mut test = TestFileRepository::new();
        test.insert_clinical_record(&patient_key("1"), samples::encounter("Ana"))
            .unwrap();
        let mut test = test.reopen();
        assert_eq!(test.list_patient_summaries().unwrap().len(), 1);
    }
}
