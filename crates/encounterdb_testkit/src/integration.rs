//! Cross-crate integration test helpers.
//!
//! Provides a harness that drives a repository with generated operations
//! and captures everything the read API reports, so two repositories (or
//! one repository before and after a reload) can be compared.

use crate::generators::RepositoryOperation;
use encounterdb_core::{
    CoreResult, PatientDetail, PatientSummary, RecordId, RecordRepository, UpdateOutcome,
};
use encounterdb_storage::BlobStore;

/// Everything the read API reports for a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Result of `list_patient_summaries`.
    pub summaries: Vec<PatientSummary>,
    /// Result of `get_patient_detail` for every listed patient.
    pub details: Vec<PatientDetail>,
}

/// Captures the full read view of `repo`.
///
/// # Errors
///
/// Propagates any repository error.
pub fn observe<S: BlobStore>(repo: &mut RecordRepository<S>) -> CoreResult<Observation> {
    let summaries = repo.list_patient_summaries()?;
    let mut details = Vec::with_capacity(summaries.len());
    for summary in &summaries {
        if let Some(detail) = repo.get_patient_detail(&summary.key)? {
            details.push(detail);
        }
    }
    Ok(Observation { summaries, details })
}

/// Applies generated operations and tracks the ids they produce.
#[derive(Debug, Default)]
pub struct RepositoryHarness {
    inserted: Vec<RecordId>,
    updates: usize,
}

impl RepositoryHarness {
    /// Creates an empty harness.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one operation.
    ///
    /// Updates target a previously inserted record by wrapped index and are
    /// skipped while nothing has been inserted.
    ///
    /// # Errors
    ///
    /// Propagates any repository error.
    pub fn apply<S: BlobStore>(
        &mut self,
        repo: &mut RecordRepository<S>,
        op: &RepositoryOperation,
    ) -> CoreResult<()> {
        match op {
            RepositoryOperation::Insert { key, encounter } => {
                let id = repo.insert_clinical_record(key, encounter.clone())?;
                self.inserted.push(id);
            }
            RepositoryOperation::Update {
                target,
                column,
                value,
            } => {
                if self.inserted.is_empty() {
                    return Ok(());
                }
                let id = self.inserted[target % self.inserted.len()];
                let outcome = repo.update_record_column(id, *column, value.clone())?;
                assert_eq!(outcome, UpdateOutcome::Updated, "{id} should exist");
                self.updates += 1;
            }
        }
        Ok(())
    }

    /// Applies every operation in order.
    ///
    /// # Errors
    ///
    /// Propagates the first repository error.
    pub fn apply_all<S: BlobStore>(
        &mut self,
        repo: &mut RecordRepository<S>,
        ops: &[RepositoryOperation],
    ) -> CoreResult<()> {
        ops.iter().try_for_each(|op| self.apply(repo, op))
    }

    /// Ids returned by inserts, in insertion order.
    pub fn inserted(&self) -> &[RecordId] {
        &self.inserted
    }

    /// Number of updates applied.
    pub fn update_count(&self) -> usize {
        self.updates
    }
}
