//! The collaborator-facing record API.
//!
//! [`RecordRepository`] is the whole public surface of the store: list
//! patients, fetch one patient's history, insert an encounter, and replace
//! one derived column of an existing encounter. Every mutating call has
//! been flushed to the blob store by the time it returns `Ok`.

use crate::clock::{format_timestamp, Clock, SystemClock};
use crate::config::Config;
use crate::engine::{RowKey, RowRef};
use crate::error::{CoreError, CoreResult};
use crate::handle::EngineHandle;
use crate::schema::{self, patients, records, CLINICAL_RECORDS, PATIENTS};
use crate::types::{PatientKey, RecordId, UpdateOutcome};
use encounterdb_codec::{Document, Value};
use encounterdb_storage::BlobStore;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// One entry of the patient list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientSummary {
    /// Natural key.
    pub key: PatientKey,
    /// Demographic document.
    pub demographics: Document,
}

/// A patient together with every encounter, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientDetail {
    /// Demographic document.
    pub demographics: Document,
    /// Encounters ordered by creation time descending, then id descending.
    pub records: Vec<ClinicalRecord>,
}

/// One stored encounter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClinicalRecord {
    /// Surrogate key.
    pub id: RecordId,
    /// Owning patient.
    pub patient_key: PatientKey,
    /// UTC RFC 3339 with milliseconds.
    pub created_at: String,
    /// Anamnesis, `{}` if never set.
    pub anamnesis: Document,
    /// Physical exam, `{}` if never set.
    pub physical_exam: Document,
    /// Symptom and function scales, `{}` if never set.
    pub scales: Document,
    /// Imaging findings, `{}` if never set.
    pub imaging: Document,
    /// Free-text summary.
    pub summary: Option<Document>,
    /// Derived classification profile.
    pub classification_profile: Option<Document>,
    /// Derived hypothesis comparison.
    pub hypothesis_comparison: Option<Document>,
    /// Psychosocial impact.
    pub impact: Option<Document>,
}

impl ClinicalRecord {
    /// The summary as plain text, if it was stored as a text document.
    #[must_use]
    pub fn summary_text(&self) -> Option<String> {
        self.summary.as_ref().and_then(Document::as_plain_text)
    }
}

/// Input to [`RecordRepository::insert_clinical_record`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewEncounter {
    /// Replaces the patient's demographic document.
    pub demographics: Document,
    /// Anamnesis document.
    pub anamnesis: Document,
    /// Physical exam document.
    pub physical_exam: Document,
    /// Scales document.
    pub scales: Document,
    /// Imaging document.
    pub imaging: Document,
    /// Psychosocial impact, if assessed.
    pub impact: Option<Document>,
    /// Initial summary, if any.
    pub summary: Option<Document>,
}

impl NewEncounter {
    /// An encounter with the given demographics and empty sub-documents.
    #[must_use]
    pub fn new(demographics: Document) -> Self {
        Self {
            demographics,
            ..Self::default()
        }
    }

    /// Sets the summary to a text document.
    #[must_use]
    pub fn summary(mut self, text: &str) -> Self {
        self.summary = Some(Document::text(text));
        self
    }
}

/// Columns that may change after a record is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdatableColumn {
    /// Free-text summary.
    Summary,
    /// Derived classification profile.
    ClassificationProfile,
    /// Derived hypothesis comparison.
    HypothesisComparison,
}

impl UpdatableColumn {
    /// Every updatable column.
    pub const ALL: [UpdatableColumn; 3] = [
        UpdatableColumn::Summary,
        UpdatableColumn::ClassificationProfile,
        UpdatableColumn::HypothesisComparison,
    ];

    /// Physical column name.
    #[must_use]
    pub fn column_name(self) -> &'static str {
        match self {
            UpdatableColumn::Summary => records::SUMMARY,
            UpdatableColumn::ClassificationProfile => records::CLASSIFICATION_PROFILE,
            UpdatableColumn::HypothesisComparison => records::HYPOTHESIS_COMPARISON,
        }
    }
}

impl fmt::Display for UpdatableColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for UpdatableColumn {
    type Err = CoreError;

    fn from_str(name: &str) -> CoreResult<Self> {
        if let Some(column) = Self::ALL.into_iter().find(|c| c.column_name() == name) {
            return Ok(column);
        }
        if schema::is_declared(CLINICAL_RECORDS, name) {
            Err(CoreError::RestrictedColumn {
                column: name.to_string(),
            })
        } else {
            Err(CoreError::UnknownColumn {
                column: name.to_string(),
            })
        }
    }
}

/// Patient and encounter storage over a blob store.
pub struct RecordRepository<S: BlobStore> {
    handle: EngineHandle<S>,
    clock: Box<dyn Clock>,
}

impl<S: BlobStore> RecordRepository<S> {
    /// Creates a repository using the system clock. Nothing is loaded until
    /// the first call.
    pub fn new(store: S, config: Config) -> Self {
        Self::from_handle(EngineHandle::new(store, config))
    }

    /// Creates a repository and initializes its engine immediately.
    ///
    /// # Errors
    ///
    /// See [`EngineHandle::initialize`].
    pub fn open(store: S, config: Config) -> CoreResult<Self> {
        Ok(Self::from_handle(EngineHandle::open(store, config)?))
    }

    /// Wraps an existing handle.
    pub fn from_handle(handle: EngineHandle<S>) -> Self {
        Self {
            handle,
            clock: Box::new(SystemClock),
        }
    }

    /// Replaces the clock that stamps new records.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// The engine handle.
    #[must_use]
    pub fn handle(&self) -> &EngineHandle<S> {
        &self.handle
    }

    /// The engine handle, mutably.
    pub fn handle_mut(&mut self) -> &mut EngineHandle<S> {
        &mut self.handle
    }

    /// Consumes the repository, returning its handle.
    pub fn into_handle(self) -> EngineHandle<S> {
        self.handle
    }

    /// Lists every patient ordered by the configured demographic field.
    ///
    /// Patients lacking the field sort first; ties are broken by key.
    ///
    /// # Errors
    ///
    /// Returns an initialization error or [`CoreError::Corrupted`] if a
    /// stored row is malformed.
    pub fn list_patient_summaries(&mut self) -> CoreResult<Vec<PatientSummary>> {
        let sort_field = self.handle.config().patient_sort_field.clone();
        let table = self.handle.engine()?.table(PATIENTS)?;

        let mut keyed = table
            .rows()
            .map(|row| {
                let summary = read_patient(row)?;
                let sort_key = match &sort_field {
                    Some(field) => summary.demographics.field_text(field),
                    None => Some(summary.demographics.as_str().to_string()),
                };
                Ok((sort_key, summary))
            })
            .collect::<CoreResult<Vec<_>>>()?;

        keyed.sort_by(|(a, left), (b, right)| a.cmp(b).then_with(|| left.key.cmp(&right.key)));
        Ok(keyed.into_iter().map(|(_, summary)| summary).collect())
    }

    /// Returns a patient's demographics and encounters, or `None` if the
    /// key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an initialization error or [`CoreError::Corrupted`] if a
    /// stored row is malformed.
    pub fn get_patient_detail(&mut self, key: &PatientKey) -> CoreResult<Option<PatientDetail>> {
        let engine = self.handle.engine()?;
        let Some(patient) = engine
            .table(PATIENTS)?
            .get(&RowKey::Text(key.as_str().to_string()))
        else {
            return Ok(None);
        };
        let demographics = read_patient(patient)?.demographics;

        let mut records = engine
            .table(CLINICAL_RECORDS)?
            .rows()
            .filter(|row| row.text(records::PATIENT_ID) == Some(key.as_str()))
            .map(read_record)
            .collect::<CoreResult<Vec<_>>>()?;
        records.sort_by(newest_first);

        Ok(Some(PatientDetail {
            demographics,
            records,
        }))
    }

    /// Returns one encounter by id.
    ///
    /// # Errors
    ///
    /// Returns an initialization error or [`CoreError::Corrupted`].
    pub fn get_record(&mut self, id: RecordId) -> CoreResult<Option<ClinicalRecord>> {
        self.handle
            .engine()?
            .table(CLINICAL_RECORDS)?
            .get(&RowKey::Integer(id.as_i64()))
            .map(read_record)
            .transpose()
    }

    /// Upserts the patient and appends one encounter, flushing once.
    ///
    /// Either both rows are written or neither is. The derived columns of
    /// the new record start out null.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::FlushFailed`] if the snapshot could not be
    /// stored; the encounter then exists in memory only.
    pub fn insert_clinical_record(
        &mut self,
        key: &PatientKey,
        encounter: NewEncounter,
    ) -> CoreResult<RecordId> {
        let created_at = format_timestamp(self.clock.now());

        self.handle.mutate(move |engine| {
            let patient_row = RowKey::Text(key.as_str().to_string());
            let demographics = cell(encounter.demographics);
            let patients_table = engine.table_mut(PATIENTS)?;
            if patients_table.contains(&patient_row) {
                patients_table.update_cell(&patient_row, patients::DEMOGRAPHICS, demographics)?;
            } else {
                patients_table.insert(vec![
                    (patients::ID, key.as_str().into()),
                    (patients::DEMOGRAPHICS, demographics),
                ])?;
            }

            let mut cells = vec![
                (records::PATIENT_ID, key.as_str().into()),
                (records::CREATED_AT, created_at.into()),
                (records::ANAMNESIS, cell(encounter.anamnesis)),
                (records::PHYSICAL_EXAM, cell(encounter.physical_exam)),
                (records::SCALES, cell(encounter.scales)),
                (records::IMAGING, cell(encounter.imaging)),
            ];
            // Older schemas may lack the optional columns.
            if let Some(summary) = encounter.summary {
                cells.push((records::SUMMARY, cell(summary)));
            }
            if let Some(impact) = encounter.impact {
                cells.push((records::IMPACT, cell(impact)));
            }
            let row = engine.table_mut(CLINICAL_RECORDS)?.insert(cells)?;
            match row {
                RowKey::Integer(id) => Ok(RecordId::new(id)),
                RowKey::Text(_) => Err(CoreError::corrupted("record key is not an integer")),
            }
        })
    }

    /// Replaces one derived column of an existing encounter.
    ///
    /// Returns [`UpdateOutcome::NotFound`] without writing anything if no
    /// record has `id`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::FlushFailed`] if the snapshot could not be
    /// stored.
    pub fn update_record_column(
        &mut self,
        id: RecordId,
        column: UpdatableColumn,
        value: Document,
    ) -> CoreResult<UpdateOutcome> {
        let row = RowKey::Integer(id.as_i64());
        if !self.handle.engine()?.table(CLINICAL_RECORDS)?.contains(&row) {
            return Ok(UpdateOutcome::NotFound);
        }
        self.handle.mutate(|engine| {
            engine
                .table_mut(CLINICAL_RECORDS)?
                .update_cell(&row, column.column_name(), cell(value))
        })?;
        Ok(UpdateOutcome::Updated)
    }

    /// Like [`RecordRepository::update_record_column`] with the column
    /// given by its physical name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RestrictedColumn`] for columns fixed at insert
    /// and [`CoreError::UnknownColumn`] for names outside the schema.
    pub fn update_record_column_by_name(
        &mut self,
        id: RecordId,
        column: &str,
        value: Document,
    ) -> CoreResult<UpdateOutcome> {
        let column = column.parse::<UpdatableColumn>()?;
        self.update_record_column(id, column, value)
    }

    /// Stores `text` as the encounter summary.
    ///
    /// # Errors
    ///
    /// See [`RecordRepository::update_record_column`].
    pub fn update_summary(&mut self, id: RecordId, text: &str) -> CoreResult<UpdateOutcome> {
        self.update_record_column(id, UpdatableColumn::Summary, Document::text(text))
    }

    /// Stores the derived classification profile.
    ///
    /// # Errors
    ///
    /// See [`RecordRepository::update_record_column`].
    pub fn update_classification_profile(
        &mut self,
        id: RecordId,
        profile: Document,
    ) -> CoreResult<UpdateOutcome> {
        self.update_record_column(id, UpdatableColumn::ClassificationProfile, profile)
    }

    /// Stores the derived hypothesis comparison.
    ///
    /// # Errors
    ///
    /// See [`RecordRepository::update_record_column`].
    pub fn update_hypothesis_comparison(
        &mut self,
        id: RecordId,
        comparison: Document,
    ) -> CoreResult<UpdateOutcome> {
        self.update_record_column(id, UpdatableColumn::HypothesisComparison, comparison)
    }

    /// Raw snapshot bytes as stored, for download or backup.
    ///
    /// # Errors
    ///
    /// See [`EngineHandle::export_snapshot`].
    pub fn export_snapshot(&mut self) -> CoreResult<Option<Vec<u8>>> {
        self.handle.export_snapshot()
    }
}

impl<S: BlobStore> fmt::Debug for RecordRepository<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordRepository")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

fn cell(document: Document) -> Value {
    Value::Text(document.into_string())
}

fn newest_first(a: &ClinicalRecord, b: &ClinicalRecord) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

fn read_patient(row: RowRef<'_>) -> CoreResult<PatientSummary> {
    Ok(PatientSummary {
        key: read_key(row, patients::ID)?,
        demographics: read_document(row, patients::DEMOGRAPHICS)?
            .ok_or_else(|| CoreError::corrupted("patient without demographics"))?,
    })
}

fn read_record(row: RowRef<'_>) -> CoreResult<ClinicalRecord> {
    let id = row
        .get(records::ID)
        .and_then(Value::as_integer)
        .ok_or_else(|| CoreError::corrupted("record without integer id"))?;
    let fixed = |column: &str| read_document(row, column).map(Option::unwrap_or_default);

    Ok(ClinicalRecord {
        id: RecordId::new(id),
        patient_key: read_key(row, records::PATIENT_ID)?,
        created_at: row
            .text(records::CREATED_AT)
            .ok_or_else(|| CoreError::corrupted(format!("record {id} without timestamp")))?
            .to_string(),
        anamnesis: fixed(records::ANAMNESIS)?,
        physical_exam: fixed(records::PHYSICAL_EXAM)?,
        scales: fixed(records::SCALES)?,
        imaging: fixed(records::IMAGING)?,
        summary: read_document(row, records::SUMMARY)?,
        classification_profile: read_document(row, records::CLASSIFICATION_PROFILE)?,
        hypothesis_comparison: read_document(row, records::HYPOTHESIS_COMPARISON)?,
        impact: read_document(row, records::IMPACT)?,
    })
}

fn read_key(row: RowRef<'_>, column: &str) -> CoreResult<PatientKey> {
    let text = row
        .text(column)
        .ok_or_else(|| CoreError::corrupted(format!("{column} is null")))?;
    PatientKey::new(text).map_err(|e| CoreError::corrupted(e.to_string()))
}

fn read_document(row: RowRef<'_>, column: &str) -> CoreResult<Option<Document>> {
    row.text(column)
        .map(|text| Document::from_json(text).map_err(CoreError::from))
        .transpose()
}
