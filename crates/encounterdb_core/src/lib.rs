//! # EncounterDB Core
//!
//! Persistence core for clinical encounter records.
//!
//! The whole database lives in memory as an [`Engine`] and is written as one
//! snapshot blob to a [`BlobStore`](encounterdb_storage::BlobStore) after
//! every mutation. This crate provides:
//! - A small relational engine with typed columns and autoincrement keys
//! - Static schema definitions and additive [`schema::REVISIONS`]
//! - A [`MigrationRunner`] that upgrades older snapshots in place
//! - An [`EngineHandle`] that loads, recovers and flushes the engine
//! - A [`RecordRepository`], the record API used by the application
//!
//! ## Example
//!
//! ```rust
//! use encounterdb_core::{Config, NewEncounter, PatientKey, RecordRepository};
//! use encounterdb_codec::Document;
//! use encounterdb_storage::InMemoryBlobStore;
//!
//! let mut repo = RecordRepository::new(InMemoryBlobStore::new(), Config::default());
//! let key = PatientKey::new("30111222").unwrap();
//! let demographics = Document::from_json(r#"{"nombre":"Ana"}"#).unwrap();
//!
//! let id = repo
//!     .insert_clinical_record(&key, NewEncounter::new(demographics))
//!     .unwrap();
//! repo.update_summary(id, "first visit").unwrap();
//!
//! let detail = repo.get_patient_detail(&key).unwrap().unwrap();
//! assert_eq!(detail.records.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod engine;
mod error;
mod handle;
mod migration;
mod repository;
pub mod schema;
mod snapshot;
mod types;

pub use clock::{format_timestamp, Clock, SystemClock};
pub use config::{Config, DEFAULT_SNAPSHOT_KEY, DEFAULT_SORT_FIELD};
pub use engine::{ColumnDef, ColumnKind, Engine, RowKey, RowRef, Table};
pub use error::{CoreError, CoreResult};
pub use handle::EngineHandle;
pub use migration::{
    AppliedChange, MigrationOperation, MigrationReport, MigrationRunner, RevisionNumber,
};
pub use repository::{
    ClinicalRecord, NewEncounter, PatientDetail, PatientSummary, RecordRepository,
    UpdatableColumn,
};
pub use types::{PatientKey, RecordId, UpdateOutcome};

/// Crate version, as reported by tooling.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
