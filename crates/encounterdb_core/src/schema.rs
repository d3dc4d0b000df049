//! Static schema definitions and the ordered list of revisions.
//!
//! Revisions are additive only. Each one either creates a table or adds a
//! nullable column; nothing is ever dropped or renamed, so any snapshot
//! written by an earlier build stays loadable.

use crate::engine::{ColumnDef, ColumnKind};

/// Table holding one row per patient.
pub const PATIENTS: &str = "patients";

/// Table holding one row per clinical encounter.
pub const CLINICAL_RECORDS: &str = "clinical_records";

/// Column names of [`PATIENTS`].
pub mod patients {
    /// Natural key.
    pub const ID: &str = "id";
    /// Demographic document.
    pub const DEMOGRAPHICS: &str = "filiatorios_data";
}

/// Column names of [`CLINICAL_RECORDS`].
pub mod records {
    /// Surrogate key.
    pub const ID: &str = "id";
    /// Owning patient's natural key.
    pub const PATIENT_ID: &str = "patient_id";
    /// Creation timestamp.
    pub const CREATED_AT: &str = "created_at";
    /// Anamnesis document.
    pub const ANAMNESIS: &str = "anamnesis_data";
    /// Physical exam document.
    pub const PHYSICAL_EXAM: &str = "physical_exam_data";
    /// Symptom and function scales document.
    pub const SCALES: &str = "scales_data";
    /// Imaging document.
    pub const IMAGING: &str = "radiology_data";
    /// Free-text summary.
    pub const SUMMARY: &str = "summary";
    /// Structured classification profile (derived later).
    pub const CLASSIFICATION_PROFILE: &str = "cif_profile";
    /// Hypothesis comparison result (derived later).
    pub const HYPOTHESIS_COMPARISON: &str = "hypothesis_comparison";
    /// Psychosocial impact document.
    pub const IMPACT: &str = "impact_data";
}

/// A column as declared by a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name.
    pub name: &'static str,
    /// Storage class.
    pub kind: ColumnKind,
    /// Whether null is rejected.
    pub not_null: bool,
}

impl ColumnSpec {
    const fn required(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            not_null: true,
        }
    }

    const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Text,
            not_null: false,
        }
    }

    /// The engine column this spec describes.
    #[must_use]
    pub fn to_def(self) -> ColumnDef {
        ColumnDef {
            name: self.name.to_string(),
            kind: self.kind,
            not_null: self.not_null,
        }
    }
}

/// One additive schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaChange {
    /// Create a table with its initial columns.
    CreateTable {
        /// Table name.
        table: &'static str,
        /// Initial columns.
        columns: &'static [ColumnSpec],
        /// Primary key column.
        primary_key: &'static str,
        /// Whether the key is assigned from a counter.
        autoincrement: bool,
    },
    /// Add one nullable column to an existing table.
    AddColumn {
        /// Table name.
        table: &'static str,
        /// The new column.
        column: ColumnSpec,
    },
}

impl SchemaChange {
    /// The table this change applies to.
    #[must_use]
    pub fn table(&self) -> &'static str {
        match self {
            SchemaChange::CreateTable { table, .. } | SchemaChange::AddColumn { table, .. } => {
                *table
            }
        }
    }
}

/// A numbered group of schema changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revision {
    /// Revision number, starting at 1 with no gaps.
    pub number: u32,
    /// Short name for logs.
    pub name: &'static str,
    /// Changes applied by this revision, in order.
    pub changes: &'static [SchemaChange],
}

const PATIENT_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required(patients::ID, ColumnKind::Text),
    ColumnSpec::required(patients::DEMOGRAPHICS, ColumnKind::Text),
];

const RECORD_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required(records::ID, ColumnKind::Integer),
    ColumnSpec::required(records::PATIENT_ID, ColumnKind::Text),
    ColumnSpec::required(records::CREATED_AT, ColumnKind::Text),
    ColumnSpec::text(records::ANAMNESIS),
    ColumnSpec::text(records::PHYSICAL_EXAM),
    ColumnSpec::text(records::SCALES),
    ColumnSpec::text(records::IMAGING),
    ColumnSpec::text(records::SUMMARY),
];

/// Every revision, oldest first.
pub const REVISIONS: &[Revision] = &[
    Revision {
        number: 1,
        name: "initial_tables",
        changes: &[
            SchemaChange::CreateTable {
                table: PATIENTS,
                columns: PATIENT_COLUMNS,
                primary_key: patients::ID,
                autoincrement: false,
            },
            SchemaChange::CreateTable {
                table: CLINICAL_RECORDS,
                columns: RECORD_COLUMNS,
                primary_key: records::ID,
                autoincrement: true,
            },
        ],
    },
    Revision {
        number: 2,
        name: "add_classification_profile",
        changes: &[SchemaChange::AddColumn {
            table: CLINICAL_RECORDS,
            column: ColumnSpec::text(records::CLASSIFICATION_PROFILE),
        }],
    },
    Revision {
        number: 3,
        name: "add_hypothesis_comparison",
        changes: &[SchemaChange::AddColumn {
            table: CLINICAL_RECORDS,
            column: ColumnSpec::text(records::HYPOTHESIS_COMPARISON),
        }],
    },
    Revision {
        number: 4,
        name: "add_impact",
        changes: &[SchemaChange::AddColumn {
            table: CLINICAL_RECORDS,
            column: ColumnSpec::text(records::IMPACT),
        }],
    },
];

/// Number of the newest revision.
#[must_use]
pub fn latest_revision() -> u32 {
    REVISIONS.last().map_or(0, |r| r.number)
}

/// Columns `table` has once every revision in `revisions` is applied.
#[must_use]
pub fn expected_columns(revisions: &[Revision], table: &str) -> Vec<&'static str> {
    let mut names = Vec::new();
    for change in revisions.iter().flat_map(|r| r.changes) {
        match change {
            SchemaChange::CreateTable {
                table: t, columns, ..
            } if *t == table => names.extend(columns.iter().map(|c| c.name)),
            SchemaChange::AddColumn { table: t, column } if *t == table => names.push(column.name),
            _ => {}
        }
    }
    names
}

/// Whether `column` of `table` is declared by any revision.
#[must_use]
pub fn is_declared(table: &str, column: &str) -> bool {
    expected_columns(REVISIONS, table).contains(&column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revisions_are_sequential() {
        for (i, revision) in REVISIONS.iter().enumerate() {
            assert_eq!(revision.number as usize, i + 1);
        }
        assert_eq!(latest_revision(), 4);
    }

    #[test]
    fn later_revisions_only_add_nullable_columns() {
        for revision in &REVISIONS[1..] {
            for change in revision.changes {
                match change {
                    SchemaChange::AddColumn { column, .. } => assert!(!column.not_null),
                    SchemaChange::CreateTable { .. } => {}
                }
            }
        }
    }

    #[test]
    fn full_record_column_set() {
        assert_eq!(
            expected_columns(REVISIONS, CLINICAL_RECORDS),
            vec![
                "id",
                "patient_id",
                "created_at",
                "anamnesis_data",
                "physical_exam_data",
                "scales_data",
                "radiology_data",
                "summary",
                "cif_profile",
                "hypothesis_comparison",
                "impact_data",
            ]
        );
    }

    #[test]
    fn partial_revision_set() {
        let cols = expected_columns(&REVISIONS[..2], CLINICAL_RECORDS);
        assert!(cols.contains(&"cif_profile"));
        assert!(!cols.contains(&"hypothesis_comparison"));
    }

    #[test]
    fn declared_lookup() {
        assert!(is_declared(PATIENTS, "filiatorios_data"));
        assert!(!is_declared(PATIENTS, "summary"));
    }
}
