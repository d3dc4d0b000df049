//! Forward-compatible schema migration.
//!
//! The runner reconciles a live engine against the ordered list of schema
//! [`Revision`]s. For every table it introspects the physical column list,
//! takes the set difference against the declared columns, and adds whatever
//! is missing as a nullable column. Running it again on a current engine is
//! a no-op.
//!
//! Migrations here are:
//! - **Additive**: columns are added, never dropped or renamed
//! - **Introspective**: what is applied depends on the columns actually
//!   present, not only on the stored revision number
//! - **All-or-nothing**: the engine is only replaced once every revision
//!   reconciled cleanly
//!
//! Columns a newer build added are left untouched, and a stored revision
//! newer than this build's is never lowered.

use crate::engine::{Engine, Table};
use crate::error::{CoreError, CoreResult};
use crate::schema::{ColumnSpec, Revision, SchemaChange, REVISIONS};
use std::collections::HashSet;
use tracing::info;

/// Revision number type.
pub type RevisionNumber = u32;

/// An operation performed during a migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOperation {
    /// Created a new table.
    CreateTable {
        /// Name of the table.
        table: String,
    },
    /// Added a nullable column.
    AddColumn {
        /// Table the column was added to.
        table: String,
        /// Name of the column.
        column: String,
    },
}

/// One change applied by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedChange {
    /// Revision that declared the change.
    pub revision: RevisionNumber,
    /// Revision name.
    pub name: &'static str,
    /// What was done.
    pub operation: MigrationOperation,
}

/// Result of reconciling an engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Stored revision before the run.
    pub from_revision: RevisionNumber,
    /// Stored revision after the run.
    pub to_revision: RevisionNumber,
    /// Changes applied, in order.
    pub applied: Vec<AppliedChange>,
}

impl MigrationReport {
    /// Returns `true` if the engine was modified and needs persisting.
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.applied.is_empty() || self.from_revision != self.to_revision
    }

    /// Columns added, as `table.column`.
    #[must_use]
    pub fn added_columns(&self) -> Vec<String> {
        self.applied
            .iter()
            .filter_map(|c| match &c.operation {
                MigrationOperation::AddColumn { table, column } => Some(format!("{table}.{column}")),
                MigrationOperation::CreateTable { .. } => None,
            })
            .collect()
    }
}

/// Applies schema revisions to engines.
#[derive(Debug, Clone, Copy)]
pub struct MigrationRunner {
    revisions: &'static [Revision],
}

impl MigrationRunner {
    /// Creates a runner for an explicit revision list.
    ///
    /// Used to reproduce stores written by older builds.
    #[must_use]
    pub const fn new(revisions: &'static [Revision]) -> Self {
        Self { revisions }
    }

    /// Creates a runner for this build's schema.
    #[must_use]
    pub const fn current() -> Self {
        Self::new(REVISIONS)
    }

    /// The revisions this runner applies.
    #[must_use]
    pub fn revisions(&self) -> &'static [Revision] {
        self.revisions
    }

    /// Newest revision number known to this runner.
    #[must_use]
    pub fn latest(&self) -> RevisionNumber {
        self.revisions.last().map_or(0, |r| r.number)
    }

    /// Builds an engine holding the full schema and no rows.
    ///
    /// # Errors
    ///
    /// Returns an error only if the revision list itself is inconsistent.
    pub fn fresh(&self) -> CoreResult<Engine> {
        let mut engine = Engine::new();
        self.ensure_schema(&mut engine)?;
        Ok(engine)
    }

    /// Adds every column the schema requires and the engine lacks.
    ///
    /// A missing table is created only if it belongs to a revision newer
    /// than the engine's stored revision; otherwise the snapshot lost data
    /// and introspection fails.
    ///
    /// On error the engine is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SchemaIntrospection`] if a table that should
    /// exist is missing, a column has the wrong kind, or a required column
    /// is absent.
    pub fn ensure_schema(&self, engine: &mut Engine) -> CoreResult<MigrationReport> {
        let mut staged = engine.clone();
        let mut report = MigrationReport {
            from_revision: staged.revision(),
            to_revision: staged.revision(),
            applied: Vec::new(),
        };

        for revision in self.revisions {
            for change in revision.changes {
                match *change {
                    SchemaChange::CreateTable {
                        table,
                        columns,
                        primary_key,
                        autoincrement,
                    } => {
                        if staged.has_table(table) {
                            reconcile(&mut staged, revision, table, columns, &mut report)?;
                            continue;
                        }
                        if staged.revision() >= revision.number {
                            return Err(CoreError::schema_introspection(format!(
                                "table {table} missing from a revision {} snapshot",
                                staged.revision()
                            )));
                        }
                        let defs = columns.iter().map(|c| c.to_def()).collect();
                        staged.create_table(Table::new(table, defs, primary_key, autoincrement)?)?;
                        info!(table, revision = revision.number, "created table");
                        report.applied.push(AppliedChange {
                            revision: revision.number,
                            name: revision.name,
                            operation: MigrationOperation::CreateTable {
                                table: table.to_string(),
                            },
                        });
                    }
                    SchemaChange::AddColumn { table, column } => {
                        reconcile(&mut staged, revision, table, &[column], &mut report)?;
                    }
                }
            }
        }

        if staged.revision() < self.latest() {
            staged.set_revision(self.latest());
        }
        report.to_revision = staged.revision();
        *engine = staged;
        Ok(report)
    }

    /// Revision numbers that still have something to apply to `engine`.
    #[must_use]
    pub fn pending(&self, engine: &Engine) -> Vec<RevisionNumber> {
        self.revisions
            .iter()
            .filter(|revision| {
                revision.changes.iter().any(|change| {
                    let Ok(present) = engine.column_names(change.table()) else {
                        return true;
                    };
                    match change {
                        SchemaChange::CreateTable { columns, .. } => {
                            columns.iter().any(|c| !present.iter().any(|p| p == c.name))
                        }
                        SchemaChange::AddColumn { column, .. } => {
                            !present.iter().any(|p| p == column.name)
                        }
                    }
                })
            })
            .map(|r| r.number)
            .collect()
    }

    /// Validates that the revision list is sequential and purely additive.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MigrationFailed`] describing the first problem.
    pub fn validate(&self) -> CoreResult<()> {
        let mut tables = HashSet::new();
        let mut columns = HashSet::new();

        for (i, revision) in self.revisions.iter().enumerate() {
            let expected = u32::try_from(i + 1).unwrap_or(u32::MAX);
            if revision.number != expected {
                return Err(CoreError::migration_failed(format!(
                    "revision gap: expected {expected}, got {}",
                    revision.number
                )));
            }
            for change in revision.changes {
                match change {
                    SchemaChange::CreateTable { table, columns: cols, .. } => {
                        if !tables.insert(*table) {
                            return Err(CoreError::migration_failed(format!(
                                "revision {expected} recreates table {table}"
                            )));
                        }
                        for c in *cols {
                            if !columns.insert((*table, c.name)) {
                                return Err(CoreError::migration_failed(format!(
                                    "revision {expected} repeats column {table}.{}",
                                    c.name
                                )));
                            }
                        }
                    }
                    SchemaChange::AddColumn { table, column } => {
                        if !tables.contains(table) {
                            return Err(CoreError::migration_failed(format!(
                                "revision {expected} alters unknown table {table}"
                            )));
                        }
                        if column.not_null {
                            return Err(CoreError::migration_failed(format!(
                                "revision {expected} adds NOT NULL column {table}.{}",
                                column.name
                            )));
                        }
                        if !columns.insert((*table, column.name)) {
                            return Err(CoreError::migration_failed(format!(
                                "revision {expected} re-adds column {table}.{}",
                                column.name
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for MigrationRunner {
    fn default() -> Self {
        Self::current()
    }
}

fn reconcile(
    engine: &mut Engine,
    revision: &Revision,
    table: &str,
    wanted: &[ColumnSpec],
    report: &mut MigrationReport,
) -> CoreResult<()> {
    let present = engine.column_names(table)?;

    for spec in wanted {
        if present.iter().any(|p| p == spec.name) {
            let existing = engine
                .table(table)?
                .column(spec.name)
                .map(|c| c.kind)
                .ok_or_else(|| CoreError::schema_introspection("column list changed"))?;
            if existing != spec.kind {
                return Err(CoreError::schema_introspection(format!(
                    "column {table}.{} is {existing}, expected {}",
                    spec.name, spec.kind
                )));
            }
            continue;
        }
        if spec.not_null {
            return Err(CoreError::schema_introspection(format!(
                "required column {table}.{} is missing",
                spec.name
            )));
        }

        engine.table_mut(table)?.add_column(spec.to_def())?;
        info!(
            table,
            column = spec.name,
            revision = revision.number,
            "added column"
        );
        report.applied.push(AppliedChange {
            revision: revision.number,
            name: revision.name,
            operation: MigrationOperation::AddColumn {
                table: table.to_string(),
                column: spec.name.to_string(),
            },
        });
    }
    Ok(())
}
