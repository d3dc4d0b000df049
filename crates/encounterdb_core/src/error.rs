//! Error types for EncounterDB core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in EncounterDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Blob store error.
    #[error("storage error: {0}")]
    Storage(#[from] encounterdb_storage::StorageError),

    /// Snapshot or document codec error.
    #[error("codec error: {0}")]
    Codec(#[from] encounterdb_codec::CodecError),

    /// Table not found.
    #[error("table not found: {name}")]
    TableNotFound {
        /// Name of the table.
        name: String,
    },

    /// Table already exists.
    #[error("table already exists: {name}")]
    DuplicateTable {
        /// Name of the table.
        name: String,
    },

    /// Column not found in a table.
    #[error("column {column} not found in table {table}")]
    ColumnNotFound {
        /// Table searched.
        table: String,
        /// Missing column.
        column: String,
    },

    /// Column already exists in a table.
    #[error("column {column} already exists in table {table}")]
    DuplicateColumn {
        /// Table.
        table: String,
        /// Existing column.
        column: String,
    },

    /// A row with the same primary key already exists.
    #[error("duplicate key {key} in table {table}")]
    DuplicateKey {
        /// Table.
        table: String,
        /// Rendered key.
        key: String,
    },

    /// A row violates a column constraint.
    #[error("constraint violation: {message}")]
    ConstraintViolation {
        /// Description of the violation.
        message: String,
    },

    /// A decoded snapshot is structurally inconsistent.
    #[error("snapshot corrupted: {message}")]
    Corrupted {
        /// Description of the inconsistency.
        message: String,
    },

    /// The live column set could not be read or reconciled.
    #[error("schema introspection failed: {message}")]
    SchemaIntrospection {
        /// Description of the failure.
        message: String,
    },

    /// Migration failed.
    #[error("migration failed: {message}")]
    MigrationFailed {
        /// Description of the failure.
        message: String,
    },

    /// The column exists but may not be changed after insert.
    #[error("column {column} cannot be updated after insert")]
    RestrictedColumn {
        /// The rejected column.
        column: String,
    },

    /// The column name is not part of the schema.
    #[error("unknown column: {column}")]
    UnknownColumn {
        /// The rejected column name.
        column: String,
    },

    /// A natural key was rejected.
    #[error("invalid patient key: {message}")]
    InvalidKey {
        /// Why the key was rejected.
        message: String,
    },

    /// The mutation was applied in memory but the snapshot was not stored.
    ///
    /// The next successful flush will include it.
    #[error("snapshot flush failed: {source}")]
    FlushFailed {
        /// The blob store error.
        #[source]
        source: encounterdb_storage::StorageError,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Self::TableNotFound { name: name.into() }
    }

    /// Creates a column not found error.
    pub fn column_not_found(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates a constraint violation error.
    pub fn constraint_violation(message: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            message: message.into(),
        }
    }

    /// Creates a corrupted snapshot error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }

    /// Creates a schema introspection error.
    pub fn schema_introspection(message: impl Into<String>) -> Self {
        Self::SchemaIntrospection {
            message: message.into(),
        }
    }

    /// Creates a migration failed error.
    pub fn migration_failed(message: impl Into<String>) -> Self {
        Self::MigrationFailed {
            message: message.into(),
        }
    }

    /// Creates an invalid key error.
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns `true` if the error means the loaded state cannot be trusted.
    ///
    /// These are the failures the engine handle recovers from by starting a
    /// fresh schema.
    #[must_use]
    pub fn is_initialization_fatal(&self) -> bool {
        matches!(
            self,
            Self::Codec(_)
                | Self::Corrupted { .. }
                | Self::SchemaIntrospection { .. }
                | Self::MigrationFailed { .. }
        )
    }
}
