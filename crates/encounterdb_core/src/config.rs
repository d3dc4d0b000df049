//! Repository configuration.

/// Key under which the database snapshot is stored by default.
pub const DEFAULT_SNAPSHOT_KEY: &str = "clinical_records_db";

/// Demographic field used to order patient summaries by default.
pub const DEFAULT_SORT_FIELD: &str = "nombre";

/// Configuration for opening an engine handle.
#[derive(Debug, Clone)]
pub struct Config {
    /// The one well-known blob store key holding the snapshot.
    pub snapshot_key: String,

    /// Top-level demographic field that orders patient summaries.
    ///
    /// `None` orders by the raw serialized demographic text.
    pub patient_sort_field: Option<String>,

    /// Whether an unreadable snapshot is discarded in favor of a fresh
    /// schema (`true`) or reported as [`crate::CoreError::Corrupted`].
    ///
    /// Discarding loses every stored record. It is the default because a
    /// corrupt local store must not block the application.
    pub discard_corrupt_snapshot: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
            patient_sort_field: Some(DEFAULT_SORT_FIELD.to_string()),
            discard_corrupt_snapshot: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the snapshot key.
    #[must_use]
    pub fn snapshot_key(mut self, key: impl Into<String>) -> Self {
        self.snapshot_key = key.into();
        self
    }

    /// Sets the demographic sort field (`None` for raw text order).
    #[must_use]
    pub fn patient_sort_field(mut self, field: Option<&str>) -> Self {
        self.patient_sort_field = field.map(String::from);
        self
    }

    /// Sets whether corrupt snapshots are discarded.
    #[must_use]
    pub fn discard_corrupt_snapshot(mut self, value: bool) -> Self {
        self.discard_corrupt_snapshot = value;
        self
    }
}
