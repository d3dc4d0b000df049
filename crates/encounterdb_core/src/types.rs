//! Core type definitions for EncounterDB.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Natural key of a patient (for example a national ID number).
///
/// Supplied by the caller and immutable once the patient exists.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientKey(String);

impl PatientKey {
    /// Creates a key, rejecting empty or surrounding-whitespace input.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidKey`] if the key is blank or padded.
    pub fn new(key: impl Into<String>) -> CoreResult<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(CoreError::invalid_key("key is empty"));
        }
        if key.trim() != key {
            return Err(CoreError::invalid_key(format!(
                "key {key:?} has leading or trailing whitespace"
            )));
        }
        Ok(Self(key))
    }

    /// Returns the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for PatientKey {
    type Error = CoreError;

    fn try_from(key: &str) -> CoreResult<Self> {
        Self::new(key)
    }
}

/// Surrogate key of a clinical record.
///
/// Assigned by the store, unique across all patients and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl RecordId {
    /// Creates a record ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rec:{}", self.0)
    }
}

/// Result of a single-column update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The record existed and the column was replaced.
    Updated,
    /// No record has the given ID; nothing was written.
    NotFound,
}
