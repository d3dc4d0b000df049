//! Property-based test generators using proptest.
//!
//! Provides strategies for patient keys, documents and sequences of
//! repository operations.

use encounterdb_codec::Document;
use encounterdb_core::{NewEncounter, PatientKey, UpdatableColumn};
use proptest::prelude::*;
use serde_json::{Map, Value};

/// Strategy for generating valid patient keys (national ID style).
pub fn patient_key_strategy() -> impl Strategy<Value = PatientKey> {
    prop::string::string_regex("[1-9][0-9]{6,7}")
        .expect("Invalid regex")
        .prop_map(|s| PatientKey::new(s).expect("generated key is valid"))
}

/// Strategy for generating a key from a small pool, so keys repeat.
pub fn repeating_key_strategy() -> impl Strategy<Value = PatientKey> {
    (0u8..4).prop_map(|n| PatientKey::new(format!("1000000{n}")).expect("pool key is valid"))
}

fn json_scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| Value::from(n)),
        "[a-zA-Z áéíóúñ]{0,16}".prop_map(Value::String),
    ]
}

/// Strategy for generating JSON object documents with scalar fields.
pub fn document_strategy() -> impl Strategy<Value = Document> {
    prop::collection::btree_map("[a-z_]{1,10}", json_scalar_strategy(), 0..5).prop_map(|fields| {
        let object: Map<String, Value> = fields.into_iter().collect();
        Document::from(Value::Object(object))
    })
}

/// Strategy for generating demographics with a `nombre` field.
pub fn demographics_strategy() -> impl Strategy<Value = Document> {
    ("[A-Z][a-z]{2,8}", 0u8..100).prop_map(|(name, age)| {
        Document::from(serde_json::json!({ "nombre": name, "edad": age }))
    })
}

/// Strategy for generating complete encounters.
pub fn encounter_strategy() -> impl Strategy<Value = NewEncounter> {
    (
        demographics_strategy(),
        document_strategy(),
        document_strategy(),
        document_strategy(),
        document_strategy(),
        prop::option::of(document_strategy()),
        prop::option::of("[a-z ]{0,40}"),
    )
        .prop_map(
            |(demographics, anamnesis, physical_exam, scales, imaging, impact, summary)| {
                NewEncounter {
                    demographics,
                    anamnesis,
                    physical_exam,
                    scales,
                    imaging,
                    impact,
                    summary: summary.map(|s| Document::text(&s)),
                }
            },
        )
}

/// Strategy for generating an updatable column.
pub fn updatable_column_strategy() -> impl Strategy<Value = UpdatableColumn> {
    prop::sample::select(UpdatableColumn::ALL.to_vec())
}

/// A repository operation.
#[derive(Debug, Clone)]
pub enum RepositoryOperation {
    /// Insert an encounter, upserting the patient.
    Insert {
        /// Patient key
        key: PatientKey,
        /// Encounter data
        encounter: NewEncounter,
    },
    /// Update a column of a previously inserted record.
    Update {
        /// Index into the records inserted so far (wrapped)
        target: usize,
        /// Column to replace
        column: UpdatableColumn,
        /// New value
        value: Document,
    },
}

/// Strategy for generating repository operations.
pub fn repository_operation_strategy() -> impl Strategy<Value = RepositoryOperation> {
    prop_oneof![
        3 => (repeating_key_strategy(), encounter_strategy())
            .prop_map(|(key, encounter)| RepositoryOperation::Insert { key, encounter }),
        2 => (any::<usize>(), updatable_column_strategy(), document_strategy())
            .prop_map(|(target, column, value)| RepositoryOperation::Update { target, column, value }),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<RepositoryOperation>> {
    prop::collection::vec(repository_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
