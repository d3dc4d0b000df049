//! Opaque sub-documents.

use crate::error::{CodecError, CodecResult};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An independently serialized structured value stored in one column.
///
/// A `Document` holds JSON text: field-keyed, self-describing and readable
/// in a raw dump. The store never looks inside a document except to pick a
/// sort key, so clinical content can change shape without a schema change.
///
/// The text is kept exactly as supplied. Two documents compare equal only if
/// their bytes are identical.
///
/// Deserializing goes through [`Document::from_json`], so malformed text is
/// rejected at the boundary instead of reaching storage.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Document(String);

impl Document {
    /// The empty object `{}`.
    #[must_use]
    pub fn empty() -> Self {
        Self("{}".to_string())
    }

    /// Wraps JSON text after checking that it is well-formed.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidDocument`] if `json` does not parse.
    pub fn from_json(json: impl Into<String>) -> CodecResult<Self> {
        let json = json.into();
        serde_json::from_str::<IgnoredAny>(&json)?;
        Ok(Self(json))
    }

    /// Serializes any value into a document.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be represented as JSON.
    pub fn from_value<T: Serialize + ?Sized>(value: &T) -> CodecResult<Self> {
        Ok(Self(serde_json::to_string(value)?))
    }

    /// A document whose content is a single JSON string.
    ///
    /// Used for free-text columns such as the summary.
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self(serde_json::Value::String(text.to_string()).to_string())
    }

    /// Deserializes the document into a concrete type.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not match `T`.
    pub fn to_value<T: DeserializeOwned>(&self) -> CodecResult<T> {
        Ok(serde_json::from_str(&self.0)?)
    }

    /// Returns the string content of a [`Document::text`] document.
    #[must_use]
    pub fn as_plain_text(&self) -> Option<String> {
        serde_json::from_str::<String>(&self.0).ok()
    }

    /// Returns a top-level field rendered as text, for ordering.
    ///
    /// Strings are returned as-is, numbers and booleans in their JSON form.
    /// Anything else (missing field, nested value, non-object document)
    /// yields `None`.
    #[must_use]
    pub fn field_text(&self, field: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(&self.0).ok()?;
        match value.get(field)? {
            serde_json::Value::String(s) => Some(s.clone()),
            v @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_)) => Some(v.to_string()),
            _ => None,
        }
    }

    /// The raw JSON text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the document, returning its JSON text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Document({})", self.0)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<serde_json::Value> for Document {
    fn from(value: serde_json::Value) -> Self {
        Self(value.to_string())
    }
}

impl TryFrom<String> for Document {
    type Error = CodecError;

    fn try_from(json: String) -> CodecResult<Self> {
        Self::from_json(json)
    }
}

impl From<Document> for String {
    fn from(document: Document) -> Self {
        document.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Demographics {
        nombre: String,
        dni: String,
    }

    #[test]
    fn from_json_keeps_bytes_verbatim() {
        let doc = Document::from_json(r#"{ "b": 1,   "a": 2 }"#).unwrap();
        assert_eq!(doc.as_str(), r#"{ "b": 1,   "a": 2 }"#);
    }

    #[test]
    fn from_json_rejects_malformed() {
        let result = Document::from_json("{not json");
        assert!(matches!(result, Err(CodecError::InvalidDocument { .. })));
    }

    #[test]
    fn typed_values_survive() {
        let d = Demographics {
            nombre: "Ana".into(),
            dni: "30111222".into(),
        };
        let doc = Document::from_value(&d).unwrap();
        assert_eq!(doc.to_value::<Demographics>().unwrap(), d);
    }

    #[test]
    fn text_documents_escape_and_unescape() {
        let doc = Document::text("line \"one\"\nline two");
        assert_eq!(doc.as_str(), r#""line \"one\"\nline two""#);
        assert_eq!(doc.as_plain_text().as_deref(), Some("line \"one\"\nline two"));
    }

    #[test]
    fn field_text_reads_top_level_scalars() {
        let doc = Document::from_json(r#"{"nombre":"Ana","edad":41,"x":{"y":1}}"#).unwrap();
        assert_eq!(doc.field_text("nombre").as_deref(), Some("Ana"));
        assert_eq!(doc.field_text("edad").as_deref(), Some("41"));
        assert_eq!(doc.field_text("x"), None);
        assert_eq!(doc.field_text("missing"), None);
        assert_eq!(Document::text("plain").field_text("nombre"), None);
    }

    #[test]
    fn deserialize_rejects_malformed_text() {
        assert!(serde_json::from_str::<Document>(r#""{not json""#).is_err());
        let doc: Document = serde_json::from_str(r#""{\"a\": 1}""#).unwrap();
        assert_eq!(doc.as_str(), r#"{"a": 1}"#);
    }

    #[test]
    fn serializes_as_its_text() {
        let doc = Document::from_json(r#"{"a":1}"#).unwrap();
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#""{\"a\":1}""#);
    }

    #[test]
    fn default_is_empty_object() {
        assert_eq!(Document::default().as_str(), "{}");
    }
}
