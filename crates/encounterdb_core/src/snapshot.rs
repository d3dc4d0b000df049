//! Engine snapshot encoding.
//!
//! The engine is converted to a plain image (tables as column lists plus
//! row vectors) and framed by [`encounterdb_codec::encode_snapshot`].
//! Decoding rebuilds every table through its validating constructor, so a
//! snapshot that frames correctly but breaks an engine invariant (ragged
//! rows, duplicate keys, a counter behind its rows) is still rejected.

use crate::engine::{ColumnDef, Engine, Table};
use crate::error::CoreResult;
use encounterdb_codec::{decode_snapshot, encode_snapshot, Value};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct EngineImage {
    revision: u32,
    tables: Vec<TableImage>,
}

#[derive(Serialize, Deserialize)]
struct TableImage {
    name: String,
    columns: Vec<ColumnDef>,
    primary_key: usize,
    autoincrement: bool,
    next_rowid: i64,
    rows: Vec<Vec<Value>>,
}

impl From<&Table> for TableImage {
    fn from(table: &Table) -> Self {
        Self {
            name: table.name().to_string(),
            columns: table.columns().to_vec(),
            primary_key: table.primary_key_index(),
            autoincrement: table.is_autoincrement(),
            next_rowid: table.next_rowid(),
            rows: table.raw_rows().cloned().collect(),
        }
    }
}

impl Engine {
    /// Serializes the whole engine into snapshot bytes.
    ///
    /// Encoding is deterministic: equal engines produce equal bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let image = EngineImage {
            revision: self.revision(),
            tables: self.tables().map(TableImage::from).collect(),
        };
        Ok(encode_snapshot(&image)?)
    }

    /// Reconstructs an engine from snapshot bytes.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the frame is damaged, or
    /// [`crate::CoreError::Corrupted`] if the content is inconsistent.
    pub fn decode(bytes: &[u8]) -> CoreResult<Self> {
        let image: EngineImage = decode_snapshot(bytes)?;
        let tables = image
            .tables
            .into_iter()
            .map(|t| {
                Table::from_parts(
                    t.name,
                    t.columns,
                    t.primary_key,
                    t.autoincrement,
                    t.next_rowid,
                    t.rows,
                )
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Engine::from_parts(image.revision, tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ColumnKind, RowKey};
    use crate::error::CoreError;

    fn populated() -> Engine {
        let mut engine = Engine::new();
        let mut people = Table::new(
            "people",
            vec![
                ColumnDef::required("id", ColumnKind::Text),
                ColumnDef::nullable("doc", ColumnKind::Text),
            ],
            "id",
            false,
        )
        .unwrap();
        people
            .insert(vec![("id", "b".into()), ("doc", r#"{"n":2}"#.into())])
            .unwrap();
        people.insert(vec![("id", "a".into())]).unwrap();

        let mut visits = Table::new(
            "visits",
            vec![
                ColumnDef::required("id", ColumnKind::Integer),
                ColumnDef::required("who", ColumnKind::Text),
            ],
            "id",
            true,
        )
        .unwrap();
        visits.insert(vec![("who", "a".into())]).unwrap();
        visits.insert(vec![("who", "b".into())]).unwrap();

        engine.create_table(people).unwrap();
        engine.create_table(visits).unwrap();
        engine.set_revision(4);
        engine
    }

    #[test]
    fn decode_reproduces_engine() {
        let engine = populated();
        let decoded = Engine::decode(&engine.encode().unwrap()).unwrap();
        assert_eq!(decoded, engine);
        assert_eq!(decoded.revision(), 4);
    }

    #[test]
    fn counter_survives_reload() {
        let engine = populated();
        let mut decoded = Engine::decode(&engine.encode().unwrap()).unwrap();
        let key = decoded
            .table_mut("visits")
            .unwrap()
            .insert(vec![("who", "c".into())])
            .unwrap();
        assert_eq!(key, RowKey::Integer(3));
    }

    #[test]
    fn reencoding_is_byte_identical() {
        let bytes = populated().encode().unwrap();
        let again = Engine::decode(&bytes).unwrap().encode().unwrap();
        assert_eq!(bytes, again);
    }

    #[test]
    fn truncated_bytes_rejected() {
        let bytes = populated().encode().unwrap();
        let result = Engine::decode(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(CoreError::Codec(_))));
    }

    #[test]
    fn garbage_rejected() {
        assert!(Engine::decode(b"[1,2,3]").is_err());
    }
}
