//! The embedded relational engine.
//!
//! An [`Engine`] is the complete in-memory database: a set of named
//! [`Table`]s plus the schema revision it was last reconciled against. It
//! never suspends and never touches storage; durability is the engine
//! handle's job, one whole snapshot at a time.

mod table;

pub use table::{ColumnDef, ColumnKind, RowKey, RowRef, Table};

use crate::error::{CoreError, CoreResult};
use std::collections::BTreeMap;

/// In-memory database state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Engine {
    revision: u32,
    tables: BTreeMap<String, Table>,
}

impl Engine {
    /// Creates an engine with no tables at revision 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(revision: u32, tables: Vec<Table>) -> CoreResult<Self> {
        let mut map = BTreeMap::new();
        for table in tables {
            let name = table.name().to_string();
            if map.insert(name.clone(), table).is_some() {
                return Err(CoreError::corrupted(format!("table {name} appears twice")));
            }
        }
        Ok(Self {
            revision,
            tables: map,
        })
    }

    /// Highest schema revision applied to this engine.
    #[must_use]
    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub(crate) fn set_revision(&mut self, revision: u32) {
        self.revision = revision;
    }

    /// Adds a table.
    ///
    /// # Errors
    ///
    /// Returns an error if a table with the same name exists.
    pub fn create_table(&mut self, table: Table) -> CoreResult<()> {
        if self.tables.contains_key(table.name()) {
            return Err(CoreError::DuplicateTable {
                name: table.name().to_string(),
            });
        }
        self.tables.insert(table.name().to_string(), table);
        Ok(())
    }

    /// Returns `true` if the table exists.
    #[must_use]
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Returns a table by name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TableNotFound`] if it does not exist.
    pub fn table(&self, name: &str) -> CoreResult<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| CoreError::table_not_found(name))
    }

    /// Returns a table by name for mutation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TableNotFound`] if it does not exist.
    pub fn table_mut(&mut self, name: &str) -> CoreResult<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| CoreError::table_not_found(name))
    }

    /// Physical column names of a table, in order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SchemaIntrospection`] if the table is missing.
    pub fn column_names(&self, table: &str) -> CoreResult<Vec<String>> {
        let table = self.tables.get(table).ok_or_else(|| {
            CoreError::schema_introspection(format!("table {table} is missing"))
        })?;
        Ok(table.column_names().into_iter().map(String::from).collect())
    }

    /// All tables in name order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> Table {
        Table::new(
            name,
            vec![ColumnDef::required("id", ColumnKind::Text)],
            "id",
            false,
        )
        .unwrap()
    }

    #[test]
    fn new_engine_is_empty() {
        let engine = Engine::new();
        assert_eq!(engine.revision(), 0);
        assert_eq!(engine.tables().count(), 0);
    }

    #[test]
    fn create_and_lookup_table() {
        let mut engine = Engine::new();
        engine.create_table(table("a")).unwrap();
        assert!(engine.has_table("a"));
        assert_eq!(engine.column_names("a").unwrap(), vec!["id".to_string()]);
    }

    #[test]
    fn duplicate_table_rejected() {
        let mut engine = Engine::new();
        engine.create_table(table("a")).unwrap();
        assert!(matches!(
            engine.create_table(table("a")),
            Err(CoreError::DuplicateTable { .. })
        ));
    }

    #[test]
    fn missing_table_fails_introspection() {
        let engine = Engine::new();
        assert!(matches!(
            engine.column_names("nope"),
            Err(CoreError::SchemaIntrospection { .. })
        ));
        assert!(matches!(
            engine.table("nope"),
            Err(CoreError::TableNotFound { .. })
        ));
    }
}
