//! Tables, columns and rows.

use crate::error::{CoreError, CoreResult};
use encounterdb_codec::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// 64-bit signed integer.
    Integer,
    /// UTF-8 text.
    Text,
}

impl ColumnKind {
    fn admits(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null) | (ColumnKind::Integer, Value::Integer(_)) | (ColumnKind::Text, Value::Text(_))
        )
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Integer => f.write_str("INTEGER"),
            ColumnKind::Text => f.write_str("TEXT"),
        }
    }
}

/// A physical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name, unique within its table.
    pub name: String,
    /// Storage class.
    pub kind: ColumnKind,
    /// Whether null is rejected.
    pub not_null: bool,
}

impl ColumnDef {
    /// A nullable column.
    #[must_use]
    pub fn nullable(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            not_null: false,
        }
    }

    /// A column that rejects null.
    #[must_use]
    pub fn required(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            not_null: true,
        }
    }
}

/// Primary key of a row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RowKey {
    /// Integer key (surrogate).
    Integer(i64),
    /// Text key (natural).
    Text(String),
}

impl RowKey {
    /// Converts a cell into a key. Null cannot be a key.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(n) => Some(RowKey::Integer(*n)),
            Value::Text(s) => Some(RowKey::Text(s.clone())),
            Value::Null => None,
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Integer(n) => write!(f, "{n}"),
            RowKey::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// A read-only view of one row.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'t> {
    columns: &'t [ColumnDef],
    values: &'t [Value],
}

impl<'t> RowRef<'t> {
    /// Returns the cell of `column`, or `None` if the table has no such column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&'t Value> {
        self.columns
            .iter()
            .position(|c| c.name == column)
            .map(|i| &self.values[i])
    }

    /// Returns the text cell of `column`, treating null and missing alike.
    #[must_use]
    pub fn text(&self, column: &str) -> Option<&'t str> {
        self.get(column).and_then(Value::as_text)
    }

    /// All cells in column order.
    #[must_use]
    pub fn values(&self) -> &'t [Value] {
        self.values
    }
}

/// One relation: an ordered column list and rows keyed by primary key.
///
/// Rows are stored as cell vectors aligned with the column list. Adding a
/// column appends a null cell to every existing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    columns: Vec<ColumnDef>,
    primary_key: usize,
    autoincrement: bool,
    next_rowid: i64,
    rows: BTreeMap<RowKey, Vec<Value>>,
}

impl Table {
    /// Creates an empty table.
    ///
    /// With `autoincrement`, an integer primary key left null on insert is
    /// assigned the next value of a counter that never goes backwards.
    ///
    /// # Errors
    ///
    /// Returns an error if column names repeat, the primary key column is
    /// missing, or `autoincrement` is requested on a non-integer key.
    pub fn new(
        name: &str,
        columns: Vec<ColumnDef>,
        primary_key: &str,
        autoincrement: bool,
    ) -> CoreResult<Self> {
        let pk = columns
            .iter()
            .position(|c| c.name == primary_key)
            .ok_or_else(|| CoreError::column_not_found(name, primary_key))?;
        check_layout(name, &columns, pk, autoincrement)?;

        Ok(Self {
            name: name.to_string(),
            columns,
            primary_key: pk,
            autoincrement,
            next_rowid: 1,
            rows: BTreeMap::new(),
        })
    }

    /// Rebuilds a table from its parts, validating every row.
    pub(crate) fn from_parts(
        name: String,
        columns: Vec<ColumnDef>,
        primary_key: usize,
        autoincrement: bool,
        next_rowid: i64,
        rows: Vec<Vec<Value>>,
    ) -> CoreResult<Self> {
        if primary_key >= columns.len() {
            return Err(CoreError::corrupted(format!(
                "table {name}: primary key index {primary_key} out of range"
            )));
        }
        check_layout(&name, &columns, primary_key, autoincrement)
            .map_err(|e| CoreError::corrupted(format!("table {name}: {e}")))?;
        let mut map = BTreeMap::new();
        for row in rows {
            if row.len() != columns.len() {
                return Err(CoreError::corrupted(format!(
                    "table {name}: row has {} cells, expected {}",
                    row.len(),
                    columns.len()
                )));
            }
            for (column, value) in columns.iter().zip(&row) {
                if !column.kind.admits(value) || (column.not_null && value.is_null()) {
                    return Err(CoreError::corrupted(format!(
                        "table {name}: {} cell in {} column {}",
                        value.type_name(),
                        column.kind,
                        column.name
                    )));
                }
            }
            let key = RowKey::from_value(&row[primary_key])
                .ok_or_else(|| CoreError::corrupted(format!("table {name}: null primary key")))?;
            if let RowKey::Integer(n) = key {
                if autoincrement && n >= next_rowid {
                    return Err(CoreError::corrupted(format!(
                        "table {name}: row id {n} not below counter {next_rowid}"
                    )));
                }
            }
            if map.insert(key.clone(), row).is_some() {
                return Err(CoreError::corrupted(format!(
                    "table {name}: duplicate key {key}"
                )));
            }
        }

        Ok(Self {
            name,
            columns,
            primary_key,
            autoincrement,
            next_rowid,
            rows: map,
        })
    }

    /// Table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical columns in order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Physical column names in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns the definition of `name`, if present.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Name of the primary key column.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        &self.columns[self.primary_key].name
    }

    pub(crate) fn primary_key_index(&self) -> usize {
        self.primary_key
    }

    /// Whether null integer keys are assigned from the counter.
    #[must_use]
    pub fn is_autoincrement(&self) -> bool {
        self.autoincrement
    }

    /// The value the next autoincrement insert will receive.
    #[must_use]
    pub fn next_rowid(&self) -> i64 {
        self.next_rowid
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Adds a nullable column; every existing row reads null for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the column exists or is declared `not_null`.
    pub fn add_column(&mut self, column: ColumnDef) -> CoreResult<()> {
        if self.column(&column.name).is_some() {
            return Err(CoreError::DuplicateColumn {
                table: self.name.clone(),
                column: column.name,
            });
        }
        if column.not_null {
            return Err(CoreError::constraint_violation(format!(
                "cannot add NOT NULL column {}.{} to existing rows",
                self.name, column.name
            )));
        }
        self.columns.push(column);
        for row in self.rows.values_mut() {
            row.push(Value::Null);
        }
        Ok(())
    }

    /// Inserts a row from `(column, value)` pairs; unnamed columns are null.
    ///
    /// # Errors
    ///
    /// Returns an error on unknown columns, kind or null violations, or a
    /// duplicate primary key. The table is unchanged on error.
    pub fn insert(&mut self, cells: Vec<(&str, Value)>) -> CoreResult<RowKey> {
        let mut row = vec![Value::Null; self.columns.len()];
        for (name, value) in cells {
            let index = self
                .columns
                .iter()
                .position(|c| c.name == name)
                .ok_or_else(|| CoreError::column_not_found(&self.name, name))?;
            row[index] = value;
        }

        let assigned = self.autoincrement && row[self.primary_key].is_null();
        if assigned {
            row[self.primary_key] = Value::Integer(self.next_rowid);
        }
        self.check_row(&row)?;

        let key = RowKey::from_value(&row[self.primary_key]).ok_or_else(|| {
            CoreError::constraint_violation(format!("{}.{} is null", self.name, self.primary_key()))
        })?;
        if self.rows.contains_key(&key) {
            return Err(CoreError::DuplicateKey {
                table: self.name.clone(),
                key: key.to_string(),
            });
        }

        if let RowKey::Integer(n) = key {
            if self.autoincrement {
                self.next_rowid = self.next_rowid.max(n.saturating_add(1));
            }
        }
        self.rows.insert(key.clone(), row);
        Ok(key)
    }

    /// Returns the row with primary key `key`.
    #[must_use]
    pub fn get(&self, key: &RowKey) -> Option<RowRef<'_>> {
        self.rows.get(key).map(|values| RowRef {
            columns: &self.columns,
            values,
        })
    }

    /// Returns `true` if a row with primary key `key` exists.
    #[must_use]
    pub fn contains(&self, key: &RowKey) -> bool {
        self.rows.contains_key(key)
    }

    /// Replaces one cell of one row. Returns `false` if no such row exists.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown columns, the primary key column, or a
    /// value the column does not admit.
    pub fn update_cell(&mut self, key: &RowKey, column: &str, value: Value) -> CoreResult<bool> {
        let index = self
            .columns
            .iter()
            .position(|c| c.name == column)
            .ok_or_else(|| CoreError::column_not_found(&self.name, column))?;
        if index == self.primary_key {
            return Err(CoreError::constraint_violation(format!(
                "primary key {}.{column} is immutable",
                self.name
            )));
        }
        let def = &self.columns[index];
        if !def.kind.admits(&value) || (def.not_null && value.is_null()) {
            return Err(CoreError::constraint_violation(format!(
                "{} value not allowed in {} column {}.{column}",
                value.type_name(),
                def.kind,
                self.name
            )));
        }

        match self.rows.get_mut(key) {
            Some(row) => {
                row[index] = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Iterates rows in primary key order.
    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.values().map(move |values| RowRef {
            columns: &self.columns,
            values,
        })
    }

    pub(crate) fn raw_rows(&self) -> impl Iterator<Item = &Vec<Value>> {
        self.rows.values()
    }

    fn check_row(&self, row: &[Value]) -> CoreResult<()> {
        for (column, value) in self.columns.iter().zip(row) {
            if !column.kind.admits(value) {
                return Err(CoreError::constraint_violation(format!(
                    "{} value not allowed in {} column {}.{}",
                    value.type_name(),
                    column.kind,
                    self.name,
                    column.name
                )));
            }
            if column.not_null && value.is_null() {
                return Err(CoreError::constraint_violation(format!(
                    "{}.{} may not be null",
                    self.name, column.name
                )));
            }
        }
        Ok(())
    }
}

/// Column checks shared by fresh and decoded tables. `pk` must be in range.
fn check_layout(
    name: &str,
    columns: &[ColumnDef],
    pk: usize,
    autoincrement: bool,
) -> CoreResult<()> {
    for (i, column) in columns.iter().enumerate() {
        if columns[..i].iter().any(|c| c.name == column.name) {
            return Err(CoreError::DuplicateColumn {
                table: name.to_string(),
                column: column.name.clone(),
            });
        }
    }
    if autoincrement && columns[pk].kind != ColumnKind::Integer {
        return Err(CoreError::constraint_violation(format!(
            "autoincrement key {name}.{} must be INTEGER",
            columns[pk].name
        )));
    }
    Ok(())
}
