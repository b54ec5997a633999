use crate::constants::{LEFT_SUFFIX, RIGHT_SUFFIX};
use crate::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Storage class of a column, fixed once per source after parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Text,
    Integer,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
        }
    }
}

/// A single cell value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Ordered, uniquely named columns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Build a schema, rejecting repeated column names. `origin` names the
    /// source in the error message.
    pub fn try_new(columns: Vec<Column>, origin: &str) -> Result<Self> {
        let mut seen = HashSet::new();
        for c in &columns {
            if !seen.insert(c.name.as_str()) {
                return Err(EtlError::DuplicateColumn {
                    origin: origin.to_string(),
                    column: c.name.clone(),
                });
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Concatenate two column lists, suffixing names that appear on both sides
/// with `_x` (left) and `_y` (right).
pub fn concat_columns(left: &[Column], right: &[Column]) -> Vec<Column> {
    let left_names: HashSet<&str> = left.iter().map(|c| c.name.as_str()).collect();
    let right_names: HashSet<&str> = right.iter().map(|c| c.name.as_str()).collect();

    let mut out = Vec::with_capacity(left.len() + right.len());
    for c in left {
        let name = if right_names.contains(c.name.as_str()) {
            format!("{}{}", c.name, LEFT_SUFFIX)
        } else {
            c.name.clone()
        };
        out.push(Column::new(name, c.column_type));
    }
    for c in right {
        let name = if left_names.contains(c.name.as_str()) {
            format!("{}{}", c.name, RIGHT_SUFFIX)
        } else {
            c.name.clone()
        };
        out.push(Column::new(name, c.column_type));
    }
    out
}

pub type Row = Vec<Value>;

/// In-memory table: a schema plus rows of matching width
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    schema: Schema,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(schema: Schema, rows: Vec<Row>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == schema.len()));
        Self { schema, rows }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value at `row` in the named column
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.schema.index_of(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// All values of the named column, in row order
    pub fn column_values(&self, column: &str) -> Option<Vec<&Value>> {
        let idx = self.schema.index_of(column)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    pub fn into_parts(self) -> (Schema, Vec<Row>) {
        (self.schema, self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_rejects_duplicate_names() {
        let cols = vec![
            Column::new("id", ColumnType::Integer),
            Column::new("id", ColumnType::Text),
        ];
        let err = Schema::try_new(cols, "messages.csv").unwrap_err();
        assert!(matches!(err, EtlError::DuplicateColumn { ref column, .. } if column == "id"));
    }

    #[test]
    fn test_concat_columns_suffixes_collisions() {
        let left = vec![
            Column::new("message", ColumnType::Text),
            Column::new("genre", ColumnType::Text),
        ];
        let right = vec![
            Column::new("genre", ColumnType::Text),
            Column::new("categories", ColumnType::Text),
        ];
        let names: Vec<String> = concat_columns(&left, &right)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["message", "genre_x", "genre_y", "categories"]);
    }

    #[test]
    fn test_table_value_lookup() {
        let schema = Schema::try_new(
            vec![
                Column::new("id", ColumnType::Integer),
                Column::new("message", ColumnType::Text),
            ],
            "test",
        )
        .unwrap();
        let table = Table::new(schema, vec![vec![Value::Integer(7), Value::from("flood")]]);
        assert_eq!(table.value(0, "message"), Some(&Value::from("flood")));
        assert_eq!(table.value(0, "missing"), None);
        assert_eq!(table.value(1, "id"), None);
        assert_eq!(Value::Null.to_string(), "");
    }
}
