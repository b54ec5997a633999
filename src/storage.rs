//! Persister stage: the storage boundary and its SQLite implementation
//!
//! The pipeline only talks to a [`TableStore`]. Its single write operation
//! replaces a whole table: drop if it exists, create from the table's
//! schema, insert every row. [`SqliteStore`] does this inside one
//! transaction, so readers see either the previous table or the new one.
//!
//! Column types map directly: `Text` becomes `TEXT`, `Integer` becomes
//! `INTEGER`. Table and column names are double-quoted, so category names
//! that are SQL keywords or contain spaces are stored verbatim.

use crate::error::Result;
use crate::metrics::PersisterMetrics;
use crate::types::{Column, ColumnType, Row, Schema, Table, Value};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Destination for the cleaned table.
///
/// `replace_table` is drop-if-exists, then create, then insert: a table of
/// the same name never survives, and nothing is merged or appended.
pub trait TableStore {
    fn replace_table(&mut self, name: &str, table: &Table) -> Result<()>;

    /// Read a table back, or `None` if it does not exist
    fn load_table(&self, name: &str) -> Result<Option<Table>>;
}

/// In-memory store for development/testing
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: HashMap<String, Table>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(|k| k.as_str()).collect()
    }
}

impl TableStore for InMemoryStore {
    fn replace_table(&mut self, name: &str, table: &Table) -> Result<()> {
        self.tables.insert(name.to_string(), table.clone());
        debug!("Replaced in-memory table {} ({} rows)", name, table.len());
        Ok(())
    }

    fn load_table(&self, name: &str) -> Result<Option<Table>> {
        Ok(self.tables.get(name).cloned())
    }
}

/// SQLite-backed store
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database file, along with its parent
    /// directories
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

/// Double-quote an identifier, escaping embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(name: &str, schema: &Schema) -> String {
    let columns: Vec<String> = schema
        .columns()
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.column_type.sql_type()))
        .collect();
    format!("CREATE TABLE {} ({})", quote_ident(name), columns.join(", "))
}

fn insert_sql(name: &str, schema: &Schema) -> String {
    let columns: Vec<String> = schema.columns().iter().map(|c| quote_ident(&c.name)).collect();
    let placeholders: Vec<String> = (1..=schema.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(name),
        columns.join(", "),
        placeholders.join(", ")
    )
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Text(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => {
            Value::Text(String::from_utf8_lossy(t).into_owned())
        }
    }
}

fn column_type_from_decl(decl: &str) -> ColumnType {
    if decl.to_ascii_uppercase().contains("INT") {
        ColumnType::Integer
    } else {
        ColumnType::Text
    }
}

impl TableStore for SqliteStore {
    fn replace_table(&mut self, name: &str, table: &Table) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)))?;
        tx.execute_batch(&create_table_sql(name, table.schema()))?;
        {
            let mut stmt = tx.prepare(&insert_sql(name, table.schema()))?;
            for row in table.rows() {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;
        debug!("Replaced table {} ({} rows)", name, table.len());
        Ok(())
    }

    fn load_table(&self, name: &str) -> Result<Option<Table>> {
        if !self.table_exists(name)? {
            return Ok(None);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map([name], |row| {
                let col_name: String = row.get(0)?;
                let decl: String = row.get(1)?;
                Ok(Column::new(col_name, column_type_from_decl(&decl)))
            })?
            .collect::<rusqlite::Result<Vec<Column>>>()?;
        let schema = Schema::try_new(columns, name)?;

        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {} ORDER BY rowid", quote_ident(name)))?;
        let width = schema.len();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(from_value_ref))
                    .collect::<rusqlite::Result<Row>>()
            })?
            .collect::<rusqlite::Result<Vec<Row>>>()?;

        Ok(Some(Table::new(schema, rows)))
    }
}

/// Write `table` into `store` under `table_name`, replacing any prior table
#[instrument(skip(store, table), fields(rows = table.len()))]
pub fn persist<S: TableStore + ?Sized>(
    store: &mut S,
    table: &Table,
    table_name: &str,
) -> Result<()> {
    let _timing = PersisterMetrics::duration_guard();
    store.replace_table(table_name, table)?;
    PersisterMetrics::record_table_replaced();
    PersisterMetrics::record_rows_written(table.len());
    info!(rows = table.len(), "Saved table {}", table_name);
    Ok(())
}

/// Open the SQLite database at `database` and replace `table_name` with `table`
pub fn save_data(table: &Table, database: &Path, table_name: &str) -> Result<()> {
    let mut store = SqliteStore::open(database)?;
    persist(&mut store, table, table_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        let schema = Schema::try_new(
            vec![
                Column::new("id", ColumnType::Integer),
                Column::new("message", ColumnType::Text),
                Column::new("original", ColumnType::Text),
                Column::new("related", ColumnType::Integer),
            ],
            "test",
        )
        .unwrap();
        Table::new(
            schema,
            vec![
                vec![Value::Integer(1), Value::from("flood"), Value::Null, Value::Integer(1)],
                vec![Value::Integer(2), Value::from("say \"hi\""), Value::from("x"), Value::Integer(0)],
            ],
        )
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("Message"), "\"Message\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_sqlite_round_trip_preserves_schema_and_rows() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let table = sample_table();
        store.replace_table("Message", &table).unwrap();

        let loaded = store.load_table("Message").unwrap().unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_replace_drops_previous_table() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.replace_table("Message", &sample_table()).unwrap();

        let schema = Schema::try_new(vec![Column::new("other", ColumnType::Text)], "test").unwrap();
        let replacement = Table::new(schema, vec![vec![Value::from("only")]]);
        store.replace_table("Message", &replacement).unwrap();

        let loaded = store.load_table("Message").unwrap().unwrap();
        assert_eq!(loaded, replacement);
    }

    #[test]
    fn test_missing_table_loads_as_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(!store.table_exists("Message").unwrap());
        assert!(store.load_table("Message").unwrap().is_none());
    }

    #[test]
    fn test_save_data_twice_equals_once() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested").join("DisasterResponse.db");
        let table = sample_table();

        save_data(&table, &db, "Message").unwrap();
        save_data(&table, &db, "Message").unwrap();

        let store = SqliteStore::open(&db).unwrap();
        assert_eq!(store.load_table("Message").unwrap().unwrap(), table);
    }

    #[test]
    fn test_in_memory_store_replaces() {
        let mut store = InMemoryStore::new();
        persist(&mut store, &sample_table(), "Message").unwrap();
        persist(&mut store, &sample_table(), "Message").unwrap();
        assert_eq!(store.table_names(), vec!["Message"]);
        assert_eq!(store.load_table("Message").unwrap().unwrap().len(), 2);
    }
}
