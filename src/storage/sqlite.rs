//! `SQLite` storage for loaded datasets
//!
//! Connections are opened per call and dropped on every exit path. Each load
//! runs inside one transaction, so a failed load leaves the table as it was.

use crate::error::{EtlError, Result};
use crate::etl::Loader;
use crate::table::{Dataset, Value};
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// How a load treats an existing table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Drop and recreate the table from the dataset
    #[default]
    Replace,
    /// Keep existing rows and insert the new ones
    Append,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Replace => write!(f, "replace"),
            WriteMode::Append => write!(f, "append"),
        }
    }
}

/// A single-file `SQLite` database
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open for writing, creating the file and its directory if needed.
    pub fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Connection::open(&self.path)?)
    }

    /// Open an existing database without write access.
    pub fn open_read_only(&self) -> Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Ok(Connection::open_with_flags(&self.path, flags)?)
    }

    /// Number of rows in `table`.
    pub fn row_count(&self, table: &str) -> Result<usize> {
        let conn = self.open_read_only()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Column names of `table` in declaration order; empty when absent.
    pub fn columns(&self, table: &str) -> Result<Vec<String>> {
        let conn = self.open_read_only()?;
        table_columns(&conn, table)
    }
}

/// Load a dataset into one table
pub struct SqliteLoader {
    store: SqliteStore,
    table: String,
    mode: WriteMode,
}

impl SqliteLoader {
    pub fn new(store: SqliteStore, table: impl Into<String>, mode: WriteMode) -> Self {
        Self {
            store,
            table: table.into(),
            mode,
        }
    }

    pub fn write(&self, dataset: &Dataset) -> Result<usize> {
        dataset.schema().ensure_unique()?;

        let mut conn = self.store.open()?;
        let tx = conn.transaction()?;
        let existing = table_columns(&tx, &self.table)?;

        match self.mode {
            WriteMode::Replace => {
                if !existing.is_empty() {
                    log::debug!("Dropping existing table {}", self.table);
                    tx.execute_batch(&format!("DROP TABLE {}", quote_ident(&self.table)))?;
                }
                tx.execute_batch(&create_table_sql(&self.table, dataset))?;
            }
            WriteMode::Append if existing.is_empty() => {
                log::debug!("Table {} does not exist yet, creating it", self.table);
                tx.execute_batch(&create_table_sql(&self.table, dataset))?;
            }
            WriteMode::Append => {
                if !dataset.schema().same_fields_as(&existing) {
                    return Err(EtlError::schema(format!(
                        "dataset columns {} do not match table {} columns [{}]",
                        dataset.schema(),
                        self.table,
                        existing.join(", ")
                    )));
                }
            }
        }

        {
            let mut stmt = tx.prepare(&insert_sql(&self.table, dataset))?;
            for record in dataset.records() {
                stmt.execute(rusqlite::params_from_iter(record.values()))?;
            }
        }
        tx.commit()?;

        Ok(dataset.len())
    }
}

impl Loader for SqliteLoader {
    fn destination(&self) -> String {
        format!(
            "table '{}' in {} ({})",
            self.table,
            self.store.path().display(),
            self.mode
        )
    }

    fn load(&self, dataset: &Dataset) -> Result<usize> {
        self.write(dataset)
    }
}

/// Quote an identifier, doubling embedded quotes.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

/// Column type from the values a column holds.
fn column_type(dataset: &Dataset, index: usize) -> &'static str {
    let (mut ints, mut floats) = (false, false);
    for record in dataset.records() {
        match record.get(index) {
            Some(Value::Text(_)) => return "TEXT",
            Some(Value::Float(_)) => floats = true,
            Some(Value::Integer(_)) => ints = true,
            _ => {}
        }
    }
    match (floats, ints) {
        (true, _) => "REAL",
        (false, true) => "INTEGER",
        (false, false) => "TEXT",
    }
}

fn create_table_sql(table: &str, dataset: &Dataset) -> String {
    let columns = dataset
        .schema()
        .fields()
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{} {}", quote_ident(name), column_type(dataset, i)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", quote_ident(table), columns)
}

fn insert_sql(table: &str, dataset: &Dataset) -> String {
    let fields = dataset.schema().fields();
    let columns = fields
        .iter()
        .map(|f| quote_ident(f))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=fields.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns,
        placeholders
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Schema;
    use tempfile::TempDir;

    fn departments(rows: &[(i64, &str)]) -> Dataset {
        Dataset::from_rows(
            Schema::new(["DEPT_ID", "DEP_NAME"]),
            rows.iter()
                .map(|(id, name)| vec![Value::Integer(*id), Value::from(*name)])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_create_table_types() {
        let ds = Dataset::from_rows(
            Schema::new(["id", "score", "name", "mixed"]),
            vec![
                vec![1.into(), 2.5.into(), "a".into(), 3.into()],
                vec![2.into(), 3.into(), "b".into(), "x".into()],
            ],
        )
        .unwrap();
        assert_eq!(
            create_table_sql("t", &ds),
            "CREATE TABLE \"t\" (\"id\" INTEGER, \"score\" REAL, \"name\" TEXT, \"mixed\" TEXT)"
        );
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("Bank name"), "\"Bank name\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_replace_then_append() {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("STAFF.db"));

        SqliteLoader::new(store.clone(), "Departments", WriteMode::Replace)
            .load(&departments(&[(1, "Purchase"), (2, "Sales")]))
            .unwrap();
        SqliteLoader::new(store.clone(), "Departments", WriteMode::Append)
            .load(&departments(&[(9, "Quality Assurance")]))
            .unwrap();

        assert_eq!(store.row_count("Departments").unwrap(), 3);
        assert_eq!(store.columns("Departments").unwrap(), ["DEPT_ID", "DEP_NAME"]);
    }

    #[test]
    fn test_append_creates_missing_table() {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("new.db"));

        SqliteLoader::new(store.clone(), "users", WriteMode::Append)
            .load(&departments(&[(1, "x")]))
            .unwrap();
        assert_eq!(store.row_count("users").unwrap(), 1);
    }

    #[test]
    fn test_append_accepts_reordered_columns() {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("STAFF.db"));
        SqliteLoader::new(store.clone(), "Departments", WriteMode::Replace)
            .load(&departments(&[(1, "Purchase")]))
            .unwrap();

        let reordered = Dataset::from_rows(
            Schema::new(["DEP_NAME", "DEPT_ID"]),
            vec![vec!["Sales".into(), 2.into()]],
        )
        .unwrap();
        SqliteLoader::new(store.clone(), "Departments", WriteMode::Append)
            .load(&reordered)
            .unwrap();
        assert_eq!(store.row_count("Departments").unwrap(), 2);
    }
}
