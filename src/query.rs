//! Read-only queries against a loaded database

use crate::error::{EtlError, Result};
use crate::storage::{SinkTarget, SqliteStore};
use crate::table::{Dataset, Schema, Value};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A query declared in the pipeline configuration
///
/// ```yaml
/// queries:
///   - database: World_Economies.db
///     sql: SELECT * FROM Countries_by_GDP WHERE GDP_USD_billions >= 100
///     label: economies above 100 billion
///     output:
///       kind: csv
///       path: economies_above_100_billion.csv
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub database: PathBuf,
    pub sql: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Where to save the result, if anywhere
    #[serde(default)]
    pub output: Option<SinkTarget>,
}

impl QuerySpec {
    pub fn new(database: impl AsRef<Path>, sql: impl Into<String>) -> Self {
        Self {
            database: database.as_ref().to_path_buf(),
            sql: sql.into(),
            label: None,
            output: None,
        }
    }

    pub fn with_output(mut self, output: SinkTarget) -> Self {
        self.output = Some(output);
        self
    }

    /// Label used in audit messages; the SQL text when none is set
    pub fn label(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.sql.clone())
    }
}

/// Runs read-only SQL and returns the rows as a dataset
pub struct QueryRunner {
    store: SqliteStore,
}

impl QueryRunner {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }

    pub fn open(database: impl AsRef<Path>) -> Self {
        Self::new(SqliteStore::new(database))
    }

    /// Run one statement.
    ///
    /// The database is opened read-only and statements that could write are
    /// rejected before they execute.
    ///
    /// # Errors
    /// `Query` for a missing database, malformed SQL, write statements and
    /// BLOB columns.
    pub fn run(&self, sql: &str) -> Result<Dataset> {
        let path = self.store.path();
        if !path.exists() {
            return Err(EtlError::Query(format!(
                "database {} does not exist",
                path.display()
            )));
        }

        let conn = self.store.open_read_only().map_err(EtlError::query)?;
        let mut stmt = conn.prepare(sql).map_err(EtlError::query)?;
        if !stmt.readonly() {
            return Err(EtlError::Query(format!(
                "only read-only statements are allowed: {}",
                sql.trim()
            )));
        }

        let schema = Schema::new(stmt.column_names());
        let width = schema.len();
        log::debug!("Running query on {}: {}", path.display(), sql);

        let mut dataset = Dataset::new(schema);
        let mut rows = stmt.query([]).map_err(EtlError::query)?;
        while let Some(row) = rows.next().map_err(EtlError::query)? {
            let record = (0..width)
                .map(|i| Value::from_sql_ref(row.get_ref(i).map_err(EtlError::query)?))
                .collect::<Result<Vec<_>>>()?;
            dataset.push(record.into_iter().collect())?;
        }

        Ok(dataset)
    }

    /// Run several statements in order, stopping at the first failure
    pub fn run_all<'a>(&self, queries: impl IntoIterator<Item = &'a str>) -> Result<Vec<Dataset>> {
        queries.into_iter().map(|sql| self.run(sql)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etl::Loader;
    use crate::storage::{SqliteLoader, WriteMode};
    use tempfile::TempDir;

    fn seeded(temp: &TempDir) -> SqliteStore {
        let store = SqliteStore::new(temp.path().join("STAFF.db"));
        let ds = Dataset::from_rows(
            Schema::new(["ID", "FNAME", "CITY"]),
            vec![
                vec![1.into(), "Rav".into(), "Toronto".into()],
                vec![2.into(), "Raul".into(), "Chicago".into()],
                vec![3.into(), "Hima".into(), "Toronto".into()],
            ],
        )
        .unwrap();
        SqliteLoader::new(store.clone(), "INSTRUCTOR", WriteMode::Replace)
            .load(&ds)
            .unwrap();
        store
    }

    #[test]
    fn test_select_returns_dataset() {
        let temp = TempDir::new().unwrap();
        let runner = QueryRunner::new(seeded(&temp));

        let out = runner
            .run("SELECT FNAME FROM INSTRUCTOR WHERE CITY = 'Toronto' ORDER BY ID")
            .unwrap();
        assert_eq!(out.schema().fields(), ["FNAME"]);
        assert_eq!(out.column("FNAME").unwrap(), vec![&Value::from("Rav"), &Value::from("Hima")]);

        let count = runner.run("SELECT COUNT(*) FROM INSTRUCTOR").unwrap();
        assert_eq!(count.get(0, "COUNT(*)"), Some(&Value::Integer(3)));
    }

    #[test]
    fn test_null_maps_to_null() {
        let temp = TempDir::new().unwrap();
        let runner = QueryRunner::new(seeded(&temp));
        let out = runner.run("SELECT NULL AS nothing").unwrap();
        assert!(out.get(0, "nothing").unwrap().is_null());
    }

    #[test]
    fn test_write_statements_rejected() {
        let temp = TempDir::new().unwrap();
        let store = seeded(&temp);
        let runner = QueryRunner::new(store.clone());

        let err = runner.run("DELETE FROM INSTRUCTOR").unwrap_err();
        assert!(matches!(err, EtlError::Query(_)));
        assert_eq!(store.row_count("INSTRUCTOR").unwrap(), 3);
    }

    #[test]
    fn test_malformed_query_carries_engine_message() {
        let temp = TempDir::new().unwrap();
        let runner = QueryRunner::new(seeded(&temp));
        match runner.run("SELEC * FROM INSTRUCTOR") {
            Err(EtlError::Query(message)) => assert!(message.contains("syntax error"), "got: {message}"),
            other => panic!("expected query error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_database() {
        let temp = TempDir::new().unwrap();
        let runner = QueryRunner::open(temp.path().join("absent.db"));
        assert!(matches!(runner.run("SELECT 1"), Err(EtlError::Query(_))));
        assert!(!temp.path().join("absent.db").exists());
    }

    #[test]
    fn test_spec_label_defaults_to_sql() {
        let spec = QuerySpec::new("a.db", "SELECT 1");
        assert_eq!(spec.label(), "SELECT 1");
    }
}
