//! Integration tests for SQLite sinks and read-only queries

use eyre::Result;
use tabular_etl::EtlError;
use tabular_etl::audit::AuditLog;
use tabular_etl::etl::{Extractor, Loader, Pipeline, TransformChain};
use tabular_etl::query::{QueryRunner, QuerySpec};
use tabular_etl::storage::{SinkTarget, SqliteLoader, SqliteStore, WriteMode};
use tabular_etl::table::{Dataset, Schema, Value};
use tempfile::TempDir;

fn instructors(ids: std::ops::Range<i64>) -> Dataset {
    let rows = ids
        .map(|id| {
            vec![
                Value::Integer(id),
                Value::from(format!("first{}", id)),
                Value::from(format!("last{}", id)),
                Value::from("Toronto"),
                Value::from("CA"),
            ]
        })
        .collect();
    Dataset::from_rows(Schema::new(["ID", "FNAME", "LNAME", "CITY", "CCODE"]), rows).unwrap()
}

/// Hands a fixed dataset to the pipeline
struct StaticExtractor(Dataset);

impl Extractor for StaticExtractor {
    fn describe(&self) -> String {
        "static rows".to_string()
    }

    async fn extract(&self) -> tabular_etl::Result<Dataset> {
        Ok(self.0.clone())
    }
}

#[test]
fn test_replace_drops_previous_rows() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SqliteStore::new(temp_dir.path().join("STAFF.db"));
    let loader = SqliteLoader::new(store.clone(), "INSTRUCTOR", WriteMode::Replace);

    loader.load(&instructors(1..6))?;
    assert_eq!(store.row_count("INSTRUCTOR")?, 5);

    loader.load(&instructors(10..13))?;
    assert_eq!(store.row_count("INSTRUCTOR")?, 3);
    Ok(())
}

#[test]
fn test_append_adds_rows() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SqliteStore::new(temp_dir.path().join("STAFF.db"));

    SqliteLoader::new(store.clone(), "INSTRUCTOR", WriteMode::Replace).load(&instructors(1..4))?;
    SqliteLoader::new(store.clone(), "INSTRUCTOR", WriteMode::Append).load(&instructors(4..6))?;

    assert_eq!(store.row_count("INSTRUCTOR")?, 5);
    Ok(())
}

#[test]
fn test_append_with_missing_column_leaves_table_unchanged() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SqliteStore::new(temp_dir.path().join("STAFF.db"));
    SqliteLoader::new(store.clone(), "INSTRUCTOR", WriteMode::Replace).load(&instructors(1..4))?;

    let narrow = Dataset::from_rows(
        Schema::new(["ID", "FNAME", "LNAME", "CITY"]),
        vec![vec![9.into(), "a".into(), "b".into(), "Chicago".into()]],
    )?;
    let err = SqliteLoader::new(store.clone(), "INSTRUCTOR", WriteMode::Append)
        .load(&narrow)
        .unwrap_err();

    assert!(matches!(err, EtlError::Schema(_)));
    assert_eq!(store.row_count("INSTRUCTOR")?, 3);
    Ok(())
}

#[tokio::test]
async fn test_pipeline_queries_after_load() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db = temp_dir.path().join("STAFF.db");
    let log_file = temp_dir.path().join("code_log.txt");
    let saved = temp_dir.path().join("toronto.csv");

    let pipeline = Pipeline::new(
        StaticExtractor(instructors(1..4)),
        TransformChain::new(),
        AuditLog::new(&log_file),
    )
    .with_loader(SqliteLoader::new(SqliteStore::new(&db), "INSTRUCTOR", WriteMode::Replace))
    .with_query(
        QuerySpec::new(&db, "SELECT FNAME FROM INSTRUCTOR WHERE CITY = 'Toronto' ORDER BY ID")
            .with_output(SinkTarget::Csv { path: saved.clone() }),
    )
    .with_query(QuerySpec::new(&db, "SELECT * FROM NOPE"));

    let summary = pipeline.run().await?;
    assert_eq!(summary.queries.len(), 2);

    let names = summary.queries[0].result.as_ref().unwrap();
    assert_eq!(names.len(), 3);
    assert_eq!(
        std::fs::read_to_string(&saved)?,
        "FNAME\nfirst1\nfirst2\nfirst3\n"
    );

    assert!(matches!(summary.queries[1].result, Err(EtlError::Query(_))));

    let messages: Vec<String> = AuditLog::new(&log_file)
        .entries()?
        .into_iter()
        .map(|e| e.message)
        .collect();
    assert_eq!(
        messages.iter().filter(|m| m.starts_with("Query failed")).count(),
        1
    );
    let save_started = messages
        .iter()
        .position(|m| *m == format!("Query results save Started: {}", saved.display()))
        .expect("query save has a start entry");
    let save_ended = messages
        .iter()
        .position(|m| m.starts_with("Query results saved: 3 rows"))
        .expect("query save has an end entry");
    assert!(save_started < save_ended);
    assert_eq!(messages.last().map(String::as_str), Some("ETL Job Ended"));
    Ok(())
}

#[test]
fn test_query_runner_is_read_only() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SqliteStore::new(temp_dir.path().join("STAFF.db"));
    SqliteLoader::new(store.clone(), "INSTRUCTOR", WriteMode::Replace).load(&instructors(1..4))?;

    let runner = QueryRunner::new(store.clone());
    assert!(matches!(
        runner.run("DROP TABLE INSTRUCTOR"),
        Err(EtlError::Query(_))
    ));
    assert!(matches!(
        runner.run("INSERT INTO INSTRUCTOR VALUES (9, 'a', 'b', 'c', 'd')"),
        Err(EtlError::Query(_))
    ));
    assert_eq!(store.row_count("INSTRUCTOR")?, 3);

    let results = runner.run_all([
        "SELECT COUNT(*) AS n FROM INSTRUCTOR",
        "SELECT AVG(ID) AS avg_id FROM INSTRUCTOR",
    ])?;
    assert_eq!(results[0].get(0, "n"), Some(&Value::Integer(3)));
    assert_eq!(results[1].get(0, "avg_id"), Some(&Value::Float(2.0)));
    Ok(())
}
