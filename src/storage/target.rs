//! Declarative sink destinations

use super::{CsvWriter, JsonArrayWriter, NdjsonWriter, SqliteLoader, SqliteStore, WriteMode};
use crate::etl::Loader;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where a dataset is written
///
/// ```yaml
/// - kind: csv
///   path: transformed_data.csv
/// - kind: sqlite
///   database: Banks.db
///   table: Largest_banks
///   mode: replace
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkTarget {
    Csv {
        path: PathBuf,
    },
    Ndjson {
        path: PathBuf,
    },
    Json {
        path: PathBuf,
    },
    Sqlite {
        database: PathBuf,
        table: String,
        #[serde(default)]
        mode: WriteMode,
    },
}

impl SinkTarget {
    /// Build the loader for this destination
    pub fn loader(&self) -> Box<dyn Loader> {
        match self {
            SinkTarget::Csv { path } => Box::new(CsvWriter::new(path)),
            SinkTarget::Ndjson { path } => Box::new(NdjsonWriter::new(path)),
            SinkTarget::Json { path } => Box::new(JsonArrayWriter::new(path)),
            SinkTarget::Sqlite {
                database,
                table,
                mode,
            } => Box::new(SqliteLoader::new(
                SqliteStore::new(database),
                table.clone(),
                *mode,
            )),
        }
    }

    /// Output file path for flat-file targets
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            SinkTarget::Csv { path } | SinkTarget::Ndjson { path } | SinkTarget::Json { path } => {
                Some(path)
            }
            SinkTarget::Sqlite { .. } => None,
        }
    }
}
