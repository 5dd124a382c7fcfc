//! File system and database storage
//!
//! This module handles all persistent I/O:
//! - Source readers for CSV, NDJSON and XML files
//! - Flat-file sinks (CSV, NDJSON, JSON array)
//! - `SQLite` tables

mod delimited;
pub mod encoding;
mod json_array;
mod markup;
mod ndjson;
mod sqlite;
mod target;

pub use delimited::{CsvReader, CsvWriter};
pub use json_array::JsonArrayWriter;
pub use markup::XmlReader;
pub use ndjson::{NdjsonReader, NdjsonWriter};
pub use sqlite::{SqliteLoader, SqliteStore, WriteMode};
pub use target::SinkTarget;

use crate::error::Result;
use crate::table::{Dataset, Schema};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Read one physical file into a dataset with a declared schema
///
/// Readers have no side effects beyond reading and never write to the
/// audit log.
pub trait SourceReader {
    /// The file this reader reads
    fn locator(&self) -> &Path;

    /// Read every record
    ///
    /// # Errors
    /// Format errors for rows that do not fit the schema, I/O errors otherwise
    fn read(&self, schema: &Schema) -> Result<Dataset>;
}

/// Supported input formats, in merge precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Csv,
    Ndjson,
    Xml,
}

impl SourceFormat {
    /// Reader for `path` in this format
    pub fn reader(self, path: &Path, csv_has_headers: bool) -> Box<dyn SourceReader> {
        match self {
            SourceFormat::Csv => Box::new(CsvReader::new(path).with_headers(csv_has_headers)),
            SourceFormat::Ndjson => Box::new(NdjsonReader::new(path)),
            SourceFormat::Xml => Box::new(XmlReader::new(path)),
        }
    }
}

/// Replace `path` with `bytes` in one step.
///
/// The content goes to a temporary file next to the target first and is
/// renamed over it, so readers never observe a half-written file.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_precedence() {
        let mut formats = vec![SourceFormat::Xml, SourceFormat::Csv, SourceFormat::Ndjson];
        formats.sort();
        assert_eq!(
            formats,
            vec![SourceFormat::Csv, SourceFormat::Ndjson, SourceFormat::Xml]
        );
    }

    #[test]
    fn test_write_atomically_creates_directories() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out/nested/data.csv");
        write_atomically(&path, b"a,b\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n");

        // no temp files left behind
        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
