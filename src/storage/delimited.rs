//! CSV reading and writing

use super::{SourceReader, encoding, write_atomically};
use crate::error::{EtlError, Result};
use crate::etl::Loader;
use crate::table::{Dataset, Record, Schema, Value};
use std::path::{Path, PathBuf};

/// Read a delimited file into a dataset
///
/// Values are assigned to schema fields by position. Whether the first line
/// is a header is fixed by the caller; when it is, it must match the schema.
pub struct CsvReader {
    path: PathBuf,
    has_headers: bool,
    delimiter: u8,
}

impl CsvReader {
    /// Reader for a comma-separated file with a header row
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            has_headers: true,
            delimiter: b',',
        }
    }

    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn format_error(&self, message: impl Into<String>) -> EtlError {
        EtlError::format(&self.path, message)
    }
}

impl SourceReader for CsvReader {
    fn locator(&self) -> &Path {
        &self.path
    }

    fn read(&self, schema: &Schema) -> Result<Dataset> {
        let text = encoding::read_text(&self.path)?;
        let mut dataset = Dataset::new(schema.clone());
        if text.trim().is_empty() {
            log::debug!("{} is empty", self.path.display());
            return Ok(dataset);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(self.has_headers)
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(text.as_bytes());

        if self.has_headers {
            let headers: Vec<String> = reader
                .headers()
                .map_err(|e| self.format_error(e.to_string()))?
                .iter()
                .map(|h| h.trim().to_string())
                .collect();
            if headers.as_slice() != schema.fields() {
                return Err(EtlError::schema(format!(
                    "{} has header [{}] but the schema is {}",
                    self.path.display(),
                    headers.join(", "),
                    schema
                )));
            }
        }

        for (index, row) in reader.records().enumerate() {
            let row = row.map_err(|e| self.format_error(e.to_string()))?;
            if row.len() != schema.len() {
                let line = row
                    .position()
                    .map(|p| p.line())
                    .unwrap_or(index as u64 + 1);
                return Err(self.format_error(format!(
                    "line {}: expected {} fields, found {}",
                    line,
                    schema.len(),
                    row.len()
                )));
            }
            dataset.push(row.iter().map(Value::infer).collect::<Record>())?;
        }

        log::debug!("Read {} rows from {}", dataset.len(), self.path.display());
        Ok(dataset)
    }
}

/// Write a dataset as CSV with a header row
pub struct CsvWriter {
    path: PathBuf,
}

impl CsvWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Serialize the whole dataset in memory
    pub fn to_bytes(dataset: &Dataset) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(dataset.schema().fields())
            .map_err(std::io::Error::from)?;
        for record in dataset.records() {
            writer
                .write_record(record.values().iter().map(Value::to_field_string))
                .map_err(std::io::Error::from)?;
        }
        writer.into_inner().map_err(|e| e.into_error().into())
    }

    /// Replace the file with the dataset contents
    pub fn write(&self, dataset: &Dataset) -> Result<()> {
        let bytes = Self::to_bytes(dataset)?;
        write_atomically(&self.path, &bytes)
    }
}

impl Loader for CsvWriter {
    fn destination(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self, dataset: &Dataset) -> Result<usize> {
        dataset.schema().ensure_unique()?;
        self.write(dataset)?;
        Ok(dataset.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn schema() -> Schema {
        Schema::new(["name", "height", "weight"])
    }

    #[test]
    fn test_read_with_header() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("source1.csv");
        std::fs::write(&path, "name,height,weight\nalex,65.78,112.99\najay,71,136.49\n").unwrap();

        let ds = CsvReader::new(&path).read(&schema()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(0, "height"), Some(&Value::Float(65.78)));
        assert_eq!(ds.get(1, "height"), Some(&Value::Integer(71)));
    }

    #[test]
    fn test_read_headerless() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("INSTRUCTOR.csv");
        std::fs::write(&path, "1,Rav,Ahuja,TORONTO,CA\n2,Raul,Chong,Markham,CA\n").unwrap();

        let schema = Schema::new(["ID", "FNAME", "LNAME", "CITY", "CCODE"]);
        let ds = CsvReader::new(&path)
            .with_headers(false)
            .read(&schema)
            .unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(1, "FNAME"), Some(&Value::Text("Raul".to_string())));
    }

    #[test]
    fn test_ragged_row_is_format_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.csv");
        std::fs::write(&path, "name,height,weight\nalex,65.78\n").unwrap();

        let err = CsvReader::new(&path).read(&schema()).unwrap_err();
        match err {
            EtlError::Format { message, .. } => assert!(message.contains("line 2"), "{message}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_header_mismatch_is_schema_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("other.csv");
        std::fs::write(&path, "name,weight,height\nalex,1,2\n").unwrap();

        let err = CsvReader::new(&path).read(&schema()).unwrap_err();
        assert!(matches!(err, EtlError::Schema(_)));
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.csv");
        let ds = Dataset::from_rows(
            schema(),
            vec![vec!["alex".into(), 1.67.into(), 51.25.into()]],
        )
        .unwrap();

        assert_eq!(CsvWriter::new(&path).load(&ds).unwrap(), 1);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("name,height,weight\n"));

        let back = CsvReader::new(&path).read(&schema()).unwrap();
        assert_eq!(back, ds);
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.csv");
        std::fs::write(&path, "stale contents that are much longer than the new file\n").unwrap();

        let ds = Dataset::new(Schema::new(["a"]));
        CsvWriter::new(&path).write(&ds).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\n");
    }
}
