//! NDJSON (Newline Delimited JSON) file operations

use super::{SourceReader, encoding, write_atomically};
use crate::error::{EtlError, Result};
use crate::etl::Loader;
use crate::table::{Dataset, Schema, Value};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

/// Read NDJSON from a file
pub struct NdjsonReader {
    path: PathBuf,
}

impl NdjsonReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read all non-blank lines as JSON values
    ///
    /// One undecodable line fails the whole read.
    pub fn read_values(&self) -> Result<Vec<(usize, JsonValue)>> {
        let content = encoding::read_text(&self.path)?;

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line)
                    .map(|value| (index + 1, value))
                    .map_err(|e| EtlError::format(&self.path, format!("line {}: {}", index + 1, e)))
            })
            .collect()
    }
}

impl SourceReader for NdjsonReader {
    fn locator(&self) -> &Path {
        &self.path
    }

    fn read(&self, schema: &Schema) -> Result<Dataset> {
        let mut dataset = Dataset::new(schema.clone());

        for (line, value) in self.read_values()? {
            let object = value.as_object().ok_or_else(|| {
                EtlError::format(&self.path, format!("line {}: expected a JSON object", line))
            })?;

            let record = schema
                .fields()
                .iter()
                .map(|field| {
                    object.get(field).and_then(Value::from_json).ok_or_else(|| {
                        EtlError::format(
                            &self.path,
                            format!("line {}: missing or non-scalar field '{}'", line, field),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            dataset.push(record.into_iter().collect())?;
        }

        log::debug!("Read {} rows from {}", dataset.len(), self.path.display());
        Ok(dataset)
    }
}

/// Write NDJSON to a file
pub struct NdjsonWriter {
    path: PathBuf,
}

impl NdjsonWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Serialize one JSON object per line, in schema field order
    pub fn to_ndjson(dataset: &Dataset) -> Result<String> {
        let ndjson = dataset
            .to_json_records()
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(std::io::Error::from)?
            .join("\n");

        // Add trailing newline
        Ok(if ndjson.is_empty() {
            String::new()
        } else {
            format!("{}\n", ndjson)
        })
    }

    /// Replace the file with the dataset contents
    pub fn write(&self, dataset: &Dataset) -> Result<()> {
        let content = Self::to_ndjson(dataset)?;
        write_atomically(&self.path, content.as_bytes())
    }
}

impl Loader for NdjsonWriter {
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
    fn test_read_write() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("people.json");
        let data = Dataset::from_rows(
            schema(),
            vec![
                vec!["alex".into(), 65.78.into(), 112.99.into()],
                vec!["ajay".into(), 71.into(), 136.49.into()],
            ],
        )
        .unwrap();

        NdjsonWriter::new(&path).write(&data).unwrap();
        let read_data = NdjsonReader::new(&path).read(&schema()).unwrap();

        assert_eq!(data, read_data);
    }

    #[test]
    fn test_extra_keys_ignored_and_blank_lines_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("source.json");
        std::fs::write(
            &path,
            "{\"name\":\"jack\",\"height\":68.7,\"weight\":123.3,\"id\":9}\n\n",
        )
        .unwrap();

        let ds = NdjsonReader::new(&path).read(&schema()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.get(0, "weight"), Some(&Value::Float(123.3)));
    }

    #[test]
    fn test_bad_line_fails_whole_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("source.json");
        std::fs::write(
            &path,
            "{\"name\":\"jack\",\"height\":68.7,\"weight\":123.3}\n{\"name\": oops}\n",
        )
        .unwrap();

        let err = NdjsonReader::new(&path).read(&schema()).unwrap_err();
        match err {
            EtlError::Format { message, .. } => assert!(message.starts_with("line 2")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_field_is_format_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("source.json");
        std::fs::write(&path, "{\"name\":\"jack\",\"height\":68.7}\n").unwrap();

        let err = NdjsonReader::new(&path).read(&schema()).unwrap_err();
        assert!(err.to_string().contains("'weight'"));
    }
}
