//! Pretty-printed JSON array output

use super::write_atomically;
use crate::error::Result;
use crate::etl::Loader;
use crate::table::Dataset;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::path::{Path, PathBuf};

const INDENT: &[u8] = b"    ";

/// Write a dataset as one JSON array of record objects
pub struct JsonArrayWriter {
    path: PathBuf,
}

impl JsonArrayWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Serialize with four-space indentation, fields in schema order
    pub fn to_bytes(dataset: &Dataset) -> Result<Vec<u8>> {
        let records = dataset.to_json_records();
        let mut out = Vec::new();
        let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(INDENT));
        records
            .serialize(&mut serializer)
            .map_err(std::io::Error::from)?;
        out.push(b'\n');
        Ok(out)
    }

    pub fn write(&self, dataset: &Dataset) -> Result<()> {
        let bytes = Self::to_bytes(dataset)?;
        write_atomically(&self.path, &bytes)
    }
}

impl Loader for JsonArrayWriter {
    fn destination(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self, dataset: &Dataset) -> Result<usize> {
        dataset.schema().ensure_unique()?;
        self.write(dataset)?;
        Ok(dataset.len())
    }
}
