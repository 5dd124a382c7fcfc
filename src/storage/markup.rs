//! XML reading
//!
//! The expected shape is a root element whose children are records, each
//! holding one child element per field:
//!
//! ```xml
//! <data>
//!   <person><name>alex</name><height>65.78</height><weight>112.99</weight></person>
//! </data>
//! ```

use super::{SourceReader, encoding};
use crate::error::{EtlError, Result};
use crate::table::{Dataset, Record, Schema, Value};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::path::{Path, PathBuf};

const RECORD_DEPTH: usize = 2;
const FIELD_DEPTH: usize = 3;

/// Read sibling record elements from an XML file
pub struct XmlReader {
    path: PathBuf,
}

impl XmlReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn format_error(&self, message: impl Into<String>) -> EtlError {
        EtlError::format(&self.path, message)
    }

    /// Build one record from the collected `(child name, text)` pairs
    fn finish_record(
        &self,
        schema: &Schema,
        index: usize,
        children: &[(String, String)],
    ) -> Result<Record> {
        schema
            .fields()
            .iter()
            .map(|field| {
                children
                    .iter()
                    .find(|(name, _)| name == field)
                    .map(|(_, text)| Value::infer_float(text))
                    .ok_or_else(|| {
                        self.format_error(format!(
                            "record {}: missing child element <{}>",
                            index, field
                        ))
                    })
            })
            .collect()
    }
}

impl SourceReader for XmlReader {
    fn locator(&self) -> &Path {
        &self.path
    }

    fn read(&self, schema: &Schema) -> Result<Dataset> {
        let text = encoding::read_text(&self.path)?;
        let mut reader = Reader::from_str(&text);
        reader.config_mut().trim_text(true);

        let mut dataset = Dataset::new(schema.clone());
        let mut depth = 0usize;
        let mut children: Vec<(String, String)> = Vec::new();
        let mut field: Option<String> = None;
        let mut buffer = String::new();

        loop {
            let event = reader
                .read_event()
                .map_err(|e| self.format_error(e.to_string()))?;
            match event {
                Event::Start(e) => {
                    depth += 1;
                    if depth == RECORD_DEPTH {
                        children.clear();
                    } else if depth == FIELD_DEPTH {
                        field = Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                        buffer.clear();
                    }
                }
                Event::Empty(e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    if depth + 1 == RECORD_DEPTH {
                        let record = self.finish_record(schema, dataset.len(), &[])?;
                        dataset.push(record)?;
                    } else if depth + 1 == FIELD_DEPTH {
                        children.push((name, String::new()));
                    }
                }
                Event::Text(t) if depth == FIELD_DEPTH => {
                    let unescaped = t
                        .unescape()
                        .map_err(|e| self.format_error(e.to_string()))?;
                    buffer.push_str(&unescaped);
                }
                Event::CData(c) if depth == FIELD_DEPTH => {
                    buffer.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
                Event::End(_) => {
                    if depth == FIELD_DEPTH {
                        if let Some(name) = field.take() {
                            children.push((name, buffer.trim().to_string()));
                        }
                    } else if depth == RECORD_DEPTH {
                        let record = self.finish_record(schema, dataset.len(), &children)?;
                        dataset.push(record)?;
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        log::debug!("Read {} rows from {}", dataset.len(), self.path.display());
        Ok(dataset)
    }
}
