//! Column-level schema steps

use crate::error::{EtlError, Result};
use crate::etl::Transformer;
use crate::table::{Dataset, Schema};
use std::collections::HashSet;

/// Make every column name unique.
///
/// The first occurrence keeps its name; each later duplicate gets its
/// 0-based column position appended (`IMF_3`), repeatedly if the new name is
/// also taken. Columns that were unique are never renamed.
///
/// ```
/// use tabular_etl::etl::Transformer;
/// use tabular_etl::table::{Dataset, Schema};
/// use tabular_etl::transform::UniqueColumns;
///
/// let ds = Dataset::new(Schema::new(["IMF", "IMF", "World Bank"]));
/// let out = UniqueColumns.transform(ds).unwrap();
/// assert_eq!(out.schema().fields(), ["IMF", "IMF_1", "World Bank"]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct UniqueColumns;

impl UniqueColumns {
    pub fn unique_schema(schema: &Schema) -> Schema {
        // Original names are reserved up front so a renamed duplicate never
        // collides with a later column that was already unique.
        let mut taken: HashSet<String> = schema.fields().iter().cloned().collect();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut fields = Vec::with_capacity(schema.len());
        for (index, name) in schema.fields().iter().enumerate() {
            if seen.insert(name.as_str()) {
                fields.push(name.clone());
                continue;
            }
            let mut candidate = format!("{}_{}", name, index);
            while taken.contains(&candidate) {
                candidate = format!("{}_{}", candidate, index);
            }
            taken.insert(candidate.clone());
            fields.push(candidate);
        }
        Schema::new(fields)
    }
}

impl Transformer for UniqueColumns {
    fn name(&self) -> &str {
        "unique_columns"
    }

    fn transform(&self, input: Dataset) -> Result<Dataset> {
        let duplicates = input.schema().duplicates().len();
        if duplicates == 0 {
            return Ok(input);
        }

        let schema = Self::unique_schema(input.schema());
        log::debug!("Renamed {} duplicate column(s): {}", duplicates, schema);
        let (_, records) = input.into_parts();
        let mut output = Dataset::new(schema);
        for record in records {
            output.push(record)?;
        }
        Ok(output)
    }
}

/// Rename columns by name
#[derive(Debug, Clone, Default)]
pub struct RenameColumns {
    renames: Vec<(String, String)>,
}

impl RenameColumns {
    pub fn new<I, A, B>(renames: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        Self {
            renames: renames
                .into_iter()
                .map(|(from, to)| (from.into(), to.into()))
                .collect(),
        }
    }
}

impl Transformer for RenameColumns {
    fn name(&self) -> &str {
        "rename"
    }

    fn transform(&self, input: Dataset) -> Result<Dataset> {
        let mut schema = input.schema().clone();
        for (from, to) in &self.renames {
            let index = schema.position(from).ok_or_else(|| {
                EtlError::schema(format!("cannot rename '{}': no such column in {}", from, schema))
            })?;
            schema = schema.with_renamed(index, to);
        }

        let (_, records) = input.into_parts();
        let mut output = Dataset::new(schema);
        for record in records {
            output.push(record)?;
        }
        Ok(output)
    }
}
