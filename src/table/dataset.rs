//! Schema, records and datasets

use super::Value;
use crate::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Ordered list of field names shared by every record of a dataset.
///
/// A schema is never edited in place; transformations build a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: Vec<String>,
}

impl Schema {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of the first field with this name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Position of `name`, or a schema error naming the missing field.
    pub fn require(&self, name: &str) -> Result<usize> {
        self.position(name).ok_or_else(|| {
            EtlError::schema(format!(
                "field '{}' not found in schema [{}]",
                name,
                self.fields.join(", ")
            ))
        })
    }

    /// Field names that occur more than once, in first-seen order.
    pub fn duplicates(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut dups = Vec::new();
        for field in &self.fields {
            if !seen.insert(field.as_str()) && !dups.contains(&field.as_str()) {
                dups.push(field.as_str());
            }
        }
        dups
    }

    /// Fail when two columns share a name; sinks cannot hold both.
    pub fn ensure_unique(&self) -> Result<()> {
        let dups = self.duplicates();
        if dups.is_empty() {
            Ok(())
        } else {
            Err(EtlError::schema(format!(
                "duplicate field names [{}]; apply the unique_columns step before loading",
                dups.join(", ")
            )))
        }
    }

    /// New schema with `name` appended.
    pub fn with_field(&self, name: impl Into<String>) -> Self {
        let mut fields = self.fields.clone();
        fields.push(name.into());
        Self { fields }
    }

    /// New schema with the field at `index` renamed.
    pub fn with_renamed(&self, index: usize, name: impl Into<String>) -> Self {
        let mut fields = self.fields.clone();
        fields[index] = name.into();
        Self { fields }
    }

    /// Same set of names, ignoring order.
    pub fn same_fields_as(&self, other: &[String]) -> bool {
        let mine: HashSet<&str> = self.fields.iter().map(String::as_str).collect();
        let theirs: HashSet<&str> = other.iter().map(String::as_str).collect();
        self.fields.len() == other.len() && mine == theirs
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.fields.join(", "))
    }
}

/// One row. Values are positional and line up with the dataset's schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Pair each value with its field name.
    pub fn to_json_map(&self, schema: &Schema) -> serde_json::Map<String, serde_json::Value> {
        schema
            .fields()
            .iter()
            .zip(&self.values)
            .map(|(name, value)| {
                let json = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
                (name.clone(), json)
            })
            .collect()
    }
}

impl FromIterator<Value> for Record {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Ordered rows sharing one schema.
///
/// Rows are only ever added; every row has exactly the schema's width.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    schema: Schema,
    records: Vec<Record>,
}

impl Dataset {
    /// Empty dataset with a fixed schema.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            records: Vec::new(),
        }
    }

    /// Build a dataset from positional rows, checking each row's width.
    pub fn from_rows(schema: Schema, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut dataset = Self::new(schema);
        for row in rows {
            dataset.push(Record::new(row))?;
        }
        Ok(dataset)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_parts(self) -> (Schema, Vec<Record>) {
        (self.schema, self.records)
    }

    /// Append one record; a width mismatch is a format error.
    pub fn push(&mut self, record: Record) -> Result<()> {
        if record.len() != self.schema.len() {
            return Err(EtlError::format(
                "dataset",
                format!(
                    "record {} has {} values but schema {} has {} fields",
                    self.records.len(),
                    record.len(),
                    self.schema,
                    self.schema.len()
                ),
            ));
        }
        self.records.push(record);
        Ok(())
    }

    /// Concatenate another dataset with an identical schema.
    pub fn append(&mut self, other: Dataset) -> Result<()> {
        if other.schema != self.schema {
            return Err(EtlError::schema(format!(
                "cannot merge {} into {}",
                other.schema, self.schema
            )));
        }
        self.records.extend(other.records);
        Ok(())
    }

    /// Value of `field` in row `row`.
    pub fn get(&self, row: usize, field: &str) -> Option<&Value> {
        let index = self.schema.position(field)?;
        self.records.get(row)?.get(index)
    }

    /// All values of one column, in row order.
    pub fn column(&self, field: &str) -> Option<Vec<&Value>> {
        let index = self.schema.position(field)?;
        Some(self.records.iter().filter_map(|r| r.get(index)).collect())
    }

    /// Records as JSON objects keyed by field name, in schema order.
    pub fn to_json_records(&self) -> Vec<serde_json::Value> {
        self.records
            .iter()
            .map(|r| serde_json::Value::Object(r.to_json_map(&self.schema)))
            .collect()
    }

    /// Plain-text table of the first `limit` rows for terminal output.
    pub fn preview(&self, limit: usize) -> String {
        let shown: Vec<Vec<String>> = self
            .records
            .iter()
            .take(limit)
            .map(|r| r.values().iter().map(|v| v.to_string()).collect())
            .collect();

        let mut widths: Vec<usize> = self.schema.fields().iter().map(|f| f.chars().count()).collect();
        for row in &shown {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = Vec::with_capacity(shown.len() + 2);
        out.push(pad_row(self.schema.fields().iter().map(String::as_str), &widths));
        for row in &shown {
            out.push(pad_row(row.iter().map(String::as_str), &widths));
        }
        if self.records.len() > limit {
            out.push(format!("... {} more row(s)", self.records.len() - limit));
        }
        out.join("\n")
    }
}

fn pad_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Dataset {
        Dataset::from_rows(
            Schema::new(["name", "height", "weight"]),
            vec![
                vec!["alex".into(), 65.78.into(), 112.99.into()],
                vec!["ajay".into(), 71.52.into(), 136.49.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_push_rejects_short_record() {
        let mut ds = Dataset::new(Schema::new(["name", "height"]));
        let err = ds.push(Record::new(vec!["solo".into()])).unwrap_err();
        assert!(matches!(err, EtlError::Format { .. }));
        assert!(ds.is_empty());
    }

    #[test]
    fn test_append_requires_same_schema() {
        let mut ds = people();
        let other = Dataset::new(Schema::new(["name", "weight", "height"]));
        assert!(matches!(ds.append(other), Err(EtlError::Schema(_))));

        ds.append(people()).unwrap();
        assert_eq!(ds.len(), 4);
    }

    #[test]
    fn test_get_and_column() {
        let ds = people();
        assert_eq!(ds.get(1, "name"), Some(&Value::Text("ajay".to_string())));
        assert_eq!(ds.column("height").unwrap().len(), 2);
        assert!(ds.get(0, "age").is_none());
    }

    #[test]
    fn test_duplicates() {
        let schema = Schema::new(["IMF", "IMF", "UN", "IMF", "UN"]);
        assert_eq!(schema.duplicates(), vec!["IMF", "UN"]);
        assert!(matches!(schema.ensure_unique(), Err(EtlError::Schema(_))));
        assert!(Schema::new(["a", "b"]).ensure_unique().is_ok());
    }

    #[test]
    fn test_same_fields_ignores_order() {
        let schema = Schema::new(["ID", "FNAME"]);
        assert!(schema.same_fields_as(&["FNAME".to_string(), "ID".to_string()]));
        assert!(!schema.same_fields_as(&["ID".to_string()]));
    }

    #[test]
    fn test_json_records_keep_schema_order() {
        let json = serde_json::to_string(&people().to_json_records()[0]).unwrap();
        assert_eq!(json, r#"{"name":"alex","height":65.78,"weight":112.99}"#);
    }

    #[test]
    fn test_preview() {
        let text = people().preview(1);
        assert!(text.starts_with("name"));
        assert!(text.contains("alex"));
        assert!(!text.contains("ajay"));
        assert!(text.ends_with("... 1 more row(s)"));
    }
}
