//! Extract and merge local files matched by glob patterns

use crate::error::{EtlError, Result};
use crate::etl::Extractor;
use crate::storage::SourceFormat;
use crate::table::{Dataset, Schema};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One optional glob pattern per input format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilePatterns {
    #[serde(default)]
    pub csv: Option<String>,
    #[serde(default)]
    pub ndjson: Option<String>,
    #[serde(default)]
    pub xml: Option<String>,
}

impl FilePatterns {
    /// `*.csv`, `*.json` and `*.xml` inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let pattern = |ext: &str| Some(dir.as_ref().join(ext).to_string_lossy().into_owned());
        Self {
            csv: pattern("*.csv"),
            ndjson: pattern("*.json"),
            xml: pattern("*.xml"),
        }
    }

    /// Declared patterns in merge order: delimited, line-delimited, markup
    pub fn entries(&self) -> impl Iterator<Item = (SourceFormat, &str)> {
        [
            (SourceFormat::Csv, self.csv.as_deref()),
            (SourceFormat::Ndjson, self.ndjson.as_deref()),
            (SourceFormat::Xml, self.xml.as_deref()),
        ]
        .into_iter()
        .filter_map(|(format, pattern)| pattern.map(|p| (format, p)))
    }
}

/// Extractor over every file matched by a set of patterns
///
/// # Example
/// ```no_run
/// use tabular_etl::etl::Extractor;
/// use tabular_etl::sources::FileGlobExtractor;
/// use tabular_etl::table::Schema;
///
/// # async fn example() -> tabular_etl::Result<()> {
/// let extractor = FileGlobExtractor::in_dir("source", Schema::new(["name", "height", "weight"]));
/// let dataset = extractor.extract().await?;
/// println!("{}", dataset.preview(5));
/// # Ok(())
/// # }
/// ```
pub struct FileGlobExtractor {
    schema: Schema,
    patterns: FilePatterns,
    csv_has_headers: bool,
    excluded: Vec<PathBuf>,
}

impl FileGlobExtractor {
    pub fn new(schema: Schema, patterns: FilePatterns) -> Self {
        Self {
            schema,
            patterns,
            csv_has_headers: true,
            excluded: Vec::new(),
        }
    }

    pub fn in_dir(dir: impl AsRef<Path>, schema: Schema) -> Self {
        Self::new(schema, FilePatterns::in_dir(dir))
    }

    pub fn with_csv_headers(mut self, has_headers: bool) -> Self {
        self.csv_has_headers = has_headers;
        self
    }

    /// Never read these paths, even when a pattern matches them
    pub fn excluding<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.excluded
            .extend(paths.into_iter().map(|p| p.as_ref().to_path_buf()));
        self
    }

    /// Every matched file with its format, in read order
    pub fn discover(&self) -> Result<Vec<(SourceFormat, PathBuf)>> {
        let mut sources = Vec::new();
        for (format, pattern) in self.patterns.entries() {
            let paths = glob::glob(pattern).map_err(|e| {
                EtlError::extraction(format!("invalid pattern '{}': {}", pattern, e))
            })?;
            for entry in paths {
                let path = entry.map_err(|e| EtlError::extraction(e.to_string()))?;
                if !path.is_file() {
                    continue;
                }
                if self.is_excluded(&path) {
                    log::debug!("Skipping excluded file {}", path.display());
                    continue;
                }
                sources.push((format, path));
            }
        }
        Ok(sources)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.excluded.iter().any(|excluded| {
            excluded == path
                || matches!(
                    (excluded.canonicalize(), path.canonicalize()),
                    (Ok(a), Ok(b)) if a == b
                )
        })
    }
}

/// Read `sources` in order and concatenate them into one dataset
///
/// # Errors
/// The first reader error, or `Schema` when a part does not share `schema`
pub fn read_sources(
    sources: &[(SourceFormat, PathBuf)],
    schema: &Schema,
    csv_has_headers: bool,
) -> Result<Dataset> {
    let mut merged = Dataset::new(schema.clone());
    for (format, path) in sources {
        let part = format.reader(path, csv_has_headers).read(schema)?;
        log::debug!("{}: {} rows", path.display(), part.len());
        merged.append(part)?;
    }
    Ok(merged)
}

impl Extractor for FileGlobExtractor {
    fn describe(&self) -> String {
        let patterns: Vec<&str> = self.patterns.entries().map(|(_, p)| p).collect();
        format!("files matching {}", patterns.join(", "))
    }

    async fn extract(&self) -> Result<Dataset> {
        let sources = self.discover()?;
        if sources.is_empty() {
            log::warn!("No input files matched {}", self.describe());
        }
        let dataset = read_sources(&sources, &self.schema, self.csv_has_headers)?;
        log::info!(
            "Extracted {} row(s) from {} file(s)",
            dataset.len(),
            sources.len()
        );
        Ok(dataset)
    }
}
