//! Declarative pipeline configuration
//!
//! A pipeline is described by one YAML file:
//!
//! ```yaml
//! log_file: log_file.txt
//! source:
//!   kind: files
//!   schema: [name, height, weight]
//!   csv: "source/*.csv"
//!   ndjson: "source/*.json"
//!   xml: "source/*.xml"
//! transforms:
//!   - step: convert
//!     rules:
//!       - { field: height, kind: scale, factor: 0.0254, precision: 2 }
//!       - { field: weight, kind: scale, factor: 0.45359237, precision: 2 }
//! sinks:
//!   - kind: csv
//!     path: transformed_data.csv
//! ```
//!
//! Relative paths are resolved against the working directory.

use crate::audit::AuditLog;
use crate::error::{EtlError, Result};
use crate::etl::{Extractor, Loader, Pipeline, TransformChain};
use crate::query::QuerySpec;
use crate::sources::{FileGlobExtractor, FilePatterns, TableSpec, WebTableExtractor};
use crate::storage::SinkTarget;
use crate::table::{Dataset, Schema};
use crate::transform::{
    ExchangeRates, FieldRules, RateTarget, RenameColumns, TransformRule, UniqueColumns,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_LOG_FILE: &str = "etl_log.txt";

/// Environment variable that overrides `log_file`
pub const LOG_FILE_ENV: &str = "ETL_LOG_FILE";

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

fn default_true() -> bool {
    true
}

fn default_precision() -> u32 {
    2
}

/// Where the rows come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    Files {
        schema: Vec<String>,
        #[serde(default = "default_true")]
        csv_has_headers: bool,
        #[serde(default)]
        csv: Option<String>,
        #[serde(default)]
        ndjson: Option<String>,
        #[serde(default)]
        xml: Option<String>,
    },
    WebTable {
        url: Url,
        selector: String,
        #[serde(default)]
        numeric_columns: Vec<String>,
        #[serde(default)]
        columns: Option<Vec<String>>,
    },
}

/// One transformation step, applied in declared order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum TransformStep {
    Convert {
        rules: Vec<TransformRule>,
    },
    ExchangeRates {
        base: String,
        rates_file: PathBuf,
        targets: Vec<RateTarget>,
        #[serde(default = "default_precision")]
        precision: u32,
    },
    Rename {
        columns: BTreeMap<String, String>,
    },
    UniqueColumns,
}

/// The whole pipeline definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    pub source: SourceConfig,
    #[serde(default)]
    pub transforms: Vec<TransformStep>,
    #[serde(default)]
    pub sinks: Vec<SinkTarget>,
    #[serde(default)]
    pub queries: Vec<QuerySpec>,
}

impl PipelineConfig {
    /// Read, apply environment overrides and validate
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)
            .map_err(|e| EtlError::Config(format!("{}: {}", path.display(), e)))?;
        config.apply_env_overrides();
        config.validate()?;
        log::debug!("Loaded pipeline configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| EtlError::Config(e.to_string()))
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(log_file) = std::env::var(LOG_FILE_ENV)
            && !log_file.trim().is_empty()
        {
            log::debug!("{} overrides log file: {}", LOG_FILE_ENV, log_file);
            self.log_file = PathBuf::from(log_file);
        }
    }

    /// Check values serde cannot check
    pub fn validate(&self) -> Result<()> {
        match &self.source {
            SourceConfig::Files {
                schema,
                csv,
                ndjson,
                xml,
                ..
            } => {
                if schema.is_empty() {
                    return Err(EtlError::Config("files source needs a schema".into()));
                }
                Schema::new(schema.iter().cloned())
                    .ensure_unique()
                    .map_err(|e| EtlError::Config(e.to_string()))?;
                if csv.is_none() && ndjson.is_none() && xml.is_none() {
                    return Err(EtlError::Config(
                        "files source needs at least one of csv, ndjson or xml".into(),
                    ));
                }
            }
            SourceConfig::WebTable { url, selector, .. } => {
                check_scheme(url)?;
                if selector.trim().is_empty() {
                    return Err(EtlError::Config("web_table source needs a selector".into()));
                }
            }
        }

        for step in &self.transforms {
            if let TransformStep::ExchangeRates { targets, .. } = step
                && targets.is_empty()
            {
                return Err(EtlError::Config(
                    "exchange_rates step needs at least one target".into(),
                ));
            }
        }

        let outputs = self
            .sinks
            .iter()
            .chain(self.queries.iter().filter_map(|q| q.output.as_ref()));
        for target in outputs {
            if let SinkTarget::Sqlite { table, .. } = target
                && table.trim().is_empty()
            {
                return Err(EtlError::Config("sqlite sink needs a table name".into()));
            }
        }
        Ok(())
    }

    pub fn audit_log(&self) -> AuditLog {
        AuditLog::new(&self.log_file)
    }

    /// Files this pipeline writes; never read back as input
    pub fn output_files(&self) -> Vec<PathBuf> {
        self.sinks
            .iter()
            .chain(self.queries.iter().filter_map(|q| q.output.as_ref()))
            .filter_map(|t| t.file_path().map(Path::to_path_buf))
            .collect()
    }

    pub fn extractor(&self) -> Result<SourceExtractor> {
        Ok(match &self.source {
            SourceConfig::Files {
                schema,
                csv_has_headers,
                csv,
                ndjson,
                xml,
            } => {
                let patterns = FilePatterns {
                    csv: csv.clone(),
                    ndjson: ndjson.clone(),
                    xml: xml.clone(),
                };
                SourceExtractor::Files(
                    FileGlobExtractor::new(Schema::new(schema.iter().cloned()), patterns)
                        .with_csv_headers(*csv_has_headers)
                        .excluding(self.output_files()),
                )
            }
            SourceConfig::WebTable {
                url,
                selector,
                numeric_columns,
                columns,
            } => {
                let spec = TableSpec {
                    selector: selector.clone(),
                    numeric_columns: numeric_columns.clone(),
                    columns: columns.clone(),
                };
                check_scheme(url)?;
                SourceExtractor::WebTable(WebTableExtractor::new(url.clone(), spec))
            }
        })
    }

    pub fn transform_chain(&self) -> TransformChain {
        let mut chain = TransformChain::new();
        for step in &self.transforms {
            match step {
                TransformStep::Convert { rules } => {
                    chain.push(Box::new(FieldRules::new(rules.clone())));
                }
                TransformStep::ExchangeRates {
                    base,
                    rates_file,
                    targets,
                    precision,
                } => chain.push(Box::new(
                    ExchangeRates::new(base, rates_file)
                        .with_targets(targets.clone())
                        .with_precision(*precision),
                )),
                TransformStep::Rename { columns } => {
                    chain.push(Box::new(RenameColumns::new(columns.clone())));
                }
                TransformStep::UniqueColumns => chain.push(Box::new(UniqueColumns)),
            }
        }
        chain
    }

    pub fn loaders(&self) -> Vec<Box<dyn Loader>> {
        self.sinks.iter().map(SinkTarget::loader).collect()
    }

    /// Assemble the pipeline without running it
    pub fn build(&self) -> Result<Pipeline<SourceExtractor, TransformChain>> {
        self.validate()?;
        let mut pipeline = Pipeline::new(self.extractor()?, self.transform_chain(), self.audit_log());
        for loader in self.loaders() {
            pipeline.add_loader(loader);
        }
        for query in &self.queries {
            pipeline = pipeline.with_query(query.clone());
        }
        Ok(pipeline)
    }
}

fn check_scheme(url: &Url) -> Result<()> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(EtlError::Config(format!(
            "unsupported url scheme '{}' in {}",
            other, url
        ))),
    }
}

/// The extractor selected by a [`SourceConfig`]
pub enum SourceExtractor {
    Files(FileGlobExtractor),
    WebTable(WebTableExtractor),
}

impl Extractor for SourceExtractor {
    fn describe(&self) -> String {
        match self {
            SourceExtractor::Files(e) => e.describe(),
            SourceExtractor::WebTable(e) => e.describe(),
        }
    }

    async fn extract(&self) -> Result<Dataset> {
        match self {
            SourceExtractor::Files(e) => e.extract().await,
            SourceExtractor::WebTable(e) => e.extract().await,
        }
    }
}
