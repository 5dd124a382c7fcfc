//! Tabular ETL
//!
//! One parameterized Extract-Transform-Load pipeline for small tabular
//! datasets: local CSV/NDJSON/XML files or a scraped HTML table in, CSV,
//! NDJSON, JSON or SQLite out, with a timestamped audit log.

pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod etl;
pub mod query;
pub mod sources;
pub mod storage;
pub mod table;
pub mod transform;

// Re-exports for convenience
pub use audit::{AuditLog, LogEntry};
pub use config::PipelineConfig;
pub use error::{EtlError, Result};
pub use etl::{Extractor, Loader, Pipeline, RunSummary, TransformChain, Transformer};
pub use query::{QueryRunner, QuerySpec};
pub use sources::{FileGlobExtractor, WebTableExtractor};
pub use storage::{SinkTarget, SqliteStore, WriteMode};
pub use table::{Dataset, Record, Schema, Value};
