//! Error types shared by every pipeline stage
//!
//! Each variant maps to one failure class of the pipeline. Stages never
//! retry or downgrade an error; they return it and the pipeline harness
//! records it in the audit log before it reaches the caller.

use std::path::Path;

/// Errors produced while extracting, transforming, loading or querying.
#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    /// Resource unreachable or expected structure absent.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Row or field shape violates the declared schema.
    #[error("format error in {source_name}: {message}")]
    Format {
        source_name: String,
        message: String,
    },

    /// Schema mismatch between merge inputs, or between a dataset and a sink.
    #[error("schema mismatch: {0}")]
    Schema(String),

    /// Value not coercible under a declared rule.
    #[error("transform failed on field '{field}' (row {row}): {message}")]
    Transform {
        field: String,
        row: usize,
        message: String,
    },

    /// Malformed or failing read query.
    #[error("query failed: {0}")]
    Query(String),

    /// Filesystem failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Database failure outside of a read query.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Invalid pipeline configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EtlError {
    pub fn format(source: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Format {
            source_name: source.as_ref().display().to_string(),
            message: message.into(),
        }
    }

    pub fn transform(field: impl Into<String>, row: usize, message: impl Into<String>) -> Self {
        Self::Transform {
            field: field.into(),
            row,
            message: message.into(),
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Wrap an engine error raised while running a read query.
    pub fn query(err: impl std::fmt::Display) -> Self {
        Self::Query(err.to_string())
    }

    /// True for the I/O class (filesystem or database write failures).
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Sqlite(_))
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, EtlError>;
