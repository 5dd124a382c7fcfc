//! Append-only audit log
//!
//! Every stage transition and every failure becomes one line:
//!
//! ```text
//! 2024-06-01 12:00:00 : Extract phase Started
//! ```
//!
//! The file is opened in append mode for each entry and closed again, so a
//! crashed run never leaves a handle open and earlier entries are never
//! rewritten.

use crate::error::Result;
use chrono::{Local, NaiveDateTime};
use std::io::Write;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const SEPARATOR: &str = " : ";

/// One parsed line of the audit log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    pub message: String,
}

/// Audit log backed by a text file.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `<timestamp> : <message>`, creating the file on first use.
    pub fn record(&self, message: impl AsRef<str>) -> Result<()> {
        let message = message.as_ref();
        log::info!("{}", message);
        self.append(message)
    }

    /// Same as [`AuditLog::record`] but mirrored at error level.
    pub fn record_failure(&self, message: impl AsRef<str>) -> Result<()> {
        let message = message.as_ref();
        log::error!("{}", message);
        self.append(message)
    }

    fn append(&self, message: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // Entries are single lines; fold any embedded newlines.
        let line = message.replace(['\r', '\n'], " ");
        writeln!(
            file,
            "{}{}{}",
            Local::now().format(TIMESTAMP_FORMAT),
            SEPARATOR,
            line
        )?;
        Ok(())
    }

    /// Read back every entry. A missing file has no entries.
    pub fn entries(&self) -> Result<Vec<LogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .filter_map(|line| {
                let (stamp, message) = line.split_once(SEPARATOR)?;
                let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
                Some(LogEntry {
                    timestamp,
                    message: message.to_string(),
                })
            })
            .collect())
    }
}
