//! Extractors for the supported source kinds

mod files;
mod web_table;

pub use files::{FileGlobExtractor, FilePatterns, read_sources};
pub use web_table::{TableSpec, WebTableExtractor};
