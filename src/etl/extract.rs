//! Extractor trait for pulling a dataset out of a source

use crate::error::Result;
use crate::table::Dataset;

/// Extractor trait for extracting a dataset from a source
///
/// Implementors define where the rows come from:
/// - Files matched by glob patterns
/// - An HTML table fetched over HTTP
///
/// The returned dataset only ever grows during extraction; once returned it
/// is handed to the transformer by value.
///
/// # Example
/// ```no_run
/// use tabular_etl::etl::Extractor;
/// use tabular_etl::table::{Dataset, Schema};
/// use tabular_etl::Result;
///
/// struct EmptySource;
///
/// impl Extractor for EmptySource {
///     fn describe(&self) -> String {
///         "nothing".to_string()
///     }
///
///     async fn extract(&self) -> Result<Dataset> {
///         Ok(Dataset::new(Schema::new(["name"])))
///     }
/// }
/// ```
pub trait Extractor: Send + Sync {
    /// Human-readable source description used in audit messages
    fn describe(&self) -> String;

    /// Extract all rows from the source
    ///
    /// # Errors
    /// Returns an error if extraction fails (network, I/O, format, schema)
    fn extract(&self) -> impl std::future::Future<Output = Result<Dataset>> + Send;
}
