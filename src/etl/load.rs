//! Loader trait for loading a dataset to a destination

use crate::error::Result;
use crate::table::Dataset;

/// Loader trait for loading a dataset to a destination
///
/// Implementors define how rows are persisted:
/// - Flat files (CSV, NDJSON, JSON array)
/// - SQLite tables
///
/// Loading is blocking and all-or-nothing: a failed load leaves the previous
/// contents of the destination in place.
///
/// # Example
/// ```
/// use tabular_etl::etl::Loader;
/// use tabular_etl::table::{Dataset, Schema};
/// use tabular_etl::Result;
///
/// struct CountingLoader;
///
/// impl Loader for CountingLoader {
///     fn destination(&self) -> String {
///         "/dev/null".to_string()
///     }
///
///     fn load(&self, dataset: &Dataset) -> Result<usize> {
///         Ok(dataset.len())
///     }
/// }
///
/// let ds = Dataset::new(Schema::new(["a"]));
/// assert_eq!(CountingLoader.load(&ds).unwrap(), 0);
/// ```
pub trait Loader: Send + Sync {
    /// Destination description used in audit messages
    fn destination(&self) -> String;

    /// Load the dataset to the destination
    ///
    /// Returns the number of rows written
    ///
    /// # Errors
    /// Returns an error if loading fails (I/O, schema mismatch, database)
    fn load(&self, dataset: &Dataset) -> Result<usize>;
}
