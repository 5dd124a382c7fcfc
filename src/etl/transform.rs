//! Transformer trait for dataset transformation

use crate::error::Result;
use crate::table::Dataset;

/// Transformer trait for transforming a whole dataset
///
/// Implementors define one deterministic step:
/// - Per-field unit and type conversions
/// - Derived columns (exchange rates)
/// - Column renames and de-duplication
///
/// A transformer consumes its input and returns a new dataset with the same
/// row count and order. It either converts every row or fails.
///
/// # Example
/// ```
/// use tabular_etl::etl::Transformer;
/// use tabular_etl::table::{Dataset, Schema};
/// use tabular_etl::Result;
///
/// struct Passthrough;
///
/// impl Transformer for Passthrough {
///     fn name(&self) -> &str {
///         "passthrough"
///     }
///
///     fn transform(&self, input: Dataset) -> Result<Dataset> {
///         Ok(input)
///     }
/// }
///
/// let ds = Dataset::new(Schema::new(["a"]));
/// assert!(Passthrough.transform(ds).unwrap().is_empty());
/// ```
pub trait Transformer: Send + Sync {
    /// Short step name for log output
    fn name(&self) -> &str;

    /// Transform the dataset
    ///
    /// # Errors
    /// Returns an error if a value cannot be converted or a field is missing
    fn transform(&self, input: Dataset) -> Result<Dataset>;
}

/// Applies a sequence of transformers in order
#[derive(Default)]
pub struct TransformChain {
    steps: Vec<Box<dyn Transformer>>,
}

impl TransformChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step to the end of the chain
    pub fn then(mut self, step: impl Transformer + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn push(&mut self, step: Box<dyn Transformer>) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Transformer for TransformChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn transform(&self, input: Dataset) -> Result<Dataset> {
        self.steps.iter().try_fold(input, |dataset, step| {
            log::debug!("Applying transform step '{}'", step.name());
            step.transform(dataset)
        })
    }
}
