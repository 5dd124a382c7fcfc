//! Core ETL (Extract, Transform, Load) abstractions
//!
//! This module provides the trait definitions and the pipeline harness that
//! extracts a dataset from a source, transforms it, and loads it to one or
//! more destinations while writing an audit trail.

mod extract;
mod load;
mod pipeline;
mod transform;

pub use extract::Extractor;
pub use load::Loader;
pub use pipeline::{LoadOutcome, Pipeline, QueryOutcome, RunSummary};
pub use transform::{TransformChain, Transformer};
