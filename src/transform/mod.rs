//! Transform implementations for tabular datasets
//!
//! Every step consumes a dataset and returns a new one with the same rows in
//! the same order. Steps are combined with [`crate::etl::TransformChain`].

mod columns;
mod exchange;
mod rules;
mod text;

pub use columns::{RenameColumns, UniqueColumns};
pub use exchange::{ExchangeRates, RateTarget};
pub use rules::{FieldRule, FieldRules, TransformRule, round_to};
pub use text::{strip_citations, strip_thousands};
