//! In-memory tabular model
//!
//! Every stage exchanges data as a [`Dataset`]: a fixed [`Schema`] and
//! positional [`Record`]s of typed [`Value`]s.

mod dataset;
mod value;

pub use dataset::{Dataset, Record, Schema};
pub use value::Value;
