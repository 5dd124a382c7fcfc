//! Currency conversion from a side rate table

use super::round_to;
use super::rules::finite;
use crate::error::{EtlError, Result};
use crate::etl::Transformer;
use crate::storage::encoding;
use crate::table::{Dataset, Record, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A derived column and the rate key it is computed with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTarget {
    pub column: String,
    pub rate: String,
}

impl RateTarget {
    pub fn new(column: impl Into<String>, rate: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            rate: rate.into(),
        }
    }
}

/// Appends `round(base * rate, precision)` columns
///
/// The rate file is a two-column CSV with a header row, e.g.
///
/// ```text
/// Currency,Rate
/// EUR,0.93
/// GBP,0.8
/// INR,82.95
/// ```
///
/// It is read on every call, so edits between runs are picked up.
pub struct ExchangeRates {
    base: String,
    rates_file: PathBuf,
    targets: Vec<RateTarget>,
    precision: u32,
}

impl ExchangeRates {
    pub fn new(base: impl Into<String>, rates_file: impl AsRef<Path>) -> Self {
        Self {
            base: base.into(),
            rates_file: rates_file.as_ref().to_path_buf(),
            targets: Vec::new(),
            precision: 2,
        }
    }

    pub fn target(mut self, column: impl Into<String>, rate: impl Into<String>) -> Self {
        self.targets.push(RateTarget::new(column, rate));
        self
    }

    pub fn with_targets(mut self, targets: Vec<RateTarget>) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    /// Parse the rate file into `key -> rate`
    pub fn load_rates(&self) -> Result<HashMap<String, f64>> {
        let text = encoding::read_text(&self.rates_file)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(text.as_bytes());

        let mut rates = HashMap::new();
        for (index, row) in reader.records().enumerate() {
            let row = row.map_err(|e| EtlError::format(&self.rates_file, e.to_string()))?;
            let (Some(key), Some(raw)) = (row.get(0), row.get(1)) else {
                return Err(EtlError::format(
                    &self.rates_file,
                    format!("line {}: expected key,value", index + 2),
                ));
            };
            let rate = raw.trim().parse::<f64>().map_err(|_| {
                EtlError::format(
                    &self.rates_file,
                    format!("line {}: rate '{}' is not numeric", index + 2, raw),
                )
            })?;
            rates.insert(key.trim().to_string(), rate);
        }
        Ok(rates)
    }
}

impl Transformer for ExchangeRates {
    fn name(&self) -> &str {
        "exchange_rates"
    }

    fn transform(&self, input: Dataset) -> Result<Dataset> {
        let base = input.schema().require(&self.base)?;
        let rates = self.load_rates()?;

        let mut schema = input.schema().clone();
        let mut factors = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            if schema.contains(&target.column) {
                return Err(EtlError::schema(format!(
                    "derived column '{}' already exists",
                    target.column
                )));
            }
            let rate = rates.get(&target.rate).copied().ok_or_else(|| {
                EtlError::transform(
                    &target.column,
                    0,
                    format!(
                        "no rate '{}' in {}",
                        target.rate,
                        self.rates_file.display()
                    ),
                )
            })?;
            factors.push(rate);
            schema = schema.with_field(&target.column);
        }

        let (_, records) = input.into_parts();
        let mut output = Dataset::new(schema);
        for (row, record) in records.into_iter().enumerate() {
            let amount = record
                .get(base)
                .and_then(Value::as_f64)
                .ok_or_else(|| {
                    EtlError::transform(&self.base, row, "base amount is not numeric")
                })?;
            let mut values = record.into_values();
            for (target, rate) in self.targets.iter().zip(&factors) {
                let derived = finite(amount * rate)
                    .map_err(|message| EtlError::transform(&target.column, row, message))?;
                values.push(Value::Float(round_to(derived, self.precision)));
            }
            output.push(Record::new(values))?;
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Schema;
    use tempfile::TempDir;

    fn rates_file(temp: &TempDir) -> PathBuf {
        let path = temp.path().join("exchange_rate.csv");
        std::fs::write(&path, "Currency,Rate\nEUR,0.93\nGBP,0.8\nINR,82.95\n").unwrap();
        path
    }

    fn banks() -> Dataset {
        Dataset::from_rows(
            Schema::new(["Bank name", "Market cap (US$ billion)"]),
            vec![
                vec!["JPMorgan Chase".into(), 432.92.into()],
                vec!["Bank of America".into(), 231.52.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_appends_derived_columns() {
        let temp = TempDir::new().unwrap();
        let out = ExchangeRates::new("Market cap (US$ billion)", rates_file(&temp))
            .target("MC_GBP_Billion", "GBP")
            .target("MC_EUR_Billion", "EUR")
            .target("MC_INR_Billion", "INR")
            .transform(banks())
            .unwrap();

        assert_eq!(
            out.schema().fields(),
            [
                "Bank name",
                "Market cap (US$ billion)",
                "MC_GBP_Billion",
                "MC_EUR_Billion",
                "MC_INR_Billion"
            ]
        );
        assert_eq!(out.get(0, "MC_GBP_Billion"), Some(&Value::Float(346.34)));
        assert_eq!(out.get(0, "MC_EUR_Billion"), Some(&Value::Float(402.62)));
        assert_eq!(out.get(0, "MC_INR_Billion"), Some(&Value::Float(35910.71)));
        assert_eq!(out.get(1, "Market cap (US$ billion)"), Some(&Value::Float(231.52)));
    }

    #[test]
    fn test_missing_rate_key() {
        let temp = TempDir::new().unwrap();
        let err = ExchangeRates::new("Market cap (US$ billion)", rates_file(&temp))
            .target("MC_JPY_Billion", "JPY")
            .transform(banks())
            .unwrap_err();
        assert!(matches!(err, EtlError::Transform { .. }));
    }

    #[test]
    fn test_overflowing_amount_is_transform_error() {
        let temp = TempDir::new().unwrap();
        let ds = Dataset::from_rows(
            Schema::new(["Bank name", "Market cap (US$ billion)"]),
            vec![
                vec!["JPMorgan Chase".into(), 432.92.into()],
                vec!["Too big".into(), Value::Float(1e307)],
            ],
        )
        .unwrap();

        let err = ExchangeRates::new("Market cap (US$ billion)", rates_file(&temp))
            .target("MC_INR_Billion", "INR")
            .transform(ds)
            .unwrap_err();
        match err {
            EtlError::Transform { field, row, message } => {
                assert_eq!(field, "MC_INR_Billion");
                assert_eq!(row, 1);
                assert!(message.contains("not finite"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rate_file_is_read_per_call() {
        let temp = TempDir::new().unwrap();
        let path = rates_file(&temp);
        let step = ExchangeRates::new("Market cap (US$ billion)", &path).target("MC_GBP_Billion", "GBP");
        step.transform(banks()).unwrap();

        std::fs::write(&path, "Currency,Rate\nGBP,1.0\n").unwrap();
        let out = step.transform(banks()).unwrap();
        assert_eq!(out.get(0, "MC_GBP_Billion"), Some(&Value::Float(432.92)));
    }
}
