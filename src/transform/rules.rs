//! Declarative per-field conversions
//!
//! Each [`FieldRule`] is a pure function of one value. [`FieldRules`] applies
//! a list of them to every record and either converts the whole dataset or
//! fails on the first value that cannot be converted.

use super::text::{strip_citations, strip_thousands};
use crate::error::{EtlError, Result};
use crate::etl::Transformer;
use crate::table::{Dataset, Record, Value};
use serde::{Deserialize, Serialize};

/// Decimal places beyond which an `f64` has nothing left to round.
const MAX_PRECISION: u32 = 15;

/// Round half away from zero at `precision` decimal places.
///
/// Values that cannot be shifted by `10^precision` without overflowing, and
/// precisions past what an `f64` holds, come back unchanged.
///
/// ```
/// use tabular_etl::transform::round_to;
///
/// assert_eq!(round_to(70.0 * 0.0254, 2), 1.78);
/// assert_eq!(round_to(-2.5, 0), -3.0);
/// assert_eq!(round_to(1.78, 400), 1.78);
/// ```
pub fn round_to(value: f64, precision: u32) -> f64 {
    if precision > MAX_PRECISION {
        return value;
    }
    let factor = 10f64.powi(precision as i32);
    let shifted = value * factor;
    if !shifted.is_finite() {
        return value;
    }
    shifted.round() / factor
}

/// Reject infinities and NaN produced by a numeric rule.
pub(crate) fn finite(value: f64) -> std::result::Result<f64, String> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("result {} is not finite", value))
    }
}

/// One conversion applied to a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldRule {
    /// Multiply by `factor`, then round when a precision is set
    Scale {
        factor: f64,
        #[serde(default)]
        precision: Option<u32>,
    },
    Round {
        precision: u32,
    },
    Float,
    Integer,
    Text,
    Trim,
    StripCitations,
    StripThousands,
}

impl FieldRule {
    /// Convert one value; the error message says why it could not be.
    pub fn apply(&self, value: &Value) -> std::result::Result<Value, String> {
        match self {
            FieldRule::Scale { factor, precision } => {
                let scaled = finite(numeric(value)? * factor)?;
                Ok(Value::Float(match precision {
                    Some(p) => round_to(scaled, *p),
                    None => scaled,
                }))
            }
            FieldRule::Round { precision } => {
                Ok(Value::Float(round_to(finite(numeric(value)?)?, *precision)))
            }
            FieldRule::Float => Ok(Value::Float(finite(numeric(value)?)?)),
            FieldRule::Integer => integer(value).map(Value::Integer),
            FieldRule::Text => match value {
                Value::Null => Err("NULL cannot be converted to text".to_string()),
                other => Ok(Value::Text(other.to_field_string())),
            },
            FieldRule::Trim => Ok(map_text(value, |s| s.trim().to_string())),
            FieldRule::StripCitations => Ok(map_text(value, strip_citations)),
            FieldRule::StripThousands => Ok(map_text(value, strip_thousands)),
        }
    }
}

fn numeric(value: &Value) -> std::result::Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| format!("{:?} is not numeric", value.to_string()))
}

fn integer(value: &Value) -> std::result::Result<i64, String> {
    if let Value::Integer(i) = value {
        return Ok(*i);
    }
    if let Some(Ok(i)) = value.as_str().map(|s| s.trim().parse::<i64>()) {
        return Ok(i);
    }
    let f = numeric(value)?;
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Ok(f as i64)
    } else {
        Err(format!("{} is not a whole number", f))
    }
}

fn map_text(value: &Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::Text(s) => Value::Text(f(s)),
        other => other.clone(),
    }
}

/// A rule bound to the field it converts
///
/// ```yaml
/// field: height
/// kind: scale
/// factor: 0.0254
/// precision: 2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRule {
    pub field: String,
    #[serde(flatten)]
    pub rule: FieldRule,
}

impl TransformRule {
    pub fn new(field: impl Into<String>, rule: FieldRule) -> Self {
        Self {
            field: field.into(),
            rule,
        }
    }

    /// Unit conversion rounded to `precision` places
    pub fn scale(field: impl Into<String>, factor: f64, precision: u32) -> Self {
        Self::new(
            field,
            FieldRule::Scale {
                factor,
                precision: Some(precision),
            },
        )
    }
}

/// Applies field rules in order to every record
#[derive(Debug, Clone, Default)]
pub struct FieldRules {
    rules: Vec<TransformRule>,
}

impl FieldRules {
    pub fn new(rules: Vec<TransformRule>) -> Self {
        Self { rules }
    }

    pub fn rule(mut self, rule: TransformRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[TransformRule] {
        &self.rules
    }
}

impl Transformer for FieldRules {
    fn name(&self) -> &str {
        "convert"
    }

    fn transform(&self, input: Dataset) -> Result<Dataset> {
        let bound = self
            .rules
            .iter()
            .map(|r| Ok((input.schema().require(&r.field)?, r)))
            .collect::<Result<Vec<_>>>()?;

        let (schema, records) = input.into_parts();
        let mut output = Dataset::new(schema);
        for (row, record) in records.into_iter().enumerate() {
            let mut values = record.into_values();
            for (index, rule) in &bound {
                values[*index] = rule
                    .rule
                    .apply(&values[*index])
                    .map_err(|message| EtlError::transform(&rule.field, row, message))?;
            }
            output.push(Record::new(values))?;
        }

        log::debug!(
            "Applied {} rule(s) to {} row(s)",
            self.rules.len(),
            output.len()
        );
        Ok(output)
    }
}
