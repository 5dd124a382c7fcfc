//! Scalar cell values

use crate::error::{EtlError, Result};
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use regex::Regex;
use serde::ser::{Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Decimal numbers as this crate writes them: no leading zeros, no sign on
/// positives, optional exponent.
static CANONICAL_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(0|[1-9][0-9]*|(0|[1-9][0-9]*)?\.[0-9]+)([eE][+-]?[0-9]+)?$")
        .expect("number pattern is valid")
});

/// One scalar cell.
///
/// `Null` is only produced when reading SQL NULLs back through a query;
/// extraction never null-fills a missing field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

impl Value {
    /// Infer a value from delimited text: integer, then float, then text.
    ///
    /// Only canonical spellings become numbers, so `"007"` stays text.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(i) = trimmed.parse::<i64>()
            && i.to_string() == trimmed
        {
            return Value::Integer(i);
        }
        Self::infer_float(raw)
    }

    /// Like [`Value::infer`] but numbers always become floats.
    pub fn infer_float(raw: &str) -> Self {
        let trimmed = raw.trim();
        if !CANONICAL_NUMBER.is_match(trimmed) {
            return Value::Text(raw.to_string());
        }
        match parse_finite(trimmed) {
            Some(f) => Value::Float(f),
            None => Value::Text(raw.to_string()),
        }
    }

    /// Numeric view of the value, parsing text when needed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => parse_finite(s.trim()),
            Value::Null => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text written to delimited output.
    ///
    /// Finite floats always carry a `.` or an exponent so they read back as
    /// floats.
    pub fn to_field_string(&self) -> String {
        match self {
            Value::Integer(i) => i.to_string(),
            Value::Float(f) if f.is_finite() => format!("{:?}", f),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Null => String::new(),
        }
    }

    /// Convert a JSON scalar into a value. Returns `None` for null, arrays and objects.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Value::Integer(i)),
                None => n.as_f64().map(Value::Float),
            },
            serde_json::Value::String(s) => Some(Value::Text(s.clone())),
            serde_json::Value::Bool(b) => Some(Value::Text(b.to_string())),
            _ => None,
        }
    }

    /// Convert a column read from SQLite.
    pub fn from_sql_ref(value: ValueRef<'_>) -> Result<Self> {
        match value {
            ValueRef::Null => Ok(Value::Null),
            ValueRef::Integer(i) => Ok(Value::Integer(i)),
            ValueRef::Real(f) => Ok(Value::Float(f)),
            ValueRef::Text(bytes) => Ok(Value::Text(String::from_utf8_lossy(bytes).into_owned())),
            ValueRef::Blob(_) => Err(EtlError::Query(
                "BLOB columns cannot be represented as tabular values".to_string(),
            )),
        }
    }
}

/// Parse a float, rejecting `inf`/`NaN` spellings.
fn parse_finite(s: &str) -> Option<f64> {
    if !s.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            other => write!(f, "{}", other.to_field_string()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Float(_) | Value::Null => serializer.serialize_none(),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Float(f) => ToSqlOutput::from(*f),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer() {
        assert_eq!(Value::infer("42"), Value::Integer(42));
        assert_eq!(Value::infer(" 70.5 "), Value::Float(70.5));
        assert_eq!(Value::infer("Alice"), Value::Text("Alice".to_string()));
        assert_eq!(Value::infer("inf"), Value::Text("inf".to_string()));
        assert_eq!(Value::infer("NaN"), Value::Text("NaN".to_string()));
    }

    #[test]
    fn test_infer_keeps_non_canonical_numbers_as_text() {
        assert_eq!(Value::infer("007"), Value::Text("007".to_string()));
        assert_eq!(Value::infer("+5"), Value::Text("+5".to_string()));
        assert_eq!(Value::infer("00.5"), Value::Text("00.5".to_string()));
        assert_eq!(Value::infer("-12"), Value::Integer(-12));
        assert_eq!(Value::infer("0.5"), Value::Float(0.5));
        assert_eq!(Value::infer("1e16"), Value::Float(1e16));
        assert_eq!(Value::infer_float("0042"), Value::Text("0042".to_string()));
    }

    #[test]
    fn test_infer_float() {
        assert_eq!(Value::infer_float("150"), Value::Float(150.0));
        assert_eq!(Value::infer_float("Bob"), Value::Text("Bob".to_string()));
    }

    #[test]
    fn test_field_string_keeps_float_marker() {
        assert_eq!(Value::Float(70.0).to_field_string(), "70.0");
        assert_eq!(Value::Float(1.78).to_field_string(), "1.78");
        assert_eq!(Value::Integer(70).to_field_string(), "70");
        assert_eq!(Value::infer(&Value::Float(68.0).to_field_string()), Value::Float(68.0));

        for f in [1e15, -1e15, 1e16, 123456789012345680.0, 1e-7] {
            assert_eq!(Value::infer(&Value::Float(f).to_field_string()), Value::Float(f));
        }
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Value::from_json(&serde_json::json!(3)), Some(Value::Integer(3)));
        assert_eq!(Value::from_json(&serde_json::json!(3.5)), Some(Value::Float(3.5)));
        assert_eq!(
            Value::from_json(&serde_json::json!("x")),
            Some(Value::Text("x".to_string()))
        );
        assert_eq!(Value::from_json(&serde_json::Value::Null), None);
    }

    #[test]
    fn test_serialize() {
        let out = serde_json::to_string(&vec![
            Value::Integer(1),
            Value::Float(2.5),
            Value::Text("a".to_string()),
            Value::Null,
        ])
        .unwrap();
        assert_eq!(out, r#"[1,2.5,"a",null]"#);
    }
}
