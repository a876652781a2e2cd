//! Attribute values
//!
//! [`FieldValue`] is what an attribute getter hands to the engine and what the
//! codec hands back to an attribute setter. It covers the attribute kinds an
//! entity can declare: booleans, integers, floats, strings, enumerations,
//! timestamps and structured (JSON) values.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::time::StoredTime;

/// Largest integer an `f64` holds exactly
const MAX_EXACT_F64_INT: u64 = 1 << 53;

/// Enumerations stored as attributes
///
/// Stored by ordinal, grouped by label.
pub trait AttributeEnum: Sized {
    /// Underlying ordinal
    fn ordinal(&self) -> i64;

    /// Display label, used as the grouping value
    fn label(&self) -> &'static str;

    /// Reverse of [`AttributeEnum::ordinal`]
    fn from_ordinal(ordinal: i64) -> Option<Self>;
}

/// A single attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Enumeration; `label` is empty when the value was decoded from storage
    Enum {
        /// Underlying ordinal
        ordinal: i64,
        /// Variant label
        label: String,
    },
    /// Timestamp
    Time(StoredTime),
    /// Structured value
    Json(serde_json::Value),
}

impl FieldValue {
    /// Enumeration value
    pub fn from_enum<T: AttributeEnum>(value: &T) -> Self {
        FieldValue::Enum {
            ordinal: value.ordinal(),
            label: value.label().to_string(),
        }
    }

    /// Structured value serialized through serde
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(FieldValue::Json(serde_json::to_value(value)?))
    }

    /// Optional value; `None` becomes [`FieldValue::Null`]
    pub fn optional<T: Into<FieldValue>>(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }

    /// Name of the variant
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::String(_) => "string",
            FieldValue::Enum { .. } => "enum",
            FieldValue::Time(_) => "time",
            FieldValue::Json(_) => "json",
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Text used as a grouping key segment; `None` for null
    ///
    /// Enumerations render their label (falling back to the ordinal when
    /// the label is unknown), timestamps their stored form.
    pub fn render(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Int(i) => Some(i.to_string()),
            FieldValue::Float(f) => Some(f.to_string()),
            FieldValue::String(s) => Some(s.clone()),
            FieldValue::Enum { ordinal, label } if label.is_empty() => Some(ordinal.to_string()),
            FieldValue::Enum { label, .. } => Some(label.clone()),
            FieldValue::Time(t) => Some(t.encode()),
            FieldValue::Json(v) => Some(v.to_string()),
        }
    }

    /// Score for an ordered index, if the value converts to `f64` without loss
    ///
    /// Integers beyond 2^53, non-finite floats, booleans and structured
    /// values have no score. Strings score if they parse as a finite number.
    pub fn as_score(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) if i.unsigned_abs() <= MAX_EXACT_F64_INT => Some(*i as f64),
            FieldValue::Float(f) if f.is_finite() => Some(*f),
            FieldValue::Enum { ordinal, .. } => Some(*ordinal as f64),
            FieldValue::Time(t) => Some(t.unix_millis() as f64),
            FieldValue::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    // ========== Conversions used by attribute setters ==========

    fn mismatch(&self, attribute: &str, expected: &'static str) -> Error {
        Error::conversion(attribute, expected, self.to_string())
    }

    /// Extract a boolean
    pub fn into_bool(self, attribute: &str) -> Result<bool> {
        match self {
            FieldValue::Bool(b) => Ok(b),
            other => Err(other.mismatch(attribute, "bool")),
        }
    }

    /// Extract an integer; enumerations yield their ordinal
    pub fn into_i64(self, attribute: &str) -> Result<i64> {
        match self {
            FieldValue::Int(i) => Ok(i),
            FieldValue::Enum { ordinal, .. } => Ok(ordinal),
            other => Err(other.mismatch(attribute, "int")),
        }
    }

    /// Extract a float; integers widen
    pub fn into_f64(self, attribute: &str) -> Result<f64> {
        match self {
            FieldValue::Float(f) => Ok(f),
            FieldValue::Int(i) => Ok(i as f64),
            other => Err(other.mismatch(attribute, "float")),
        }
    }

    /// Extract a string
    pub fn into_string(self, attribute: &str) -> Result<String> {
        match self {
            FieldValue::String(s) => Ok(s),
            other => Err(other.mismatch(attribute, "string")),
        }
    }

    /// Extract a timestamp
    pub fn into_time(self, attribute: &str) -> Result<StoredTime> {
        match self {
            FieldValue::Time(t) => Ok(t),
            other => Err(other.mismatch(attribute, "time")),
        }
    }

    /// Extract an enumeration by ordinal
    pub fn into_enum<T: AttributeEnum>(self, attribute: &str) -> Result<T> {
        let ordinal = self.into_i64(attribute)?;
        T::from_ordinal(ordinal)
            .ok_or_else(|| Error::conversion(attribute, "known enum ordinal", ordinal.to_string()))
    }

    /// Deserialize a structured value
    pub fn into_json<T: DeserializeOwned>(self, attribute: &str) -> Result<T> {
        match self {
            FieldValue::Json(v) => serde_json::from_value(v)
                .map_err(|e| Error::conversion(attribute, "json", e.to_string())),
            other => Err(other.mismatch(attribute, "json")),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Some(s) => f.write_str(&s),
            None => f.write_str("null"),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<u32> for FieldValue {
    fn from(i: u32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<StoredTime> for FieldValue {
    fn from(t: StoredTime) -> Self {
        FieldValue::Time(t)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(v: serde_json::Value) -> Self {
        FieldValue::Json(v)
    }
}
