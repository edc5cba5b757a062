//! Typed, append-only columns

use super::Labels;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::fmt;

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Absolute UTC instant
    Time,
    Float64,
    String,
    /// Small signed enumeration (histogram bucket layout codes)
    Int8,
    /// Opaque JSON document
    Json,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Time => "time",
            FieldType::Float64 => "float64",
            FieldType::String => "string",
            FieldType::Int8 => "int8",
            FieldType::Json => "json",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Time(DateTime<Utc>),
    Float64(f64),
    String(String),
    Int8(i8),
    Json(serde_json::Value),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Time(_) => FieldType::Time,
            FieldValue::Float64(_) => FieldType::Float64,
            FieldValue::String(_) => FieldType::String,
            FieldValue::Int8(_) => FieldType::Int8,
            FieldValue::Json(_) => FieldType::Json,
        }
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Time(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float64(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<i8> for FieldValue {
    fn from(v: i8) -> Self {
        FieldValue::Int8(v)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(v: serde_json::Value) -> Self {
        FieldValue::Json(v)
    }
}

/// Column storage; every type is nullable so padding works uniformly
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValues {
    Time(Vec<Option<DateTime<Utc>>>),
    Float64(Vec<Option<f64>>),
    String(Vec<Option<String>>),
    Int8(Vec<Option<i8>>),
    Json(Vec<Option<serde_json::Value>>),
}

impl FieldValues {
    fn empty(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Time => FieldValues::Time(Vec::new()),
            FieldType::Float64 => FieldValues::Float64(Vec::new()),
            FieldType::String => FieldValues::String(Vec::new()),
            FieldType::Int8 => FieldValues::Int8(Vec::new()),
            FieldType::Json => FieldValues::Json(Vec::new()),
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValues::Time(_) => FieldType::Time,
            FieldValues::Float64(_) => FieldType::Float64,
            FieldValues::String(_) => FieldType::String,
            FieldValues::Int8(_) => FieldType::Int8,
            FieldValues::Json(_) => FieldType::Json,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FieldValues::Time(v) => v.len(),
            FieldValues::Float64(v) => v.len(),
            FieldValues::String(v) => v.len(),
            FieldValues::Int8(v) => v.len(),
            FieldValues::Json(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named column, optionally tagged with the labels of the series it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub labels: Option<Labels>,
    values: FieldValues,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            labels: None,
            values: FieldValues::empty(field_type),
        }
    }

    /// Set labels
    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn field_type(&self) -> FieldType {
        self.values.field_type()
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Append one value; the value type must match the column type
    pub fn append(&mut self, value: impl Into<FieldValue>) -> Result<()> {
        let value = value.into();
        match (&mut self.values, value) {
            (FieldValues::Time(v), FieldValue::Time(x)) => v.push(Some(x)),
            (FieldValues::Float64(v), FieldValue::Float64(x)) => v.push(Some(x)),
            (FieldValues::String(v), FieldValue::String(x)) => v.push(Some(x)),
            (FieldValues::Int8(v), FieldValue::Int8(x)) => v.push(Some(x)),
            (FieldValues::Json(v), FieldValue::Json(x)) => v.push(Some(x)),
            (values, other) => {
                return Err(Error::FieldTypeMismatch {
                    field: self.name.clone(),
                    expected: values.field_type(),
                    found: other.field_type(),
                })
            }
        }
        Ok(())
    }

    /// Append `n` nulls
    pub fn extend_nulls(&mut self, n: usize) {
        match &mut self.values {
            FieldValues::Time(v) => v.resize(v.len() + n, None),
            FieldValues::Float64(v) => v.resize(v.len() + n, None),
            FieldValues::String(v) => v.resize(v.len() + n, None),
            FieldValues::Int8(v) => v.resize(v.len() + n, None),
            FieldValues::Json(v) => v.resize(v.len() + n, None),
        }
    }

    /// Null-extend up to `len`; never shrinks
    pub fn pad_to(&mut self, len: usize) {
        let current = self.len();
        if len > current {
            self.extend_nulls(len - current);
        }
    }

    pub fn times(&self) -> Option<&[Option<DateTime<Utc>>]> {
        match &self.values {
            FieldValues::Time(v) => Some(v),
            _ => None,
        }
    }

    pub fn floats(&self) -> Option<&[Option<f64>]> {
        match &self.values {
            FieldValues::Float64(v) => Some(v),
            _ => None,
        }
    }

    pub fn strings(&self) -> Option<&[Option<String>]> {
        match &self.values {
            FieldValues::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn int8s(&self) -> Option<&[Option<i8>]> {
        match &self.values {
            FieldValues::Int8(v) => Some(v),
            _ => None,
        }
    }

    pub fn json_values(&self) -> Option<&[Option<serde_json::Value>]> {
        match &self.values {
            FieldValues::Json(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_pad() {
        let mut field = Field::new("host", FieldType::String);
        field.append("a").unwrap();
        field.pad_to(3);
        field.pad_to(1);
        assert_eq!(field.len(), 3);
        assert_eq!(
            field.strings().unwrap(),
            &[Some("a".to_string()), None, None]
        );
    }

    #[test]
    fn test_type_mismatch() {
        let mut field = Field::new("Value", FieldType::Float64);
        let err = field.append("oops").unwrap_err();
        assert!(matches!(
            err,
            Error::FieldTypeMismatch {
                expected: FieldType::Float64,
                found: FieldType::String,
                ..
            }
        ));
        assert!(field.is_empty());
    }

    #[test]
    fn test_typed_accessors() {
        let mut field = Field::new("yLayout", FieldType::Int8);
        field.append(-1i8).unwrap();
        assert_eq!(field.int8s().unwrap(), &[Some(-1)]);
        assert!(field.floats().is_none());
    }
}
