//! DynamicValue - closed model of an inbound host argument.
//!
//! Host arguments are dynamically typed. Instead of asking "has property x?"
//! / "is number?" at runtime, every argument is lowered once into this enum
//! and the resolvers match on it exhaustively.

use std::collections::BTreeMap;

use super::errors::ParseError;
use super::geometry::CanonicalValue;

/// One host argument.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicValue {
    Number(f64),
    Text(String),
    /// Plain object: field name -> value.
    Struct(BTreeMap<String, DynamicValue>),
    Array(Vec<DynamicValue>),
    /// Reference to an already-constructed canonical value.
    Handle(CanonicalValue),
}

/// Result of looking up one named field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum FieldProbe {
    Missing,
    Number(f64),
    NotNumber,
}

impl FieldProbe {
    pub(crate) fn is_present(self) -> bool {
        !matches!(self, FieldProbe::Missing)
    }
}

impl DynamicValue {
    pub fn number(v: impl Into<f64>) -> Self {
        DynamicValue::Number(v.into())
    }

    pub fn text(s: impl Into<String>) -> Self {
        DynamicValue::Text(s.into())
    }

    /// Build a `Struct` from `(name, value)` pairs.
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, DynamicValue)>,
        K: Into<String>,
    {
        DynamicValue::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn array(items: impl IntoIterator<Item = DynamicValue>) -> Self {
        DynamicValue::Array(items.into_iter().collect())
    }

    pub fn handle(value: impl Into<CanonicalValue>) -> Self {
        DynamicValue::Handle(value.into())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            DynamicValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, DynamicValue::Number(_))
    }

    /// Values that expose named fields: plain structs and canonical handles.
    pub fn is_object(&self) -> bool {
        matches!(self, DynamicValue::Struct(_) | DynamicValue::Handle(_))
    }

    /// Short type name, used in log lines and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            DynamicValue::Number(_) => "number",
            DynamicValue::Text(_) => "text",
            DynamicValue::Struct(_) => "struct",
            DynamicValue::Array(_) => "array",
            DynamicValue::Handle(_) => "handle",
        }
    }

    /// Look up a named numeric field.
    ///
    /// Handles expose their own fields: a Point handle has `x`/`y`, a Size
    /// handle `width`/`height`, a Rect handle all four. Scalar handles expose
    /// no named fields.
    pub(crate) fn probe(&self, name: &str) -> FieldProbe {
        match self {
            DynamicValue::Struct(fields) => match fields.get(name) {
                None => FieldProbe::Missing,
                Some(DynamicValue::Number(n)) => FieldProbe::Number(*n),
                Some(_) => FieldProbe::NotNumber,
            },
            DynamicValue::Handle(value) => match handle_field(value, name) {
                Some(v) => FieldProbe::Number(f64::from(v)),
                None => FieldProbe::Missing,
            },
            _ => FieldProbe::Missing,
        }
    }

    pub(crate) fn has_fields(&self, names: &[&str]) -> bool {
        names.iter().all(|name| self.probe(name).is_present())
    }
}

fn handle_field(value: &CanonicalValue, name: &str) -> Option<i32> {
    match (value, name) {
        (CanonicalValue::Point(p), "x") => Some(p.x),
        (CanonicalValue::Point(p), "y") => Some(p.y),
        (CanonicalValue::Size(s), "width") => Some(s.width),
        (CanonicalValue::Size(s), "height") => Some(s.height),
        (CanonicalValue::Rect(r), "x") => Some(r.x),
        (CanonicalValue::Rect(r), "y") => Some(r.y),
        (CanonicalValue::Rect(r), "width") => Some(r.width),
        (CanonicalValue::Rect(r), "height") => Some(r.height),
        _ => None,
    }
}

impl From<f64> for DynamicValue {
    fn from(v: f64) -> Self {
        DynamicValue::Number(v)
    }
}

impl From<i32> for DynamicValue {
    fn from(v: i32) -> Self {
        DynamicValue::Number(f64::from(v))
    }
}

impl From<&str> for DynamicValue {
    fn from(s: &str) -> Self {
        DynamicValue::Text(s.to_string())
    }
}

impl From<String> for DynamicValue {
    fn from(s: String) -> Self {
        DynamicValue::Text(s)
    }
}

impl From<CanonicalValue> for DynamicValue {
    fn from(v: CanonicalValue) -> Self {
        DynamicValue::Handle(v)
    }
}

/// JSON is how arguments arrive from the CLI and from tests.
///
/// `null` and booleans have no counterpart in the closed model and are
/// rejected up front.
impl TryFrom<serde_json::Value> for DynamicValue {
    type Error = ParseError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        match value {
            Value::Number(n) => n
                .as_f64()
                .map(DynamicValue::Number)
                .ok_or_else(|| ParseError::UnsupportedValue(n.to_string())),
            Value::String(s) => Ok(DynamicValue::Text(s)),
            Value::Array(items) => items
                .into_iter()
                .map(DynamicValue::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(DynamicValue::Array),
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| DynamicValue::try_from(v).map(|v| (k, v)))
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(DynamicValue::Struct),
            Value::Null => Err(ParseError::UnsupportedValue("null".to_string())),
            Value::Bool(b) => Err(ParseError::UnsupportedValue(b.to_string())),
        }
    }
}

/// Lower a JSON array into an argument list.
pub fn args_from_json(value: serde_json::Value) -> Result<Vec<DynamicValue>, ParseError> {
    match value {
        serde_json::Value::Array(items) => items.into_iter().map(DynamicValue::try_from).collect(),
        other => Err(ParseError::UnsupportedValue(format!(
            "expected an argument array, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::{Point, Rect, Scalar};
    use serde_json::json;

    #[test]
    fn json_object_becomes_struct() {
        let v = DynamicValue::try_from(json!({"x": 1, "y": "two"})).unwrap();
        assert_eq!(v.probe("x"), FieldProbe::Number(1.0));
        assert_eq!(v.probe("y"), FieldProbe::NotNumber);
        assert_eq!(v.probe("z"), FieldProbe::Missing);
    }

    #[test]
    fn json_null_is_rejected() {
        let err = DynamicValue::try_from(json!([1, null])).unwrap_err();
        assert!(err.to_string().contains("null"));
    }

    #[test]
    fn args_from_json_requires_array() {
        let args = args_from_json(json!([1, 2.5, "a"])).unwrap();
        assert_eq!(args.len(), 3);
        assert!(args_from_json(json!({"x": 1})).is_err());
    }

    #[test]
    fn handles_expose_their_fields() {
        let point = DynamicValue::handle(Point::new(3, 4));
        assert_eq!(point.probe("y"), FieldProbe::Number(4.0));
        assert!(!point.has_fields(&["width", "height"]));

        let rect = DynamicValue::handle(Rect::new(1, 2, 3, 4));
        assert!(rect.has_fields(&["x", "y", "width", "height"]));

        let scalar = DynamicValue::handle(Scalar::all(1.0));
        assert_eq!(scalar.probe("x"), FieldProbe::Missing);
        assert!(scalar.is_object());
    }
}
