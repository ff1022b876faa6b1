//! Document representation shared by every collection.
//!
//! A document is an untyped field map. Entities decode from it with a tagged
//! result so callers can tell a malformed document apart from a valid one with
//! empty optional fields.

mod timestamp;

pub use timestamp::*;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field holding the owning user's identifier on every document.
pub const OWNER_FIELD: &str = "userId";

/// Untyped field map as stored in a collection.
pub type Document = BTreeMap<String, Value>;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    String(String),
    Timestamp(Timestamp),
}

impl Value {
    /// Name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Total order used by ordered queries.
    ///
    /// Values of different types order by type: null, bool, integer,
    /// timestamp, string.
    pub fn query_cmp(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Integer(_) => 2,
                Value::Timestamp(_) => 3,
                Value::String(_) => 4,
            }
        }

        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<Timestamp> for Value {
    fn from(ts: Timestamp) -> Self {
        Value::Timestamp(ts)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Why a document could not be decoded into an entity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("field `{field}` should be {expected}, found {found}")]
    WrongType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Typed read access to a document's fields.
pub struct Fields<'a> {
    doc: &'a Document,
}

impl<'a> Fields<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self { doc }
    }

    fn wrong_type(field: &str, expected: &'static str, found: &Value) -> DecodeError {
        DecodeError::WrongType {
            field: field.to_string(),
            expected,
            found: found.type_name(),
        }
    }

    /// Present and non-null value, or `None`.
    fn present(&self, field: &str) -> Option<&'a Value> {
        self.doc.get(field).filter(|v| !v.is_null())
    }

    fn required(&self, field: &str) -> DecodeResult<&'a Value> {
        self.present(field)
            .ok_or_else(|| DecodeError::MissingField(field.to_string()))
    }

    pub fn string(&self, field: &str) -> DecodeResult<String> {
        match self.required(field)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(Self::wrong_type(field, "string", other)),
        }
    }

    pub fn opt_string(&self, field: &str) -> DecodeResult<Option<String>> {
        match self.present(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(Self::wrong_type(field, "string", other)),
        }
    }

    pub fn bool(&self, field: &str) -> DecodeResult<bool> {
        match self.required(field)? {
            Value::Bool(b) => Ok(*b),
            other => Err(Self::wrong_type(field, "bool", other)),
        }
    }

    pub fn opt_integer(&self, field: &str) -> DecodeResult<Option<i64>> {
        match self.present(field) {
            None => Ok(None),
            Some(Value::Integer(i)) => Ok(Some(*i)),
            Some(other) => Err(Self::wrong_type(field, "integer", other)),
        }
    }

    pub fn timestamp(&self, field: &str) -> DecodeResult<Timestamp> {
        match self.required(field)? {
            Value::Timestamp(ts) => Ok(*ts),
            other => Err(Self::wrong_type(field, "timestamp", other)),
        }
    }

    pub fn opt_timestamp(&self, field: &str) -> DecodeResult<Option<Timestamp>> {
        match self.present(field) {
            None => Ok(None),
            Some(Value::Timestamp(ts)) => Ok(Some(*ts)),
            Some(other) => Err(Self::wrong_type(field, "timestamp", other)),
        }
    }
}

/// Builds a document for a full write, skipping absent optional fields.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    doc: Document,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.doc.insert(field.to_string(), value.into());
        self
    }

    pub fn set_opt<T: Into<Value>>(mut self, field: &str, value: Option<T>) -> Self {
        if let Some(v) = value {
            self.doc.insert(field.to_string(), v.into());
        }
        self
    }

    pub fn build(self) -> Document {
        self.doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        DocumentBuilder::new()
            .set("title", "Checkup")
            .set("empty", "")
            .set("allDay", false)
            .set("minutes", 30i64)
            .set("at", Timestamp::from_micros(42))
            .set("gone", Value::Null)
            .build()
    }

    #[test]
    fn test_required_fields() {
        let doc = sample();
        let fields = Fields::new(&doc);
        assert_eq!(fields.string("title").unwrap(), "Checkup");
        assert!(!fields.bool("allDay").unwrap());
        assert_eq!(fields.timestamp("at").unwrap().as_micros(), 42);
    }

    #[test]
    fn test_empty_string_is_present() {
        let doc = sample();
        let fields = Fields::new(&doc);
        assert_eq!(fields.opt_string("empty").unwrap(), Some(String::new()));
        assert_eq!(fields.string("empty").unwrap(), "");
    }

    #[test]
    fn test_null_counts_as_absent() {
        let doc = sample();
        let fields = Fields::new(&doc);
        assert_eq!(fields.opt_string("gone").unwrap(), None);
        assert_eq!(
            fields.string("gone"),
            Err(DecodeError::MissingField("gone".into()))
        );
    }

    #[test]
    fn test_wrong_type() {
        let doc = sample();
        let fields = Fields::new(&doc);
        let err = fields.timestamp("minutes").unwrap_err();
        assert_eq!(
            err,
            DecodeError::WrongType {
                field: "minutes".into(),
                expected: "timestamp",
                found: "integer",
            }
        );
        assert!(fields.opt_integer("title").is_err());
    }

    #[test]
    fn test_builder_skips_none() {
        let doc = DocumentBuilder::new()
            .set_opt::<String>("provider", None)
            .set_opt("location", Some("Room 4"))
            .build();
        assert!(!doc.contains_key("provider"));
        assert_eq!(doc.get("location"), Some(&Value::from("Room 4")));
    }

    #[test]
    fn test_query_cmp_orders_by_type_then_value() {
        let mut values = vec![
            Value::from("b"),
            Value::Timestamp(Timestamp::from_micros(5)),
            Value::Null,
            Value::from("a"),
            Value::Integer(3),
            Value::Bool(true),
        ];
        values.sort_by(|a, b| a.query_cmp(b));
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Integer(3),
                Value::Timestamp(Timestamp::from_micros(5)),
                Value::from("a"),
                Value::from("b"),
            ]
        );
    }

    #[test]
    fn test_value_json_shape() {
        let json = serde_json::to_string(&Value::Timestamp(Timestamp::from_micros(7))).unwrap();
        assert_eq!(json, r#"{"timestamp":7}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::Timestamp(Timestamp::from_micros(7)));
    }
}
