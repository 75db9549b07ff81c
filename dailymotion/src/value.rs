//! Normalized JSON values.
//!
//! The API returns the same logical field with different JSON shapes depending on the endpoint.
//! [`normalize`] maps any parsed JSON document onto [`Value`], which is what every
//! [`Metadata`](crate::Metadata) stores and what every typed accessor converts from.
//!
//! Two rules shape the output:
//!
//! - A number that fits exactly in an `i64` becomes [`Value::Int`]; any other number becomes
//!   [`Value::Float`].
//! - An array takes the kind of its *first* element. Trailing elements of another kind are
//!   coerced to that kind through their string form, and left as [`Value::String`] when that
//!   fails. `[1, "2", "a"]` therefore becomes `[Int(1), Int(2), String("a")]`. An empty array
//!   becomes an empty list.

use indexmap::IndexMap;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use std::fmt;

/// A JSON value in canonical form.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

/// The kind of a [`Value`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    String,
    List,
    Map,
}

/// Converts a parsed JSON document into its canonical [`Value`].
pub fn normalize(raw: &serde_json::Value) -> Value {
    match raw {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => normalize_number(n),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => normalize_array(items),
        serde_json::Value::Object(members) => Value::Map(
            members
                .iter()
                .map(|(key, value)| (key.clone(), normalize(value)))
                .collect(),
        ),
    }
}

fn normalize_number(n: &serde_json::Number) -> Value {
    if let Some(i) = n.as_i64() {
        return Value::Int(i);
    }
    n.as_f64().map(Value::Float).unwrap_or(Value::Null)
}

fn normalize_array(items: &[serde_json::Value]) -> Value {
    let mut normalized = items.iter().map(normalize);
    let Some(first) = normalized.next() else {
        return Value::List(Vec::new());
    };

    let kind = first.kind();
    let mut list = Vec::with_capacity(items.len());
    list.push(first);
    list.extend(normalized.map(|item| item.coerce_to(kind)));
    Value::List(list)
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The kind of the list's elements, as decided by its first element.
    ///
    /// Empty lists are string lists. Returns `None` for non-lists.
    pub fn list_kind(&self) -> Option<ValueKind> {
        match self {
            Value::List(items) => Some(items.first().map_or(ValueKind::String, Value::kind)),
            _ => None,
        }
    }

    /// Coerces an array element to the kind chosen for its array.
    ///
    /// Nulls pass through untouched, as does everything in an array whose first element was
    /// null.
    fn coerce_to(self, kind: ValueKind) -> Value {
        if self.kind() == kind || self.is_null() || kind == ValueKind::Null {
            return self;
        }

        let repr = self.to_string();
        let coerced = match (kind, &self) {
            (ValueKind::Int, Value::Float(f)) => float_to_int(*f).map(Value::Int),
            (ValueKind::Int, _) => repr.trim().parse().ok().map(Value::Int),
            (ValueKind::Float, Value::Int(i)) => Some(Value::Float(*i as f64)),
            (ValueKind::Float, _) => repr.trim().parse().ok().map(Value::Float),
            (ValueKind::Bool, _) => match repr.as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        };
        coerced.unwrap_or(Value::String(repr))
    }

    /// Converts back into a `serde_json` document.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => items.iter().map(Value::to_json).collect(),
            Value::Map(members) => serde_json::Value::Object(
                members
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

pub(crate) fn float_to_int(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, so the upper bound must be exclusive.
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// The string form used for lossy coercion.
///
/// Scalars render as their plain text, `null` as the empty string, and lists and maps as JSON.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::List(_) | Value::Map(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => serializer.collect_seq(items),
            Value::Map(members) => serializer.collect_map(members),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(normalize(&raw))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<jiff::Timestamp> for Value {
    fn from(ts: jiff::Timestamp) -> Self {
        Value::Int(ts.as_second())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(members: IndexMap<String, Value>) -> Self {
        Value::Map(members)
    }
}
