//! The field-indexed metadata container returned by every API call.
//!
//! Reads are deliberately forgiving: the API does not always use the same JSON type for the same
//! field, so [`Metadata::get`] tries to convert whatever was stored and yields `None` when it
//! cannot, rather than failing.

use crate::fields::Field;
use crate::value::{Value, float_to_int};
use indexmap::IndexMap;
use jiff::Timestamp;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::time::Duration;

/// A best-effort conversion out of a stored [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Bool(_) | Value::Int(_) | Value::Float(_) => Some(value.to_string()),
            Value::Null | Value::List(_) | Value::Map(_) => None,
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            Value::Float(f) => float_to_int(*f),
            Value::String(s) => {
                let s = s.trim();
                s.parse().ok().or_else(|| float_to_int(s.parse().ok()?))
            }
            _ => None,
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Option<Self> {
        i64::from_value(value).and_then(|i| i.try_into().ok())
    }
}

impl FromValue for u32 {
    fn from_value(value: &Value) -> Option<Self> {
        i64::from_value(value).and_then(|i| i.try_into().ok())
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> Option<Self> {
        i64::from_value(value).and_then(|i| i.try_into().ok())
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Int(0) => Some(false),
            Value::Int(1) => Some(true),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Lists convert element-wise and fail as a whole. A plain string is read as a comma-separated
/// list, the way list parameters are sent to the API.
impl FromValue for Vec<String> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(items) => items.iter().map(String::from_value).collect(),
            Value::String(s) if s.is_empty() => Some(Vec::new()),
            Value::String(s) => Some(s.split(',').map(|t| t.trim().to_string()).collect()),
            _ => None,
        }
    }
}

impl FromValue for Vec<i64> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(items) => items.iter().map(i64::from_value).collect(),
            _ => None,
        }
    }
}

impl FromValue for Vec<f64> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(items) => items.iter().map(f64::from_value).collect(),
            _ => None,
        }
    }
}

impl FromValue for IndexMap<String, Value> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Map(members) => Some(members.clone()),
            _ => None,
        }
    }
}

/// Timestamps are Unix seconds on the wire; RFC 3339 strings are accepted too.
impl FromValue for Timestamp {
    fn from_value(value: &Value) -> Option<Self> {
        if let Value::String(s) = value {
            if let Ok(ts) = s.trim().parse::<Timestamp>() {
                return Some(ts);
            }
        }
        Timestamp::from_second(i64::from_value(value)?).ok()
    }
}

/// Metadata about one API object, keyed by [`Field`].
///
/// A field can be absent, present with [`Value::Null`], or present with a value. Only the last
/// case counts for [`Metadata::has_value`] and [`Metadata::available_fields`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    values: IndexMap<Field, Value>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `field`, replacing whatever was there.
    pub fn set(&mut self, field: Field, value: impl Into<Value>) {
        self.values.insert(field, value.into());
    }

    /// Reads `field` as a `T`.
    ///
    /// Returns `None` if the field is absent, null, or cannot be converted to `T`.
    pub fn get<T: FromValue>(&self, field: Field) -> Option<T> {
        match self.values.get(&field)? {
            Value::Null => None,
            value => T::from_value(value),
        }
    }

    /// The stored value, without conversion. Null values are returned as-is.
    pub fn raw(&self, field: Field) -> Option<&Value> {
        self.values.get(&field)
    }

    /// Whether `field` was set at all, even if to null.
    pub fn contains(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    pub fn has_value(&self, field: Field) -> bool {
        self.values.get(&field).is_some_and(|v| !v.is_null())
    }

    /// All fields holding a non-null value.
    ///
    /// Fields come back in the order they were first set, but callers should not rely on that.
    pub fn available_fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.values
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(&field, _)| field)
    }

    /// Copies the requested fields that are present here into a new container.
    pub fn subset(&self, fields: &[Field]) -> Metadata {
        let values = fields
            .iter()
            .filter_map(|field| Some((*field, self.values.get(field)?.clone())))
            .collect();
        Metadata { values }
    }

    /// Exports every available field under its wire name.
    pub fn to_wire_map(&self) -> IndexMap<&'static str, Value> {
        self.values
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(field, value)| (field.wire_name(), value.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.available_fields().next().is_none()
    }

    pub fn id(&self) -> Option<String> {
        self.get(Field::Id)
    }

    pub fn title(&self) -> Option<String> {
        self.get(Field::Title)
    }

    pub fn description(&self) -> Option<String> {
        self.get(Field::Description)
    }

    pub fn duration(&self) -> Option<Duration> {
        self.get::<u64>(Field::Duration).map(Duration::from_secs)
    }

    pub fn url(&self) -> Option<String> {
        self.get(Field::Url)
    }

    pub fn thumbnail_url(&self) -> Option<String> {
        self.get(Field::ThumbnailUrl)
    }

    pub fn tags(&self) -> Option<Vec<String>> {
        self.get(Field::Tags)
    }

    pub fn is_private(&self) -> Option<bool> {
        self.get(Field::Private)
    }

    pub fn created_time(&self) -> Option<Timestamp> {
        self.get(Field::CreatedTime)
    }

    pub fn views_total(&self) -> Option<u64> {
        self.get(Field::ViewsTotal)
    }

    /// The owning user's id.
    pub fn owner(&self) -> Option<String> {
        self.get(Field::Owner)
    }

    pub fn channel(&self) -> Option<String> {
        self.get(Field::Channel)
    }

    pub fn username(&self) -> Option<String> {
        self.get(Field::Username)
    }

    pub fn screen_name(&self) -> Option<String> {
        self.get(Field::ScreenName)
    }

    /// Name of a playlist or channel.
    pub fn name(&self) -> Option<String> {
        self.get(Field::Name)
    }
}

impl FromIterator<(Field, Value)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (Field, Value)>>(iter: I) -> Self {
        Metadata {
            values: iter.into_iter().collect(),
        }
    }
}

/// Serializes as a JSON object keyed by wire names, skipping null and absent fields.
impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for field in self.available_fields() {
            map.serialize_entry(field.wire_name(), &self.values[&field])?;
        }
        map.end()
    }
}
