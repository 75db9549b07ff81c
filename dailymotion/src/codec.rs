//! Field-selective conversion between [`Metadata`] and JSON objects.
//!
//! Reading and writing both go through [`normalize`] and [`Value::to_json`], so a container
//! written out and read back holds the same values.
//!
//! When reading with an explicit list of requested fields, only those fields are picked out of
//! the object, even if the object holds more. Callers that request fields from the API must
//! parse the response with the same list, or data the server did send is silently dropped.

use crate::fields::Field;
use crate::metadata::Metadata;
use crate::value::normalize;

pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Writes every available field of `metadata` under its wire name.
pub fn to_json(metadata: &Metadata) -> JsonObject {
    metadata
        .available_fields()
        .filter_map(|field| {
            let value = metadata.raw(field)?;
            Some((field.wire_name().to_string(), value.to_json()))
        })
        .collect()
}

/// Reads a JSON object into a new container.
///
/// With an empty `requested` list, every registered field present in `object` is read.
/// Otherwise only the requested fields are looked up; those missing from `object` are left
/// absent.
pub fn from_json(object: &JsonObject, requested: &[Field]) -> Metadata {
    let fields = if requested.is_empty() {
        Field::ALL
    } else {
        requested
    };

    fields
        .iter()
        .filter_map(|&field| Some((field, normalize(object.get(field.wire_name())?))))
        .collect()
}

/// Parses `text` as a JSON object and reads it with [`from_json`].
///
/// Anything that is not a JSON object yields an empty container.
pub fn from_json_str(text: &str, requested: &[Field]) -> Metadata {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Object(object)) => from_json(&object, requested),
        Ok(other) => {
            tracing::warn!(kind = json_kind(&other), "expected a JSON object, ignoring");
            Metadata::new()
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not parse metadata JSON, ignoring");
            Metadata::new()
        }
    }
}

/// Renders `metadata` as JSON text.
pub fn to_json_string(metadata: &Metadata) -> String {
    serde_json::Value::Object(to_json(metadata)).to_string()
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
