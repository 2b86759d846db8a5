//! Query/response envelope shared by every protocol adapter and the backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Payload carried by a query object or a response's data.
///
/// Serialized untagged: a JSON string, a JSON object, or any other JSON
/// value (arrays, numbers, booleans, `null`) carried as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Opaque string payload.
    Text(String),
    /// Mapping from string keys to structured values.
    Map(BTreeMap<String, serde_json::Value>),
    /// Any other JSON shape.
    Other(serde_json::Value),
}

impl Value {
    /// Build a map value whose entries are all strings.
    pub fn fields<K, V, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), serde_json::Value::String(v.into())))
                .collect(),
        )
    }

    /// Look up a string entry of a map value.
    ///
    /// Returns `None` for text values, missing keys and non-string entries.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        match self {
            Value::Map(map) => map.get(key).and_then(|v| v.as_str()),
            Value::Text(_) | Value::Other(_) => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Map(BTreeMap::new())
    }
}

/// A single lookup issued to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Lookup namespace (e.g. a socketmap name, or `nginx`).
    pub verb: String,
    pub object: Value,
}

impl Query {
    pub fn new(verb: impl Into<String>, object: Value) -> Self {
        Self {
            verb: verb.into(),
            object,
        }
    }
}

/// Outcome class reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Lookup succeeded, data present.
    #[serde(rename = "OK")]
    Found,
    /// Lookup resolved negatively.
    #[serde(rename = "KO")]
    NotFound,
    /// Any status string this gateway does not understand.
    #[serde(other)]
    Unknown,
}

/// Backend answer to a [`Query`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(default)]
    pub data: Value,
}

impl Response {
    pub fn found(data: Value) -> Self {
        Self {
            status: Status::Found,
            data,
        }
    }

    pub fn not_found(data: Value) -> Self {
        Self {
            status: Status::NotFound,
            data,
        }
    }
}
