//! Raw query-result shapes as they come back from the graph store proxy.
//!
//! The store encodes identifiers inconsistently: plain numbers, strings, or
//! `{ "low": n, "high": 0 }` objects, under several field names for
//! relationship endpoints. Everything here is lenient: an element that cannot
//! be read is dropped from its collection, never fatal for the record.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::label::clean_labels;

/// Relationship start-endpoint fields, highest precedence first.
pub const START_KEYS: [&str; 3] = ["startNodeIdentity", "start", "source"];
/// Relationship end-endpoint fields, highest precedence first.
pub const END_KEYS: [&str; 3] = ["endNodeIdentity", "end", "target"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    End,
}

impl Endpoint {
    fn keys(self) -> &'static [&'static str; 3] {
        match self {
            Endpoint::Start => &START_KEYS,
            Endpoint::End => &END_KEYS,
        }
    }
}

/// One query response: the four collections the graph queries return.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default, deserialize_with = "lenient_elements")]
    pub players: Vec<RawGraphElement>,
    #[serde(default, deserialize_with = "lenient_elements")]
    pub events: Vec<RawGraphElement>,
    #[serde(default, deserialize_with = "lenient_elements")]
    pub entities: Vec<RawGraphElement>,
    #[serde(default, deserialize_with = "lenient_elements")]
    pub relationships: Vec<RawGraphElement>,
}

impl RawRecord {
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
            && self.events.is_empty()
            && self.entities.is_empty()
            && self.relationships.is_empty()
    }
}

/// A node or relationship from the graph store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGraphElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub rel_type: Option<Value>,
    /// Everything else, including the relationship endpoint fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RawGraphElement {
    /// Store-internal identity, normalized to a plain string.
    pub fn store_id(&self) -> Option<String> {
        self.identity.as_ref().and_then(normalize_store_id)
    }

    pub fn cleaned_labels(&self) -> Vec<String> {
        self.labels.as_deref().map(clean_labels).unwrap_or_default()
    }

    /// Resolve an endpoint by trying each known field in precedence order.
    pub fn endpoint(&self, side: Endpoint) -> Option<String> {
        side.keys()
            .iter()
            .find_map(|key| self.fields.get(*key).and_then(normalize_store_id))
    }

    /// Identity of a relationship: its store identity, else a plain `id` field.
    pub fn relationship_id(&self) -> Option<String> {
        self.store_id()
            .or_else(|| self.fields.get("id").and_then(normalize_store_id))
    }
}

fn lenient_elements<'de, D>(deserializer: D) -> Result<Vec<RawGraphElement>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Null => return Ok(Vec::new()),
        other => {
            debug!("Ignoring non-array element collection: {}", other);
            return Ok(Vec::new());
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<RawGraphElement>(item) {
            Ok(element) => Some(element),
            Err(e) => {
                debug!("Skipping unreadable graph element: {}", e);
                None
            }
        })
        .collect())
}

/// Normalize a store identifier (`{low}` object, number or string) to a string.
pub fn normalize_store_id(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map.get("low").and_then(normalize_store_id),
        Value::Number(_) => integral_text(value),
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn integral_text(value: &Value) -> Option<String> {
    if let Some(i) = value.as_i64() {
        return Some(i.to_string());
    }
    if let Some(u) = value.as_u64() {
        return Some(u.to_string());
    }
    value
        .as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0)
        .map(|f| format!("{}", f as i64))
}

/// Render a property value for display. Empty strings and nulls yield `None`.
pub fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => integral_text(value).or_else(|| Some(n.to_string())),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => map.get("low").and_then(display_value),
        _ => None,
    }
}

pub fn prop_text(props: &Map<String, Value>, key: &str) -> Option<String> {
    props.get(key).and_then(display_value)
}

/// First displayable value among `keys`.
pub fn first_text(props: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| prop_text(props, key))
}

pub fn prop_f64(props: &Map<String, Value>, key: &str) -> Option<f64> {
    fn as_number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Object(map) => map.get("low").and_then(as_number),
            _ => None,
        }
    }
    props.get(key).and_then(as_number)
}

pub fn prop_flag(props: &Map<String, Value>, key: &str) -> bool {
    match props.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_f64().map_or(false, |f| f != 0.0),
        _ => false,
    }
}
