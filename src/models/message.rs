//! The inbound/outbound message envelope.
//!
//! The host framework delivers a message carrying at least a `topic` (the
//! query text in free-text mode) and hands the same message back to the
//! caller with `payload` replaced by the result: an ordered array of row
//! objects for row-returning queries, an empty array for mutating and batch
//! statements.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One result row: column name to JSON cell value, in engine column order
/// for iteration purposes (serde_json maps preserve insertion order only
/// with the `preserve_order` feature; consumers index by name).
pub type Row = serde_json::Map<String, JsonValue>;

/// A message as delivered by (and returned to) the host framework.
///
/// Unknown fields are carried through untouched so the host can round-trip
/// its own metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    /// Query text in free-text and batch modes. Kept as a raw JSON value so
    /// the router can distinguish absent, non-string, and empty cases.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<JsonValue>,

    /// Inbound: optional positional bind values (array). Outbound: the
    /// result rows, or an empty array for mutating/batch statements.
    #[serde(default)]
    pub payload: JsonValue,

    /// Parameter object for prepared mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<JsonValue>,

    /// Path of a native extension to load into the handle before executing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    /// Host metadata we do not interpret.
    #[serde(flatten)]
    pub rest: serde_json::Map<String, JsonValue>,
}

impl Message {
    /// Create a message with the given query text as its topic.
    pub fn with_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: Some(JsonValue::String(topic.into())),
            ..Self::default()
        }
    }

    /// Set the positional bind payload.
    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload = payload;
        self
    }

    /// Set the prepared-mode parameter object.
    pub fn with_params(mut self, params: JsonValue) -> Self {
        self.params = Some(params);
        self
    }

    /// Set the extension path to load before executing.
    pub fn with_extension(mut self, path: impl Into<String>) -> Self {
        self.extension = Some(path.into());
        self
    }

    /// The topic as a string, if it is one.
    pub fn topic_str(&self) -> Option<&str> {
        match &self.topic {
            Some(JsonValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Replace the payload with result rows.
    pub(crate) fn into_result(mut self, rows: Vec<Row>) -> Self {
        self.payload = JsonValue::Array(rows.into_iter().map(JsonValue::Object).collect());
        self
    }
}
