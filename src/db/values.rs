//! JSON ⇄ SQL value conversion.
//!
//! Bind parameters arrive as JSON (from the message payload or params
//! object) and result cells leave as JSON (into the message payload). BLOB
//! cells are encoded as base64 strings, matching how the result payload is
//! transported through the host framework.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use serde_json::Value as JsonValue;

/// A JSON value usable as a bind parameter.
///
/// Booleans become integers (the engine has no boolean type), numbers map to
/// INTEGER or REAL, and any structured JSON is bound as its serialized text.
pub struct BindValue<'a>(pub &'a JsonValue);

impl ToSql for BindValue<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            JsonValue::Null => ToSqlOutput::Owned(Value::Null),
            JsonValue::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ToSqlOutput::Owned(Value::Integer(i))
                } else {
                    ToSqlOutput::Owned(Value::Real(n.as_f64().unwrap_or(0.0)))
                }
            }
            JsonValue::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            other => ToSqlOutput::Owned(Value::Text(other.to_string())),
        })
    }
}

/// Convert one result cell into JSON.
pub fn cell_to_json(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(i) => JsonValue::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Text(bytes) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => JsonValue::String(STANDARD.encode(bytes)),
    }
}
