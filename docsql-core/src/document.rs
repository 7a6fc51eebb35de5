//! Document representation and identity stamping.
//!
//! A document is a caller-supplied JSON object plus four system-assigned
//! fields: `__id`, `__revision`, `__updated`, `__origin`. The payload is
//! modeled as a mapping from property name to [`serde_json::Value`], so
//! indexability is a single match over the value variant.

use chrono::Utc;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use uuid::Uuid;

use crate::error::{DocSqlError, DocSqlResult};

/// System field holding the document id.
pub const FIELD_ID: &str = "__id";
/// System field holding the write-instance revision tag.
pub const FIELD_REVISION: &str = "__revision";
/// System field holding the timestamp of this physical write.
pub const FIELD_UPDATED: &str = "__updated";
/// System field holding the timestamp of the id's first committed write.
pub const FIELD_ORIGIN: &str = "__origin";

const SYSTEM_FIELDS: [&str; 4] = [FIELD_ID, FIELD_REVISION, FIELD_UPDATED, FIELD_ORIGIN];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Whether a property name may be indexed (system fields never are).
pub fn is_indexable_property(name: &str) -> bool {
    !SYSTEM_FIELDS.contains(&name)
}

/// The canonical index-text encoding of a scalar, or `None` when the value
/// is not indexable (arrays, objects, non-integer numbers).
///
/// The same encoding is used when index entries are written and when filter
/// comparisons are compiled, so the two sides always agree: strings as-is,
/// integers in decimal, `true`/`false` as `"1"`/`"0"`, null as `""`.
pub(crate) fn index_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) => Some("0".to_string()),
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => number.as_i64().map(|n| n.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Whether a value lands in the per-property index (string, boolean,
/// integer, or null).
pub fn is_indexable_value(value: &Value) -> bool {
    match value {
        Value::Number(number) => number.as_i64().is_some(),
        Value::Null | Value::Bool(_) | Value::String(_) => true,
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// A document as seen by callers: payload plus system metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    id: String,
    revision: i64,
    updated: String,
    origin: String,
    payload: Map<String, Value>,
}

impl Document {
    /// Stamps a fresh document from a payload, stripping any system fields
    /// the caller smuggled in.
    pub(crate) fn stamp(
        id: String,
        revision: i64,
        updated: String,
        origin: String,
        mut payload: Map<String, Value>,
    ) -> Self {
        for field in SYSTEM_FIELDS {
            payload.remove(field);
        }
        Self { id, revision, updated, origin, payload }
    }

    /// Rebuilds a document from its stored JSON text.
    pub(crate) fn from_stored(text: &str) -> DocSqlResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut map) = value else {
            return Err(DocSqlError::Serialization(
                "stored document is not a JSON object".to_string(),
            ));
        };

        let id = take_string(&mut map, FIELD_ID)?;
        let revision = match map.remove(FIELD_REVISION) {
            Some(Value::Number(number)) if number.is_i64() => {
                number.as_i64().unwrap_or_default()
            }
            _ => {
                return Err(DocSqlError::Serialization(format!(
                    "stored document is missing {FIELD_REVISION}"
                )));
            }
        };
        let updated = take_string(&mut map, FIELD_UPDATED)?;
        let origin = take_string(&mut map, FIELD_ORIGIN)?;

        Ok(Self { id, revision, updated, origin, payload: map })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn revision(&self) -> i64 {
        self.revision
    }

    /// Timestamp of this physical write, as stored text.
    pub fn updated(&self) -> &str {
        &self.updated
    }

    /// Timestamp of the id's first committed write; stable across updates.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// A payload property by name.
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.payload.get(property)
    }

    /// The caller's payload, without system fields.
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// The full document as a JSON value: payload with the four system
    /// fields merged in. This is the shape serialized into the `obj` column.
    pub fn to_value(&self) -> Value {
        let mut map = self.payload.clone();
        map.insert(FIELD_ID.to_string(), Value::String(self.id.clone()));
        map.insert(FIELD_REVISION.to_string(), Value::from(self.revision));
        map.insert(FIELD_UPDATED.to_string(), Value::String(self.updated.clone()));
        map.insert(FIELD_ORIGIN.to_string(), Value::String(self.origin.clone()));
        Value::Object(map)
    }
}

fn take_string(map: &mut Map<String, Value>, field: &str) -> DocSqlResult<String> {
    match map.remove(field) {
        Some(Value::String(text)) => Ok(text),
        _ => Err(DocSqlError::Serialization(format!(
            "stored document is missing {field}"
        ))),
    }
}

/// Generates a fixed-width opaque id: SHA-256 over the current microsecond
/// timestamp and a random salt, truncated to a 40-char hex token.
pub(crate) fn generate_id() -> String {
    let mut hasher = Sha256::new();
    hasher.update(Utc::now().timestamp_micros().to_be_bytes());
    hasher.update(Uuid::new_v4().as_bytes());
    let digest = hasher.finalize();

    let mut token = String::with_capacity(40);
    for byte in digest.iter().take(20) {
        let _ = write!(token, "{byte:02x}");
    }
    token
}

/// Generates a random 7-digit revision tag. Not monotonic: it identifies a
/// write instance, it is not a logical clock.
pub(crate) fn generate_revision() -> i64 {
    let entropy = Uuid::new_v4().as_u128();
    1_000_000 + (entropy % 9_000_000) as i64
}

/// The current UTC time as microsecond-precision text whose lexical order
/// matches chronological order.
pub(crate) fn generate_timestamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}
