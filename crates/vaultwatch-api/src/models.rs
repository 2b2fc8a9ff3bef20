// Backend record types
//
// Raw shapes of access-log and environment records as stored by the
// device. Every field is optional and loosely typed: the firmware writes
// timestamps as ISO strings or epoch milliseconds and numbers sometimes
// arrive as strings. Normalization happens in `vaultwatch-core`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::Error;

// ── Records ──────────────────────────────────────────────────────────

/// One badge event as written by the door controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAccessLog {
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub uid: Option<Value>,
    #[serde(default)]
    pub porte: Option<String>,
    #[serde(default)]
    pub led: Option<String>,
    /// Catch-all for fields the firmware adds later.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One environmental sample.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEnvReading {
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub temp: Option<Value>,
    #[serde(default)]
    pub hum: Option<Value>,
    #[serde(default)]
    pub lum: Option<Value>,
    #[serde(default)]
    pub mq: Option<Value>,
    #[serde(default)]
    pub fire: Option<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

// ── Record sets ──────────────────────────────────────────────────────

/// A record together with its backend key (present for keyed stores).
#[derive(Debug, Clone, PartialEq)]
pub struct Keyed<T> {
    pub key: Option<String>,
    pub record: T,
}

/// The decoded content of one collection fetch.
///
/// `malformed` counts entries that were present but could not be decoded
/// as a record at all (e.g. a bare string where an object was expected).
#[derive(Debug, Clone)]
pub struct RecordSet<T> {
    pub records: Vec<Keyed<T>>,
    pub malformed: usize,
}

impl<T> Default for RecordSet<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            malformed: 0,
        }
    }
}

impl<T: DeserializeOwned> RecordSet<T> {
    /// Decode a keyed-document payload (Firebase style).
    ///
    /// - `null` -> empty (the path has never been written)
    /// - `{id: record, ...}` -> one record per key, in key order
    /// - `[record, null, record]` -> array form used for integer keys; holes skipped
    ///
    /// A scalar at the top level is a malformed payload, not an empty one.
    pub fn from_keyed(value: Value) -> Result<Self, Error> {
        let mut set = Self::default();
        match value {
            Value::Null => {}
            Value::Object(map) => {
                for (key, entry) in map {
                    set.push(Some(key), entry);
                }
            }
            Value::Array(items) => {
                for (idx, entry) in items.into_iter().enumerate() {
                    if !entry.is_null() {
                        set.push(Some(idx.to_string()), entry);
                    }
                }
            }
            other => return Err(unexpected_shape("a keyed collection", &other)),
        }
        Ok(set)
    }

    /// Decode a plain document payload (REST gateway style).
    ///
    /// - `null`, `{}` or `[]` -> empty
    /// - `[record, ...]` -> one record per element
    /// - `{...}` -> a single record
    pub fn from_document(value: Value) -> Result<Self, Error> {
        let mut set = Self::default();
        match value {
            Value::Null => {}
            Value::Array(items) => set.extend(items),
            Value::Object(ref map) if map.is_empty() => {}
            Value::Object(_) => set.push(None, value),
            other => return Err(unexpected_shape("an object or array", &other)),
        }
        Ok(set)
    }

    /// Decode a payload that must be an array of records.
    ///
    /// `null`, `{}` and `[]` are empty; any other object or a scalar is
    /// rejected.
    pub fn from_array(value: Value) -> Result<Self, Error> {
        let mut set = Self::default();
        match value {
            Value::Null => {}
            Value::Array(items) => set.extend(items),
            Value::Object(ref map) if map.is_empty() => {}
            other => return Err(unexpected_shape("an array", &other)),
        }
        Ok(set)
    }

    fn extend(&mut self, items: Vec<Value>) {
        for entry in items {
            self.push(None, entry);
        }
    }

    fn push(&mut self, key: Option<String>, entry: Value) {
        if !entry.is_object() {
            warn!(?key, kind = value_kind(&entry), "skipping non-object record");
            self.malformed += 1;
            return;
        }
        match serde_json::from_value::<T>(entry) {
            Ok(record) => self.records.push(Keyed { key, record }),
            Err(e) => {
                warn!(?key, error = %e, "skipping undecodable record");
                self.malformed += 1;
            }
        }
    }
}

impl<T> RecordSet<T> {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

fn unexpected_shape(expected: &str, value: &Value) -> Error {
    let kind = value_kind(value);
    warn!(kind, expected, "unexpected top-level payload");
    Error::Deserialization {
        message: format!("expected {expected}, got {kind}"),
        body: truncate_body(value.to_string()),
    }
}

fn truncate_body(mut body: String) -> String {
    const MAX: usize = 256;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn keyed_null_is_empty() {
        let set = RecordSet::<RawAccessLog>::from_keyed(Value::Null).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.malformed, 0);
    }

    #[test]
    fn keyed_object_keeps_keys() {
        let set = RecordSet::<RawAccessLog>::from_keyed(json!({
            "-Nx1": { "timestamp": "2025-05-01 10:00:00", "uid": "A1", "porte": "OUVERTE", "led": "VERTE" },
            "-Nx2": { "timestamp": "2025-05-01 10:01:00", "uid": "B2", "porte": "FERMEE", "led": "ROUGE" },
        }))
        .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.records[0].key.as_deref(), Some("-Nx1"));
        assert_eq!(set.records[1].record.porte.as_deref(), Some("FERMEE"));
    }

    #[test]
    fn keyed_array_skips_holes() {
        let set = RecordSet::<RawEnvReading>::from_keyed(json!([
            null,
            { "timestamp": "2025-05-01T10:00:00", "temp": 21.5 },
            { "timestamp": "2025-05-01T10:00:05", "temp": 21.6 },
        ]))
        .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.records[0].key.as_deref(), Some("1"));
        assert_eq!(set.malformed, 0);
    }

    #[test]
    fn keyed_scalar_is_rejected() {
        let err = RecordSet::<RawAccessLog>::from_keyed(json!("maintenance")).unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn document_object_is_single_record() {
        let set = RecordSet::<RawEnvReading>::from_document(json!({
            "timestamp": 1_714_557_600_000_i64, "temp": 22.0, "hum": 40, "lum": 300, "mq": 12, "fire": 0
        }))
        .unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.records[0].key.is_none());
    }

    #[test]
    fn document_empty_object_is_empty() {
        let set = RecordSet::<RawEnvReading>::from_document(json!({})).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn document_scalar_is_rejected() {
        let err = RecordSet::<RawEnvReading>::from_document(json!(42)).unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }));
    }

    #[test]
    fn array_payload_rejects_objects() {
        let err = RecordSet::<RawAccessLog>::from_array(json!({ "error": "database offline" }))
            .unwrap_err();
        match err {
            Error::Deserialization { message, body } => {
                assert_eq!(message, "expected an array, got object");
                assert!(body.contains("database offline"));
            }
            other => panic!("expected a deserialization error, got {other:?}"),
        }
    }

    #[test]
    fn array_payload_accepts_empty_forms() {
        for empty in [Value::Null, json!([]), json!({})] {
            let set = RecordSet::<RawAccessLog>::from_array(empty).unwrap();
            assert!(set.is_empty());
            assert_eq!(set.malformed, 0);
        }
    }

    #[test]
    fn non_object_entries_count_as_malformed() {
        let set = RecordSet::<RawAccessLog>::from_array(json!([
            "garbage",
            { "uid": "A1" },
        ]))
        .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.malformed, 1);
    }
}
