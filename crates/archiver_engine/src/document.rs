use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::{json, Map, Value};

use crate::CloudError;

/// Most writes one document-store commit may carry.
pub const MAX_BATCH_WRITES: usize = 500;

/// Creation of one new document at a collection/document path such as
/// `acme/general/messages/<id>`.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentWrite {
    pub path: String,
    pub fields: Map<String, Value>,
}

/// A hierarchical document store with atomic batched writes.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Applies every write or none of them. Callers keep batches at or under
    /// [`MAX_BATCH_WRITES`].
    async fn commit(&self, writes: Vec<DocumentWrite>) -> Result<(), CloudError>;
}

/// Random 20-character alphanumeric id, the shape auto-generated document
/// ids take.
pub fn new_document_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect()
}

/// Encodes a message record as typed document fields.
///
/// Non-object records are stored under a single `value` field.
pub fn encode_fields(message: &Value) -> Map<String, Value> {
    match message {
        Value::Object(object) => object
            .iter()
            .map(|(key, value)| (key.clone(), encode_value(value)))
            .collect(),
        other => {
            let mut fields = Map::new();
            fields.insert("value".to_string(), encode_value(other));
            fields
        }
    }
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else if let Some(u) = n.as_u64() {
                // Past the 64-bit signed range of integerValue; a double would round it.
                json!({ "stringValue": u.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64().unwrap_or(f64::NAN) })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(_) => json!({ "mapValue": { "fields": encode_fields(value) } }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_ids_are_twenty_alphanumerics() {
        let id = new_document_id();
        assert_eq!(id.len(), 20);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, new_document_id());
    }

    #[test]
    fn scalar_and_nested_values_are_typed() {
        let fields = encode_fields(&json!({
            "user": null,
            "ts": "1700000000.000100",
            "reply_count": 3,
            "score": 1.5,
            "hidden": false,
            "reactions": [{ "name": "tada", "count": 2 }],
        }));
        assert_eq!(fields["user"], json!({ "nullValue": null }));
        assert_eq!(fields["ts"], json!({ "stringValue": "1700000000.000100" }));
        assert_eq!(fields["reply_count"], json!({ "integerValue": "3" }));
        assert_eq!(fields["score"], json!({ "doubleValue": 1.5 }));
        assert_eq!(fields["hidden"], json!({ "booleanValue": false }));
        assert_eq!(
            fields["reactions"],
            json!({ "arrayValue": { "values": [
                { "mapValue": { "fields": {
                    "name": { "stringValue": "tada" },
                    "count": { "integerValue": "2" }
                } } }
            ] } })
        );
    }

    #[test]
    fn unsigned_values_past_signed_range_keep_every_digit() {
        let fields = encode_fields(&json!({ "big": u64::MAX, "edge": i64::MAX }));
        assert_eq!(fields["big"], json!({ "stringValue": "18446744073709551615" }));
        assert_eq!(fields["edge"], json!({ "integerValue": "9223372036854775807" }));
    }

    #[test]
    fn non_object_record_is_wrapped() {
        let fields = encode_fields(&json!("plain"));
        assert_eq!(fields["value"], json!({ "stringValue": "plain" }));
    }
}
