//! Wire and storage types for batch ingestion.
//!
//! ```text
//! BatchIngestionRequest
//! ├── tenant_id / source_id / topic
//! └── events: Vec<EventIngestionData>   (1..=5000)
//!     ├── message_id
//!     ├── content (raw JSON text, kept verbatim)
//!     ├── headers: Option<HashMap>
//!     ├── frame_type: u8
//!     └── event_type
//!
//!         ↓ to_events()
//!
//! Event  (one row in the events table)
//! ```
//!
//! Event content is decoded through [`serde_json::value::RawValue`], so the
//! bytes stored for an event are exactly the bytes the client sent. A request
//! carrying `"content": {"a":1}` produces an event whose
//! `content_size == 7`.
use std::collections::HashMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storage::Value;

/// Hard ceiling on the number of events in a single batch.
pub const MAX_BATCH_SIZE: usize = 5000;

/// Column order of the events table. Placeholders are bound in this order.
pub const EVENT_COLUMNS: [&str; 11] = [
    "timestamp",
    "tenant_id",
    "message_id",
    "source_id",
    "topic",
    "content_raw",
    "content_json",
    "content_size_bytes",
    "headers",
    "frame_type",
    "event_type",
];

/// One ingested record, immutable once built by the transform step.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub tenant_id: String,
    pub message_id: String,
    pub source_id: String,
    pub topic: String,
    /// Content bytes exactly as received.
    pub content_raw: Bytes,
    /// Content as JSON text.
    pub content_json: String,
    /// Byte length of `content_json`.
    pub content_size: u32,
    pub headers: HashMap<String, String>,
    pub frame_type: u8,
    pub event_type: String,
}

impl Event {
    /// Positional arguments for one insert, in [`EVENT_COLUMNS`] order.
    pub fn to_row(&self) -> Vec<Value> {
        vec![
            Value::from(self.timestamp),
            Value::from(self.tenant_id.clone()),
            Value::from(self.message_id.clone()),
            Value::from(self.source_id.clone()),
            Value::from(self.topic.clone()),
            Value::from(self.content_raw.clone()),
            Value::from(self.content_json.clone()),
            Value::from(self.content_size),
            Value::from(self.headers.clone()),
            Value::from(self.frame_type),
            Value::from(self.event_type.clone()),
        ]
    }
}

/// Inbound batch of events for one tenant, source and topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchIngestionRequest {
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub events: Vec<EventIngestionData>,
}

/// A single event inside a [`BatchIngestionRequest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventIngestionData {
    #[serde(default)]
    pub message_id: String,
    /// Raw JSON text of the event body. Empty when the field was absent; a
    /// literal `null` is kept as `null`.
    #[serde(default, with = "raw_json")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub frame_type: u8,
    #[serde(default)]
    pub event_type: String,
}

/// Outcome of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionStatus {
    Accepted,
    Failed,
}

/// Response returned once per batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchIngestionResponse {
    pub status: IngestionStatus,
    pub ingested_count: usize,
    pub timestamp: DateTime<Utc>,
    pub batch_id: String,
    #[serde(default)]
    pub failed_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<EventFailure>,
}

/// Per-event failure detail attached to a failed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFailure {
    pub event_index: usize,
    pub message_id: String,
    pub error: String,
}

mod raw_json {
    use serde::de::Deserializer;
    use serde::ser::{Error as _, Serializer};
    use serde::{Deserialize, Serialize};
    use serde_json::value::RawValue;

    pub fn serialize<S>(content: &str, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if content.is_empty() {
            return serializer.serialize_none();
        }
        let raw = RawValue::from_string(content.to_owned()).map_err(S::Error::custom)?;
        raw.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        Ok(raw.get().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_kept_verbatim() {
        let body = r#"{"message_id":"m1","content":{"a":1},"event_type":"et1"}"#;
        let data: EventIngestionData = serde_json::from_str(body).unwrap();
        assert_eq!(data.content, r#"{"a":1}"#);
        assert!(data.headers.is_none());
        assert_eq!(data.frame_type, 0);

        let spaced = r#"{"message_id":"m1","content":{ "a" : 1 },"event_type":"et1"}"#;
        let data: EventIngestionData = serde_json::from_str(spaced).unwrap();
        assert_eq!(data.content, r#"{ "a" : 1 }"#);
    }

    #[test]
    fn missing_content_decodes_empty_and_null_stays_literal() {
        let data: EventIngestionData =
            serde_json::from_str(r#"{"message_id":"m1","event_type":"e"}"#).unwrap();
        assert!(data.content.is_empty());

        let data: EventIngestionData =
            serde_json::from_str(r#"{"message_id":"m1","content":null,"event_type":"e"}"#)
                .unwrap();
        assert_eq!(data.content, "null");
    }

    #[test]
    fn response_serializes_status_lowercase_and_hides_empty_failures() {
        let response = BatchIngestionResponse {
            status: IngestionStatus::Accepted,
            ingested_count: 1,
            timestamp: Utc::now(),
            batch_id: "b1".into(),
            failed_count: 0,
            failures: Vec::new(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "accepted");
        assert_eq!(json["failed_count"], 0);
        assert!(json.get("failures").is_none());
    }

    #[test]
    fn row_follows_column_order() {
        let event = Event {
            timestamp: Utc::now(),
            tenant_id: "t1".into(),
            message_id: "m1".into(),
            source_id: "s1".into(),
            topic: "top1".into(),
            content_raw: Bytes::from_static(b"{}"),
            content_json: "{}".into(),
            content_size: 2,
            headers: HashMap::new(),
            frame_type: 3,
            event_type: "et1".into(),
        };
        let row = event.to_row();
        assert_eq!(row.len(), EVENT_COLUMNS.len());
        assert_eq!(row[2], Value::from("m1"));
        assert_eq!(row[7], Value::UInt(2));
        assert_eq!(row[9], Value::UInt(3));
        assert_eq!(row[10], Value::from("et1"));
    }
}
