use bytes::Bytes;
use chrono::Utc;

use crate::error::TransformError;
use crate::types::{BatchIngestionRequest, Event};

/// Build one [`Event`] per request item.
///
/// Tenant, source and topic come from the request; everything else from the
/// item. Every event is stamped with the current time and missing headers
/// become an empty map. Expects a request that already passed
/// [`validate_request`](crate::validate_request).
pub fn to_events(request: &BatchIngestionRequest) -> Result<Vec<Event>, TransformError> {
    request
        .events
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let content_size = content_size(index, item.content.len())?;
            Ok(Event {
                timestamp: Utc::now(),
                tenant_id: request.tenant_id.clone(),
                message_id: item.message_id.clone(),
                source_id: request.source_id.clone(),
                topic: request.topic.clone(),
                content_raw: Bytes::copy_from_slice(item.content.as_bytes()),
                content_json: item.content.clone(),
                content_size,
                headers: item.headers.clone().unwrap_or_default(),
                frame_type: item.frame_type,
                event_type: item.event_type.clone(),
            })
        })
        .collect()
}

/// Convert a content length to the 32-bit size column.
pub(crate) fn content_size(index: usize, len: usize) -> Result<u32, TransformError> {
    u32::try_from(len).map_err(|_| TransformError::EventTooLarge {
        index,
        size: len,
        max: u32::MAX,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::types::EventIngestionData;

    fn request() -> BatchIngestionRequest {
        let mut headers = HashMap::new();
        headers.insert("trace".to_string(), "abc".to_string());
        BatchIngestionRequest {
            tenant_id: "t1".into(),
            source_id: "s1".into(),
            topic: "top1".into(),
            events: vec![
                EventIngestionData {
                    message_id: "m1".into(),
                    content: r#"{"a":1}"#.into(),
                    headers: None,
                    frame_type: 2,
                    event_type: "et1".into(),
                },
                EventIngestionData {
                    message_id: "m2".into(),
                    content: "[1,2]".into(),
                    headers: Some(headers),
                    frame_type: 0,
                    event_type: "et2".into(),
                },
            ],
        }
    }

    #[test]
    fn copies_request_and_item_fields() {
        let events = to_events(&request()).unwrap();
        assert_eq!(events.len(), 2);

        let first = &events[0];
        assert_eq!(first.tenant_id, "t1");
        assert_eq!(first.source_id, "s1");
        assert_eq!(first.topic, "top1");
        assert_eq!(first.message_id, "m1");
        assert_eq!(first.frame_type, 2);
        assert_eq!(first.content_json, r#"{"a":1}"#);
        assert_eq!(first.content_raw.as_ref(), br#"{"a":1}"#);
        assert_eq!(first.content_size, 7);
        assert!(first.headers.is_empty());

        assert_eq!(events[1].headers.get("trace").map(String::as_str), Some("abc"));
        assert_eq!(events[1].event_type, "et2");
    }

    #[test]
    fn content_size_matches_json_length() {
        for event in to_events(&request()).unwrap() {
            assert_eq!(event.content_size as usize, event.content_json.len());
        }
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn content_larger_than_u32_is_rejected() {
        let too_big = u32::MAX as usize + 1;
        assert_eq!(
            content_size(4, too_big),
            Err(TransformError::EventTooLarge {
                index: 4,
                size: too_big,
                max: u32::MAX
            })
        );
        assert_eq!(content_size(0, u32::MAX as usize), Ok(u32::MAX));
    }
}
