use serde::de::IgnoredAny;

use crate::config::IngestConfig;
use crate::error::ValidationError;
use crate::types::{BatchIngestionRequest, EventIngestionData};

/// Check the structural invariants of a batch.
///
/// Request-level fields are checked first (tenant, source, topic, batch size),
/// then each event in order. The first failing check wins.
pub fn validate_request(
    request: &BatchIngestionRequest,
    cfg: &IngestConfig,
) -> Result<(), ValidationError> {
    if request.tenant_id.is_empty() {
        return Err(ValidationError::TenantIdMissing);
    }
    if request.source_id.is_empty() {
        return Err(ValidationError::SourceIdMissing);
    }
    if request.topic.is_empty() {
        return Err(ValidationError::TopicMissing);
    }
    if request.events.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }
    if request.events.len() > cfg.max_batch_size {
        return Err(ValidationError::BatchSizeExceeded {
            limit: cfg.max_batch_size,
            actual: request.events.len(),
        });
    }

    request
        .events
        .iter()
        .enumerate()
        .try_for_each(|(index, event)| validate_event(index, event))
}

fn validate_event(index: usize, event: &EventIngestionData) -> Result<(), ValidationError> {
    if event.message_id.is_empty() {
        return Err(ValidationError::MessageIdMissing { index });
    }
    if event.event_type.is_empty() {
        return Err(ValidationError::EventTypeMissing { index });
    }
    if event.content.is_empty() {
        return Err(ValidationError::ContentEmpty { index });
    }
    serde_json::from_str::<IgnoredAny>(&event.content).map_err(|err| {
        ValidationError::ValidationFailed {
            index,
            reason: err.to_string(),
        }
    })?;
    Ok(())
}
