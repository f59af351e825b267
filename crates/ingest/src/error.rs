//! Error types produced by the ingest crate.
//!
//! Each pipeline stage has its own error enum, and [`IngestError`] tags which
//! stage failed. Callers (the HTTP layer in particular) match on the variants;
//! message text is for humans only.
//!
//! # HTTP Status Code Mapping
//!
//! | Error | Status |
//! |-------|--------|
//! | [`IngestError::EventValidationFailed`] | 400 |
//! | [`IngestError::EventTransformFailed`] | 413 |
//! | [`IngestError::EventCouldNotBeInserted`] | 503 |
//! | [`IngestError::InsertTask`] | 500 |
//!
//! ```rust
//! use ingest::{IngestError, ValidationError};
//!
//! let err = IngestError::from(ValidationError::TenantIdMissing);
//! assert_eq!(err.http_status_code(), 400);
//! assert!(err.response().is_none());
//! ```
use storage::StorageError;
use thiserror::Error;

use crate::types::BatchIngestionResponse;

/// Structural problems with an inbound batch.
///
/// Checks run in a fixed order and stop at the first failure, so an error
/// always points at the earliest offending field or item.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("tenant_id is required")]
    TenantIdMissing,

    #[error("source_id is required")]
    SourceIdMissing,

    #[error("topic is required")]
    TopicMissing,

    #[error("events cannot be empty")]
    EmptyBatch,

    /// More events than the configured batch limit.
    #[error("batch size cannot exceed {limit} events, got {actual}")]
    BatchSizeExceeded { limit: usize, actual: usize },

    #[error("events[{index}]: message_id is required")]
    MessageIdMissing { index: usize },

    #[error("events[{index}]: event_type is required")]
    EventTypeMissing { index: usize },

    #[error("events[{index}]: content cannot be empty")]
    ContentEmpty { index: usize },

    /// Content is present but is not syntactically valid JSON.
    #[error("events[{index}]: content must be valid JSON: {reason}")]
    ValidationFailed { index: usize, reason: String },
}

impl ValidationError {
    /// Index of the offending event for item-level failures.
    pub fn event_index(&self) -> Option<usize> {
        match self {
            ValidationError::MessageIdMissing { index }
            | ValidationError::EventTypeMissing { index }
            | ValidationError::ContentEmpty { index }
            | ValidationError::ValidationFailed { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Failures while turning request items into [`Event`](crate::Event)s.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransformError {
    /// Content length does not fit the 32-bit size column.
    #[error("events[{index}]: content of {size} bytes exceeds the maximum of {max} bytes")]
    EventTooLarge { index: usize, size: usize, max: u32 },
}

/// Failures from the batch repository. Nothing is committed when one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RepositoryError {
    /// The driver does not speak a columnar dialect. Raised before a transaction is opened.
    #[error("{dialect} is not a supported driver for batch inserts")]
    NotASupportedDriver { dialect: &'static str },

    /// One statement execution failed; the transaction was rolled back.
    #[error("event {index} ({message_id}) could not be inserted: {source}")]
    EventCouldNotBeInserted {
        index: usize,
        message_id: String,
        #[source]
        source: StorageError,
    },

    /// Begin, prepare or commit failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors returned by [`IngestionUseCase::ingest_batch`](crate::IngestionUseCase::ingest_batch).
///
/// Insert failures carry the `failed` response so the caller can return both.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum IngestError {
    #[error("event could not be validated: {0}")]
    EventValidationFailed(#[from] ValidationError),

    #[error("event could not be transformed: {0}")]
    EventTransformFailed(#[from] TransformError),

    #[error("event could not be inserted: {source}")]
    EventCouldNotBeInserted {
        response: Box<BatchIngestionResponse>,
        #[source]
        source: RepositoryError,
    },

    /// The background insert task panicked or was cancelled.
    #[error("insert task did not complete: {reason}")]
    InsertTask {
        response: Box<BatchIngestionResponse>,
        reason: String,
    },
}

impl IngestError {
    /// The failed-batch response, present once events reached the insert stage.
    pub fn response(&self) -> Option<&BatchIngestionResponse> {
        match self {
            IngestError::EventCouldNotBeInserted { response, .. }
            | IngestError::InsertTask { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn into_failed_response(self) -> Option<BatchIngestionResponse> {
        match self {
            IngestError::EventCouldNotBeInserted { response, .. }
            | IngestError::InsertTask { response, .. } => Some(*response),
            _ => None,
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            IngestError::EventValidationFailed(_) => 400,
            IngestError::EventTransformFailed(_) => 413,
            IngestError::EventCouldNotBeInserted { .. } => 503,
            IngestError::InsertTask { .. } => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_name_the_event() {
        let err = ValidationError::MessageIdMissing { index: 1 };
        assert_eq!(err.to_string(), "events[1]: message_id is required");
        assert_eq!(err.event_index(), Some(1));
        assert_eq!(ValidationError::TopicMissing.event_index(), None);
    }

    #[test]
    fn stage_tag_prefixes_the_cause() {
        let err = IngestError::from(ValidationError::EmptyBatch);
        assert_eq!(
            err.to_string(),
            "event could not be validated: events cannot be empty"
        );
        assert!(err.is_client_error());

        let err = IngestError::from(TransformError::EventTooLarge {
            index: 0,
            size: 1,
            max: 0,
        });
        assert_eq!(err.http_status_code(), 413);
    }
}
