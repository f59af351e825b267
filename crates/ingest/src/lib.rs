//! Streamly Ingest Layer
//!
//! This is where events enter Streamly. A client posts a batch of events for
//! one tenant, source and topic; we check it, turn every item into an
//! [`Event`] row, and write the whole batch inside one transaction.
//!
//! ## What we do here
//!
//! - **Validate** - [`validate_request`] checks request fields, batch size
//!   (at most 5000 events) and every item, stopping at the first failure.
//! - **Transform** - [`to_events`] stamps each item with the current time,
//!   copies the request context in, and measures content size.
//! - **Insert** - [`BatchEventRepository`] prepares one statement and
//!   executes it per event. All or nothing.
//! - **Orchestrate** - [`IngestionUseCase::ingest_batch`] runs the three
//!   steps, performs the insert on a spawned task, and builds the response.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use ingest::{BatchEventRepository, BatchIngestionRequest, EventIngestionData, IngestionUseCase};
//! use storage::MemoryDriver;
//!
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let driver = Arc::new(MemoryDriver::new());
//! let usecase = IngestionUseCase::new(Arc::new(BatchEventRepository::new(driver.clone())));
//!
//! let request = BatchIngestionRequest {
//!     tenant_id: "t1".into(),
//!     source_id: "s1".into(),
//!     topic: "top1".into(),
//!     events: vec![EventIngestionData {
//!         message_id: "m1".into(),
//!         content: r#"{"a":1}"#.into(),
//!         event_type: "et1".into(),
//!         ..Default::default()
//!     }],
//! };
//!
//! let response = usecase.ingest_batch(&request).await.unwrap();
//! assert_eq!(response.ingested_count, 1);
//! assert_eq!(driver.row_count("events"), 1);
//! # });
//! ```

mod config;
mod error;
mod repository;
mod transform;
mod types;
mod usecase;
mod validate;

pub use crate::config::{ConfigError, IngestConfig};
pub use crate::error::{IngestError, RepositoryError, TransformError, ValidationError};
pub use crate::repository::{BatchEventRepository, EventRepository};
pub use crate::transform::to_events;
pub use crate::types::{
    BatchIngestionRequest, BatchIngestionResponse, Event, EventFailure, EventIngestionData,
    IngestionStatus, EVENT_COLUMNS, MAX_BATCH_SIZE,
};
pub use crate::usecase::IngestionUseCase;
pub use crate::validate::validate_request;
