use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{info, warn, Instrument, Level};
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::error::{IngestError, RepositoryError};
use crate::repository::EventRepository;
use crate::transform::to_events;
use crate::types::{
    BatchIngestionRequest, BatchIngestionResponse, EventFailure, IngestionStatus, MAX_BATCH_SIZE,
};
use crate::validate::validate_request;

/// Orchestrates validate → transform → insert for one batch.
#[derive(Clone)]
pub struct IngestionUseCase {
    repository: Arc<dyn EventRepository>,
    config: IngestConfig,
}

impl IngestionUseCase {
    pub fn new(repository: Arc<dyn EventRepository>) -> Self {
        Self::with_config(repository, IngestConfig::default())
    }

    /// `max_batch_size` is clamped to [`MAX_BATCH_SIZE`].
    pub fn with_config(repository: Arc<dyn EventRepository>, mut config: IngestConfig) -> Self {
        if config.max_batch_size > MAX_BATCH_SIZE {
            warn!(
                requested = config.max_batch_size,
                limit = MAX_BATCH_SIZE,
                "ingest_batch_limit_clamped"
            );
            config.max_batch_size = MAX_BATCH_SIZE;
        }
        Self { repository, config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingest one batch.
    ///
    /// The insert runs on a spawned task and this call waits for it, so there
    /// is exactly one insert in flight per batch. Dropping this future aborts
    /// the task, and its open transaction is rolled back. Validation and transform
    /// failures return no response; insert failures return a `failed`
    /// response inside the error.
    pub async fn ingest_batch(
        &self,
        request: &BatchIngestionRequest,
    ) -> Result<BatchIngestionResponse, IngestError> {
        let start = Instant::now();
        let span = tracing::span!(
            Level::INFO,
            "ingest.ingest_batch",
            tenant_id = %request.tenant_id,
            source_id = %request.source_id,
            topic = %request.topic,
            events = request.events.len()
        );

        async {
            if let Err(err) = validate_request(request, &self.config) {
                warn!(error = %err, elapsed_micros = start.elapsed().as_micros(), "ingest_batch_invalid");
                return Err(IngestError::from(err));
            }

            let events = to_events(request).inspect_err(|err| {
                warn!(error = %err, "ingest_batch_transform_failed");
            })?;
            let count = events.len();

            let repository = Arc::clone(&self.repository);
            let mut insert = AbortOnDrop(tokio::spawn(
                async move { repository.batch_insert(&events).await }.in_current_span(),
            ));

            match (&mut insert.0).await {
                Ok(Ok(())) => {
                    let response = BatchIngestionResponse {
                        status: IngestionStatus::Accepted,
                        ingested_count: count,
                        timestamp: Utc::now(),
                        batch_id: Uuid::new_v4().to_string(),
                        failed_count: 0,
                        failures: Vec::new(),
                    };
                    info!(
                        batch_id = %response.batch_id,
                        ingested = count,
                        elapsed_micros = start.elapsed().as_micros(),
                        "ingest_batch_success"
                    );
                    Ok(response)
                }
                Ok(Err(source)) => {
                    let response = failed_response(count, failures_for(&source));
                    warn!(
                        batch_id = %response.batch_id,
                        error = %source,
                        elapsed_micros = start.elapsed().as_micros(),
                        "ingest_batch_insert_failed"
                    );
                    Err(IngestError::EventCouldNotBeInserted {
                        response: Box::new(response),
                        source,
                    })
                }
                Err(join_err) => {
                    let response = failed_response(count, Vec::new());
                    warn!(
                        batch_id = %response.batch_id,
                        error = %join_err,
                        "ingest_batch_task_failed"
                    );
                    Err(IngestError::InsertTask {
                        response: Box::new(response),
                        reason: join_err.to_string(),
                    })
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// Aborts the insert task if the caller stops waiting for it.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn failed_response(count: usize, failures: Vec<EventFailure>) -> BatchIngestionResponse {
    BatchIngestionResponse {
        status: IngestionStatus::Failed,
        ingested_count: 0,
        timestamp: Utc::now(),
        batch_id: Uuid::new_v4().to_string(),
        failed_count: count,
        failures,
    }
}

fn failures_for(err: &RepositoryError) -> Vec<EventFailure> {
    match err {
        RepositoryError::EventCouldNotBeInserted {
            index,
            message_id,
            source,
        } => vec![EventFailure {
            event_index: *index,
            message_id: message_id.clone(),
            error: source.to_string(),
        }],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use storage::StorageError;

    use super::*;
    use crate::types::{Event, EventIngestionData};

    #[derive(Default)]
    struct RecordingRepository {
        calls: AtomicUsize,
        inserted: Mutex<Vec<String>>,
        fail_at: Option<usize>,
    }

    #[async_trait]
    impl EventRepository for RecordingRepository {
        async fn batch_insert(&self, events: &[Event]) -> Result<(), RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(index) = self.fail_at {
                return Err(RepositoryError::EventCouldNotBeInserted {
                    index,
                    message_id: events[index].message_id.clone(),
                    source: StorageError::Execute("disk full".into()),
                });
            }
            let mut inserted = self.inserted.lock().unwrap();
            inserted.extend(events.iter().map(|e| e.message_id.clone()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct SlowRepository {
        committed: AtomicUsize,
    }

    #[async_trait]
    impl EventRepository for SlowRepository {
        async fn batch_insert(&self, events: &[Event]) -> Result<(), RepositoryError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.committed.fetch_add(events.len(), Ordering::SeqCst);
            Ok(())
        }
    }

    struct PanickingRepository;

    #[async_trait]
    impl EventRepository for PanickingRepository {
        async fn batch_insert(&self, _events: &[Event]) -> Result<(), RepositoryError> {
            panic!("driver blew up");
        }
    }

    fn request(n: usize) -> BatchIngestionRequest {
        BatchIngestionRequest {
            tenant_id: "t1".into(),
            source_id: "s1".into(),
            topic: "top1".into(),
            events: (0..n)
                .map(|i| EventIngestionData {
                    message_id: format!("m{i}"),
                    content: r#"{"a":1}"#.into(),
                    headers: None,
                    frame_type: 0,
                    event_type: "et1".into(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn accepted_batch_reports_counts() {
        let repo = Arc::new(RecordingRepository::default());
        let uc = IngestionUseCase::new(repo.clone());

        let response = uc.ingest_batch(&request(3)).await.unwrap();
        assert_eq!(response.status, IngestionStatus::Accepted);
        assert_eq!(response.ingested_count, 3);
        assert_eq!(response.failed_count, 0);
        assert!(Uuid::parse_str(&response.batch_id).is_ok());
        assert_eq!(
            *repo.inserted.lock().unwrap(),
            vec!["m0".to_string(), "m1".to_string(), "m2".to_string()]
        );
    }

    #[tokio::test]
    async fn oversized_batch_never_reaches_repository() {
        let repo = Arc::new(RecordingRepository::default());
        let uc = IngestionUseCase::new(repo.clone());

        let err = uc.ingest_batch(&request(5001)).await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::EventValidationFailed(crate::ValidationError::BatchSizeExceeded { .. })
        ));
        assert!(err.response().is_none());
        assert_eq!(repo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn insert_failure_returns_failed_response() {
        let repo = Arc::new(RecordingRepository {
            fail_at: Some(1),
            ..Default::default()
        });
        let uc = IngestionUseCase::new(repo);

        let err = uc.ingest_batch(&request(4)).await.unwrap_err();
        assert_eq!(err.http_status_code(), 503);

        let response = err.response().unwrap();
        assert_eq!(response.status, IngestionStatus::Failed);
        assert_eq!(response.ingested_count, 0);
        assert_eq!(response.failed_count, 4);
        assert_eq!(response.failures.len(), 1);
        assert_eq!(response.failures[0].event_index, 1);
        assert_eq!(response.failures[0].message_id, "m1");
    }

    #[tokio::test]
    async fn panicking_insert_task_is_reported() {
        let uc = IngestionUseCase::new(Arc::new(PanickingRepository));

        let err = uc.ingest_batch(&request(2)).await.unwrap_err();
        assert!(matches!(err, IngestError::InsertTask { .. }));
        assert_eq!(err.response().map(|r| r.failed_count), Some(2));
    }

    #[tokio::test]
    async fn lowered_batch_limit_is_enforced() {
        let repo = Arc::new(RecordingRepository::default());
        let cfg = IngestConfig {
            max_batch_size: 2,
            ..IngestConfig::default()
        };
        let uc = IngestionUseCase::with_config(repo, cfg);

        let err = uc.ingest_batch(&request(3)).await.unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn cancelled_batch_never_commits() {
        let repo = Arc::new(SlowRepository::default());
        let uc = IngestionUseCase::new(repo.clone());

        let outcome =
            tokio::time::timeout(Duration::from_millis(20), uc.ingest_batch(&request(1))).await;
        assert!(outcome.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(repo.committed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn batch_limit_above_ceiling_is_clamped() {
        let repo = Arc::new(RecordingRepository::default());
        let cfg = IngestConfig {
            max_batch_size: 6000,
            ..IngestConfig::default()
        };
        let uc = IngestionUseCase::with_config(repo.clone(), cfg);
        assert_eq!(uc.config().max_batch_size, MAX_BATCH_SIZE);

        let err = uc.ingest_batch(&request(5001)).await.unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(repo.calls.load(Ordering::SeqCst), 0);
    }
}
