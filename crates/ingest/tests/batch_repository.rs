use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ingest::{
    to_events, BatchEventRepository, BatchIngestionRequest, EventIngestionData, EventRepository,
    IngestError, IngestionStatus, IngestionUseCase, RepositoryError, EVENT_COLUMNS,
};
use storage::{
    Dialect, Driver, InsertStatement, MemoryDriver, PreparedStatement, Rows, StorageError,
    Transaction, Value,
};

#[derive(Default)]
struct Counters {
    begins: AtomicUsize,
    prepares: AtomicUsize,
    executes: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

/// Driver whose transactions fail on the `fail_on`-th execution (1-based).
struct CountingDriver {
    dialect: Dialect,
    fail_on: Option<usize>,
    counters: Arc<Counters>,
}

impl CountingDriver {
    fn new(dialect: Dialect, fail_on: Option<usize>) -> Self {
        Self {
            dialect,
            fail_on,
            counters: Arc::new(Counters::default()),
        }
    }
}

struct CountingTx {
    fail_on: Option<usize>,
    executed: usize,
    counters: Arc<Counters>,
}

#[async_trait]
impl Driver for CountingDriver {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>, StorageError> {
        self.counters.begins.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingTx {
            fail_on: self.fail_on,
            executed: 0,
            counters: Arc::clone(&self.counters),
        }))
    }

    async fn query(&self, _sql: &str, _args: &[Value]) -> Result<Rows, StorageError> {
        Ok(Rows::default())
    }
}

#[async_trait]
impl Transaction for CountingTx {
    async fn prepare(&mut self, stmt: &InsertStatement) -> Result<PreparedStatement, StorageError> {
        self.counters.prepares.fetch_add(1, Ordering::SeqCst);
        Ok(PreparedStatement::new(stmt.clone()))
    }

    async fn execute(
        &mut self,
        stmt: &PreparedStatement,
        args: &[Value],
    ) -> Result<(), StorageError> {
        stmt.check_arity(args)?;
        self.executed += 1;
        self.counters.executes.fetch_add(1, Ordering::SeqCst);
        if Some(self.executed) == self.fail_on {
            return Err(StorageError::Execute("connection reset".into()));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        self.counters.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn request(n: usize) -> BatchIngestionRequest {
    BatchIngestionRequest {
        tenant_id: "t1".into(),
        source_id: "s1".into(),
        topic: "top1".into(),
        events: (0..n)
            .map(|i| EventIngestionData {
                message_id: format!("m{}", i + 1),
                content: r#"{"a":1}"#.into(),
                event_type: "et1".into(),
                ..Default::default()
            })
            .collect(),
    }
}

#[tokio::test]
async fn failure_mid_batch_rolls_back_once_and_never_commits() {
    let driver = Arc::new(CountingDriver::new(Dialect::ClickHouse, Some(5)));
    let counters = Arc::clone(&driver.counters);
    let repo = BatchEventRepository::new(driver);

    let events = to_events(&request(10)).unwrap();
    let err = repo.batch_insert(&events).await.unwrap_err();

    match err {
        RepositoryError::EventCouldNotBeInserted {
            index, message_id, ..
        } => {
            assert_eq!(index, 4);
            assert_eq!(message_id, "m5");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(counters.begins.load(Ordering::SeqCst), 1);
    assert_eq!(counters.prepares.load(Ordering::SeqCst), 1);
    assert_eq!(counters.executes.load(Ordering::SeqCst), 5);
    assert_eq!(counters.rollbacks.load(Ordering::SeqCst), 1);
    assert_eq!(counters.commits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn successful_batch_commits_once() {
    let driver = Arc::new(CountingDriver::new(Dialect::ClickHouse, None));
    let counters = Arc::clone(&driver.counters);
    let repo = BatchEventRepository::new(driver);

    let events = to_events(&request(10)).unwrap();
    repo.batch_insert(&events).await.unwrap();

    assert_eq!(counters.executes.load(Ordering::SeqCst), 10);
    assert_eq!(counters.commits.load(Ordering::SeqCst), 1);
    assert_eq!(counters.rollbacks.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_batch_opens_no_transaction() {
    let driver = Arc::new(CountingDriver::new(Dialect::ClickHouse, None));
    let counters = Arc::clone(&driver.counters);
    let repo = BatchEventRepository::new(driver);

    repo.batch_insert(&[]).await.unwrap();
    assert_eq!(counters.begins.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn non_columnar_driver_is_rejected_before_begin() {
    let driver = Arc::new(CountingDriver::new(Dialect::Postgres, None));
    let counters = Arc::clone(&driver.counters);
    let repo = BatchEventRepository::new(driver);

    let events = to_events(&request(1)).unwrap();
    let err = repo.batch_insert(&events).await.unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::NotASupportedDriver {
            dialect: "postgres"
        }
    ));
    assert_eq!(counters.begins.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn end_to_end_batch_lands_in_memory_store() {
    let driver = Arc::new(MemoryDriver::new());
    let usecase = IngestionUseCase::new(Arc::new(BatchEventRepository::new(driver.clone())));

    let response = usecase.ingest_batch(&request(1)).await.unwrap();
    assert_eq!(response.status, IngestionStatus::Accepted);
    assert_eq!(response.ingested_count, 1);
    assert_eq!(response.failed_count, 0);

    let rows = driver.rows("events").unwrap();
    assert_eq!(rows.columns, EVENT_COLUMNS.map(String::from).to_vec());
    assert_eq!(rows.len(), 1);
    let size = EVENT_COLUMNS
        .iter()
        .position(|c| *c == "content_size_bytes")
        .unwrap();
    assert_eq!(rows.rows[0][size], Value::UInt(7));
}

#[tokio::test]
async fn failed_insert_commits_nothing() {
    let driver = Arc::new(CountingDriver::new(Dialect::ClickHouse, Some(2)));
    let counters = Arc::clone(&driver.counters);
    let usecase = IngestionUseCase::new(Arc::new(BatchEventRepository::new(driver)));

    let err = usecase.ingest_batch(&request(3)).await.unwrap_err();
    assert!(matches!(err, IngestError::EventCouldNotBeInserted { .. }));
    let response = err.into_failed_response().unwrap();
    assert_eq!(response.status, IngestionStatus::Failed);
    assert_eq!(response.failed_count, 3);
    assert_eq!(counters.commits.load(Ordering::SeqCst), 0);
}
