use std::sync::Arc;

use async_trait::async_trait;
use storage::{Driver, InsertStatement, Transaction};
use tracing::{debug, warn};

use crate::error::RepositoryError;
use crate::types::{Event, EVENT_COLUMNS};

/// Persists transformed events.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Insert `events` atomically. An empty slice is a no-op.
    async fn batch_insert(&self, events: &[Event]) -> Result<(), RepositoryError>;
}

/// [`EventRepository`] over a columnar [`Driver`].
///
/// One transaction per batch, one prepared insert, one execution per event
/// in list order. Any failure rolls the whole batch back.
pub struct BatchEventRepository {
    driver: Arc<dyn Driver>,
    statement: InsertStatement,
}

impl BatchEventRepository {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self::with_table(driver, "events")
    }

    pub fn with_table(driver: Arc<dyn Driver>, table: impl Into<String>) -> Self {
        Self {
            driver,
            statement: InsertStatement::new(table, EVENT_COLUMNS),
        }
    }

    pub fn statement(&self) -> &InsertStatement {
        &self.statement
    }

    async fn insert_all(
        &self,
        tx: &mut dyn Transaction,
        events: &[Event],
    ) -> Result<(), RepositoryError> {
        let prepared = tx.prepare(&self.statement).await?;
        for (index, event) in events.iter().enumerate() {
            tx.execute(&prepared, &event.to_row())
                .await
                .map_err(|source| RepositoryError::EventCouldNotBeInserted {
                    index,
                    message_id: event.message_id.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}

#[async_trait]
impl EventRepository for BatchEventRepository {
    async fn batch_insert(&self, events: &[Event]) -> Result<(), RepositoryError> {
        if events.is_empty() {
            return Ok(());
        }

        let dialect = self.driver.dialect();
        if !dialect.is_columnar() {
            return Err(RepositoryError::NotASupportedDriver {
                dialect: dialect.name(),
            });
        }

        // A dropped transaction discards its work, so an early return or a
        // cancelled future can never commit a partial batch.
        let mut tx = self.driver.begin().await?;

        if let Err(err) = self.insert_all(tx.as_mut(), events).await {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "batch_rollback_failed");
            }
            return Err(err);
        }

        tx.commit().await?;
        debug!(
            table = %self.statement.table(),
            rows = events.len(),
            "batch_insert_committed"
        );
        Ok(())
    }
}
