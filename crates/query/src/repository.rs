use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use storage::{Driver, StorageError};
use tracing::{debug, warn};

use crate::ast::QueryResponse;
use crate::ast_builder::CompiledQuery;

/// Runs compiled queries against a store.
#[async_trait]
pub trait QueryRepository: Send + Sync {
    async fn execute_query(
        &self,
        request_id: &str,
        query: &CompiledQuery,
    ) -> Result<QueryResponse, StorageError>;
}

/// [`QueryRepository`] over a storage [`Driver`]. Each row becomes a JSON
/// object keyed by column name.
#[derive(Clone)]
pub struct DriverQueryRepository {
    driver: Arc<dyn Driver>,
}

impl DriverQueryRepository {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl QueryRepository for DriverQueryRepository {
    async fn execute_query(
        &self,
        request_id: &str,
        query: &CompiledQuery,
    ) -> Result<QueryResponse, StorageError> {
        let start = Instant::now();
        let rows = self
            .driver
            .query(&query.sql, &query.args)
            .await
            .inspect_err(|err| warn!(request_id, error = %err, "query_execution_failed"))?;

        let data: Vec<serde_json::Map<String, serde_json::Value>> = rows
            .into_records()
            .into_iter()
            .map(|record| {
                record
                    .into_iter()
                    .map(|(column, value)| (column, value.to_json()))
                    .collect()
            })
            .collect();

        debug!(
            request_id,
            rows = data.len(),
            elapsed_micros = start.elapsed().as_micros(),
            "query_executed"
        );
        Ok(QueryResponse {
            request_id: request_id.to_string(),
            row_count: data.len(),
            data,
        })
    }
}
