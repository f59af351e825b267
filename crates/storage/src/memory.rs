use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    Dialect, Driver, InsertStatement, PreparedStatement, Rows, StorageError, Transaction, Value,
};

#[derive(Debug, Default)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

type Tables = Arc<RwLock<HashMap<String, Table>>>;

/// An in-process columnar store.
///
/// Tables are created on first commit using the column list of the insert
/// statement. Read queries are not evaluated; [`Driver::query`] returns
/// [`StorageError::Unsupported`].
#[derive(Debug, Clone)]
pub struct MemoryDriver {
    dialect: Dialect,
    tables: Tables,
}

impl MemoryDriver {
    /// A driver that reports the ClickHouse dialect.
    pub fn new() -> Self {
        Self::with_dialect(Dialect::ClickHouse)
    }

    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            tables: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of committed rows in `table` (zero when the table does not exist).
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .map(|tables| tables.get(table).map_or(0, |t| t.rows.len()))
            .unwrap_or(0)
    }

    /// Snapshot of the committed rows in `table`.
    pub fn rows(&self, table: &str) -> Result<Rows, StorageError> {
        let tables = self.tables.read().map_err(|_| StorageError::Poisoned)?;
        Ok(tables
            .get(table)
            .map(|t| Rows {
                columns: t.columns.clone(),
                rows: t.rows.clone(),
            })
            .unwrap_or_default())
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>, StorageError> {
        Ok(Box::new(MemoryTransaction {
            tables: Arc::clone(&self.tables),
            staged: Vec::new(),
            finished: false,
        }))
    }

    async fn query(&self, _sql: &str, _args: &[Value]) -> Result<Rows, StorageError> {
        Err(StorageError::Unsupported {
            driver: "memory",
            operation: "query",
        })
    }
}

struct MemoryTransaction {
    tables: Tables,
    staged: Vec<(InsertStatement, Vec<Value>)>,
    finished: bool,
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn prepare(&mut self, stmt: &InsertStatement) -> Result<PreparedStatement, StorageError> {
        if stmt.table().is_empty() {
            return Err(StorageError::Prepare("table name is empty".into()));
        }
        if stmt.columns().is_empty() {
            return Err(StorageError::Prepare("statement has no columns".into()));
        }
        Ok(PreparedStatement::new(stmt.clone()))
    }

    async fn execute(
        &mut self,
        stmt: &PreparedStatement,
        args: &[Value],
    ) -> Result<(), StorageError> {
        stmt.check_arity(args)?;
        self.staged.push((stmt.statement().clone(), args.to_vec()));
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StorageError> {
        let staged = std::mem::take(&mut self.staged);
        self.finished = true;

        let mut tables = self.tables.write().map_err(|_| StorageError::Poisoned)?;

        // Check every target table before touching any of them so a bad row
        // cannot leave an earlier one applied.
        for (stmt, _) in &staged {
            if let Some(table) = tables.get(stmt.table()) {
                if table.columns != stmt.columns() {
                    return Err(StorageError::SchemaMismatch {
                        table: stmt.table().to_string(),
                    });
                }
            }
        }

        let applied = staged.len();
        for (stmt, row) in staged {
            let table = tables
                .entry(stmt.table().to_string())
                .or_insert_with(|| Table {
                    columns: stmt.columns().to_vec(),
                    rows: Vec::new(),
                });
            table.rows.push(row);
        }
        debug!(rows = applied, "memory_commit");
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), StorageError> {
        let discarded = self.staged.len();
        self.staged.clear();
        self.finished = true;
        debug!(rows = discarded, "memory_rollback");
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if !self.finished && !self.staged.is_empty() {
            debug!(rows = self.staged.len(), "memory_tx_dropped_uncommitted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt() -> InsertStatement {
        InsertStatement::new("events", ["id", "topic"])
    }

    #[tokio::test]
    async fn commit_applies_staged_rows() {
        let driver = MemoryDriver::new();
        let mut tx = driver.begin().await.unwrap();
        let prepared = tx.prepare(&stmt()).await.unwrap();
        tx.execute(&prepared, &[Value::Int(1), Value::from("a")])
            .await
            .unwrap();
        tx.execute(&prepared, &[Value::Int(2), Value::from("b")])
            .await
            .unwrap();

        assert_eq!(driver.row_count("events"), 0);
        tx.commit().await.unwrap();
        assert_eq!(driver.row_count("events"), 2);

        let rows = driver.rows("events").unwrap();
        assert_eq!(rows.columns, vec!["id".to_string(), "topic".to_string()]);
        assert_eq!(rows.rows[1][1], Value::from("b"));
    }

    #[tokio::test]
    async fn rollback_and_drop_discard_rows() {
        let driver = MemoryDriver::new();

        let mut tx = driver.begin().await.unwrap();
        let prepared = tx.prepare(&stmt()).await.unwrap();
        tx.execute(&prepared, &[Value::Int(1), Value::from("a")])
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        let mut tx = driver.begin().await.unwrap();
        let prepared = tx.prepare(&stmt()).await.unwrap();
        tx.execute(&prepared, &[Value::Int(1), Value::from("a")])
            .await
            .unwrap();
        drop(tx);

        assert_eq!(driver.row_count("events"), 0);
    }

    #[tokio::test]
    async fn execute_rejects_wrong_arity() {
        let driver = MemoryDriver::new();
        let mut tx = driver.begin().await.unwrap();
        let prepared = tx.prepare(&stmt()).await.unwrap();
        let res = tx.execute(&prepared, &[Value::Int(1)]).await;
        assert!(matches!(res, Err(StorageError::ArityMismatch { .. })));
    }

    #[tokio::test]
    async fn commit_rejects_mismatched_columns() {
        let driver = MemoryDriver::new();

        let mut tx = driver.begin().await.unwrap();
        let prepared = tx.prepare(&stmt()).await.unwrap();
        tx.execute(&prepared, &[Value::Int(1), Value::from("a")])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = driver.begin().await.unwrap();
        let other = InsertStatement::new("events", ["id"]);
        let prepared = tx.prepare(&other).await.unwrap();
        tx.execute(&prepared, &[Value::Int(2)]).await.unwrap();
        let res = tx.commit().await;
        assert!(matches!(res, Err(StorageError::SchemaMismatch { .. })));
        assert_eq!(driver.row_count("events"), 1);
    }

    #[tokio::test]
    async fn query_is_unsupported() {
        let driver = MemoryDriver::new();
        let res = driver.query("SELECT 1", &[]).await;
        assert!(matches!(res, Err(StorageError::Unsupported { .. })));
    }
}
