use async_trait::async_trait;

use crate::{StorageError, Value};

/// SQL dialect spoken by a driver.
///
/// Batch inserts are only issued against columnar-compatible dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    ClickHouse,
    Postgres,
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::ClickHouse => "clickhouse",
            Dialect::Postgres => "postgres",
        }
    }

    /// Whether the dialect accepts the positional columnar insert used for events.
    pub fn is_columnar(&self) -> bool {
        matches!(self, Dialect::ClickHouse)
    }
}

/// A connection pool or client able to open transactions and run reads.
#[async_trait]
pub trait Driver: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Open a new transaction.
    async fn begin(&self) -> Result<Box<dyn Transaction>, StorageError>;

    /// Run a parameterized read query. Placeholders are bound positionally.
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows, StorageError>;
}

/// A live transaction.
///
/// Implementations must discard any uncommitted work when dropped without a
/// call to [`commit`](Transaction::commit) or [`rollback`](Transaction::rollback),
/// so a cancelled future never leaves a half-written batch behind.
#[async_trait]
pub trait Transaction: Send {
    async fn prepare(&mut self, stmt: &InsertStatement) -> Result<PreparedStatement, StorageError>;

    async fn execute(
        &mut self,
        stmt: &PreparedStatement,
        args: &[Value],
    ) -> Result<(), StorageError>;

    async fn commit(self: Box<Self>) -> Result<(), StorageError>;

    async fn rollback(self: Box<Self>) -> Result<(), StorageError>;
}

/// `INSERT INTO <table> (<columns>) VALUES (?, ...)` with one placeholder per column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    table: String,
    columns: Vec<String>,
}

impl InsertStatement {
    pub fn new<I, S>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn sql(&self) -> String {
        let placeholders = vec!["?"; self.columns.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            self.columns.join(", "),
            placeholders
        )
    }
}

/// Handle returned by [`Transaction::prepare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    statement: InsertStatement,
    sql: String,
}

impl PreparedStatement {
    pub fn new(statement: InsertStatement) -> Self {
        let sql = statement.sql();
        Self { statement, sql }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn statement(&self) -> &InsertStatement {
        &self.statement
    }

    /// Number of positional arguments one execution must bind.
    pub fn arity(&self) -> usize {
        self.statement.columns.len()
    }

    pub fn check_arity(&self, args: &[Value]) -> Result<(), StorageError> {
        if args.len() != self.arity() {
            return Err(StorageError::ArityMismatch {
                expected: self.arity(),
                actual: args.len(),
            });
        }
        Ok(())
    }
}

/// Tabular result of a read query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Rows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Pair every cell with its column name.
    pub fn into_records(self) -> Vec<Vec<(String, Value)>> {
        let Rows { columns, rows } = self;
        rows.into_iter()
            .map(|row| columns.iter().cloned().zip(row).collect())
            .collect()
    }
}
