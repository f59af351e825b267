//! Error types produced by storage drivers.
use thiserror::Error;

/// Failures raised by a [`Driver`](crate::Driver) or one of its transactions.
///
/// Every variant describes an infrastructure problem, so the HTTP layer maps
/// the whole enum to `503 Service Unavailable`. Nothing here is retried
/// internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageError {
    /// The store could not be reached.
    #[error("storage connection unavailable: {0}")]
    Connection(String),

    #[error("failed to begin transaction: {0}")]
    Begin(String),

    #[error("failed to prepare statement: {0}")]
    Prepare(String),

    /// A prepared statement was executed with the wrong number of arguments.
    #[error("statement expects {expected} arguments, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("failed to execute statement: {0}")]
    Execute(String),

    #[error("failed to commit transaction: {0}")]
    Commit(String),

    #[error("failed to roll back transaction: {0}")]
    Rollback(String),

    #[error("query failed: {0}")]
    Query(String),

    /// Rows were written to an existing table with a different column list.
    #[error("table `{table}` does not match statement columns")]
    SchemaMismatch { table: String },

    #[error("{driver} driver does not support {operation}")]
    Unsupported {
        driver: &'static str,
        operation: &'static str,
    },

    #[error("storage lock poisoned")]
    Poisoned,
}
