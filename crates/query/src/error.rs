//! Error types for query compilation and execution.
//!
//! | Error | Status |
//! |-------|--------|
//! | [`QueryError::SchemaValidationFailed`] | 400 |
//! | [`QueryError::Translate`] | 400 |
//! | [`QueryError::Build`] | 400 |
//! | [`QueryError::SchemaNotRegistered`] | 500 |
//! | [`QueryError::Schema`] | 500 |
//! | [`QueryError::Serialize`] | 500 |
//! | [`QueryError::Repository`] | 503 |
use storage::StorageError;
use thiserror::Error;

use crate::builder::BuildError;
use crate::translator::TranslateError;

/// Problems loading or looking up a schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("schema {key} is not valid JSON: {reason}")]
    Parse { key: String, reason: String },

    #[error("schema {key} could not be compiled: {reason}")]
    Compile { key: String, reason: String },

    #[error("schema registry lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum QueryError {
    #[error("schema {0} is not registered")]
    SchemaNotRegistered(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// One message per schema violation, in the order the validator found them.
    #[error("query does not match schema: {}", errors.join("; "))]
    SchemaValidationFailed { errors: Vec<String> },

    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error("failed to build query: {0}")]
    Build(#[from] BuildError),

    #[error("query could not be serialized: {0}")]
    Serialize(String),

    #[error("query could not be executed: {0}")]
    Repository(#[from] StorageError),
}

impl QueryError {
    pub fn http_status_code(&self) -> u16 {
        match self {
            QueryError::SchemaValidationFailed { .. }
            | QueryError::Translate(_)
            | QueryError::Build(_) => 400,
            QueryError::SchemaNotRegistered(_)
            | QueryError::Schema(_)
            | QueryError::Serialize(_) => 500,
            QueryError::Repository(_) => 503,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status_code())
    }
}
