use thiserror::Error;
use uuid::Uuid;

/// Errors from platform repositories, units of work and services.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlatformError {
    /// A path or body identifier that is not a UUID.
    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("unknown platform role `{0}`")]
    InvalidRole(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A uniqueness constraint would be violated.
    #[error("{entity} already exists: {detail}")]
    Conflict { entity: &'static str, detail: String },

    #[error("failed to begin transaction: {0}")]
    Begin(String),

    #[error("failed to commit transaction: {0}")]
    Commit(String),

    #[error("failed to roll back transaction: {0}")]
    Rollback(String),

    /// The transaction was already committed, rolled back or aborted.
    #[error("transaction {0} is already finished")]
    TransactionFinished(Uuid),

    #[error("platform store lock poisoned")]
    Poisoned,
}

impl PlatformError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        PlatformError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            PlatformError::InvalidIdentifier(_)
            | PlatformError::Validation(_)
            | PlatformError::InvalidRole(_) => 400,
            PlatformError::NotFound { .. } => 404,
            PlatformError::Conflict { .. } => 409,
            PlatformError::TransactionFinished(_) => 500,
            PlatformError::Begin(_)
            | PlatformError::Commit(_)
            | PlatformError::Rollback(_)
            | PlatformError::Poisoned => 503,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound { .. })
    }
}

/// Parse a textual identifier.
pub fn parse_identifier(id: &str) -> Result<Uuid, PlatformError> {
    Uuid::parse_str(id).map_err(|_| PlatformError::InvalidIdentifier(id.to_string()))
}
