use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ingest::IngestError;
use platform::PlatformError;
use query::QueryError;
use serde::{Deserialize, Serialize};

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ServerError {
    /// HTTP status for this error. Domain errors carry their own mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ServerError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Ingest(err) => status_from(err.http_status_code()),
            ServerError::Query(err) => status_from(err.http_status_code()),
            ServerError::Platform(err) => status_from(err.http_status_code()),
            ServerError::Internal(_) | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::Authentication(_) => "AUTH_FAILED",
            ServerError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ServerError::Forbidden(_) => "FORBIDDEN",
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ServerError::Ingest(err) => match err {
                IngestError::EventValidationFailed(_) => "EVENT_VALIDATION_FAILED",
                IngestError::EventTransformFailed(_) => "EVENT_TRANSFORM_FAILED",
                IngestError::EventCouldNotBeInserted { .. } => "EVENT_INSERT_FAILED",
                _ => "INGEST_ERROR",
            },
            ServerError::Query(err) => match err {
                QueryError::SchemaValidationFailed { .. } => "QUERY_SCHEMA_MISMATCH",
                QueryError::Translate(_) => "QUERY_TRANSLATION_FAILED",
                QueryError::Build(_) => "QUERY_BUILD_FAILED",
                QueryError::Repository(_) => "QUERY_EXECUTION_FAILED",
                _ => "QUERY_ERROR",
            },
            ServerError::Platform(err) => match err {
                PlatformError::NotFound { .. } => "NOT_FOUND",
                PlatformError::Conflict { .. } => "CONFLICT",
                PlatformError::InvalidIdentifier(_)
                | PlatformError::Validation(_)
                | PlatformError::InvalidRole(_) => "BAD_REQUEST",
                _ => "PLATFORM_ERROR",
            },
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }

    fn to_body(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
            },
        }
    }
}

fn status_from(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request_failed");
        }
        (status, Json(self.to_body())).into_response()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge(rejection.body_text())
        } else {
            ServerError::BadRequest(rejection.body_text())
        }
    }
}

impl From<std::net::AddrParseError> for ServerError {
    fn from(err: std::net::AddrParseError) -> Self {
        ServerError::Config(format!("Invalid address: {err}"))
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {err}"))
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::BadRequest(format!("JSON parse error: {err}"))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest::ValidationError;

    #[test]
    fn domain_errors_keep_their_status() {
        let err = ServerError::from(IngestError::from(ValidationError::TopicMissing));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "EVENT_VALIDATION_FAILED");

        let err = ServerError::from(PlatformError::NotFound {
            entity: "organization",
            id: "x".into(),
        });
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = ServerError::from(QueryError::SchemaValidationFailed {
            errors: vec!["bad".into()],
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "QUERY_SCHEMA_MISMATCH");
    }

    #[test]
    fn body_has_code_and_message() {
        let body = ServerError::RateLimitExceeded.to_body();
        assert_eq!(body.error.code, "RATE_LIMIT_EXCEEDED");
        assert_eq!(body.error.message, "Rate limit exceeded");
    }
}
