use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

/// Postgres SQLSTATE for "relation does not exist".
pub const UNDEFINED_TABLE: &str = "42P01";
/// Postgres SQLSTATE for a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// StoreError
///
/// Failure reported by the hosted data store, classified so callers can tell a
/// missing table apart from a transport problem or a rejected query.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("relation does not exist: {0}")]
    MissingRelation(String),
    // A row with the same unique key (e.g. a category slug) already exists.
    #[error("duplicate value: {0}")]
    UniqueViolation(String),
    #[error("data store unreachable: {0}")]
    Connection(String),
    #[error("data store query failed: {0}")]
    Query(String),
}

impl StoreError {
    pub fn is_missing_relation(&self) -> bool {
        matches!(self, StoreError::MissingRelation(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNDEFINED_TABLE) => {
                StoreError::MissingRelation(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::UniqueViolation(
                    db.constraint().unwrap_or_else(|| db.message()).to_string(),
                )
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Connection(err.to_string()),
            _ => StoreError::Query(err.to_string()),
        }
    }
}

/// AppError
///
/// The request-scoped error taxonomy. Every variant renders as the JSON envelope
/// `{ error, code, details }` with a status mirroring its kind.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input the caller can correct.
    #[error("{0}")]
    Validation(String),
    /// Bad credentials or a missing/invalid session.
    #[error("{0}")]
    Auth(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    /// The request is well formed but conflicts with current data.
    #[error("{0}")]
    Conflict(String),
    #[error("the operation could not be completed, please retry")]
    Store(#[source] StoreError),
    #[error("the data store is unreachable, please retry")]
    Network(#[source] StoreError),
    #[error("internal error")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Connection(_) => AppError::Network(err),
            StoreError::UniqueViolation(_) => {
                AppError::Conflict("a record with the same name or slug already exists".to_string())
            }
            other => AppError::Store(other),
        }
    }
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Auth(_) => "AUTH_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Store(_) => "STORE_ERROR",
            AppError::Network(_) => "NETWORK_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Network(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// ErrorBody
///
/// Wire shape of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    pub details: Option<Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Store and transport details stay in the logs; the caller only sees the kind.
        match &self {
            AppError::Store(source) | AppError::Network(source) => {
                tracing::error!(code = self.code(), error = %source, "request failed in data store");
            }
            AppError::Internal(reason) => {
                tracing::error!(code = self.code(), %reason, "request failed");
            }
            _ => {}
        }

        let body = ErrorBody {
            error: self.to_string(),
            code: self.code().to_string(),
            details: None,
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_failures_surface_as_network_errors() {
        let err = AppError::from(StoreError::Connection("reset".into()));
        assert_eq!(err.code(), "NETWORK_ERROR");
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn query_failures_suggest_a_retry() {
        let err = AppError::from(StoreError::Query("syntax".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("retry"));
        assert!(!err.to_string().contains("syntax"));
    }

    #[test]
    fn duplicates_are_conflicts_the_caller_can_fix() {
        let err = AppError::from(StoreError::UniqueViolation("categories_slug_key".into()));
        assert_eq!(err.code(), "CONFLICT");
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(!err.to_string().contains("categories_slug_key"));
    }

    #[test]
    fn validation_maps_to_bad_request() {
        let err = AppError::Validation("name is required".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "name is required");
    }
}
