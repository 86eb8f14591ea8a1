//! Error types for the Carzone API.
//!
//! ## Status Mapping
//! ```text
//! ValidationError / bad id / bad body  → 400 Validation
//! missing / bad / expired token        → 401 Unauthorized
//! DbError::ForeignKeyViolation         → 422 Referential
//! DbError::NotFound                    → 404 NotFound
//! DbError::Conflict, UniqueViolation,
//!   Busy                               → 409 Conflict
//! everything else                      → 500 Internal
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use carzone_core::ValidationError;
use carzone_db::DbError;

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Carzone API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Malformed or invalid request input
    #[error("{0}")]
    Validation(String),

    /// Authentication failed
    #[error("{0}")]
    Unauthorized(String),

    /// The request names an entity that does not exist
    #[error("{0}")]
    Referential(String),

    /// Resource not found
    #[error("{0}")]
    NotFound(String),

    /// The request conflicts with current state
    #[error("{0}")]
    Conflict(String),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Internal failure; detail is logged, never returned
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Referential(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DbError::ForeignKeyViolation { message } => ApiError::Referential(message),
            DbError::Conflict { .. } | DbError::UniqueViolation { .. } | DbError::Busy(_) => {
                ApiError::Conflict(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            ApiError::Internal(detail) => {
                error!(detail = %detail, "Request failed with internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            error: message,
            code: status.as_u16(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Validation("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Referential("x".to_string()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::Internal("x".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_db_error_mapping() {
        assert!(matches!(
            ApiError::from(DbError::not_found("Engine", "e-1")),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(DbError::foreign_key("engine e-1 does not exist")),
            ApiError::Referential(msg) if msg.contains("does not exist")
        ));
        assert!(matches!(
            ApiError::from(DbError::conflict("race")),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(DbError::Busy("database is locked".to_string())),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(DbError::DeadlineExceeded { op: "car.create" }),
            ApiError::Internal(_)
        ));
    }

    #[tokio::test]
    async fn test_internal_detail_is_not_leaked() {
        let response = ApiError::Internal("db password is hunter2".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!body.contains("hunter2"));
    }
}
