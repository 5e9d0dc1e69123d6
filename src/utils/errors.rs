//! Error handling
//!
//! Every failure the service can surface, and its mapping to an HTTP response.
//! Contention and lookup misses (`EquipmentUnavailable`, `NoActiveTrip`,
//! `TripNotFound`) are expected outcomes: they become a caller-facing message
//! with `success: false` instead of an error status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Permission denied.")]
    PermissionDenied,

    #[error("Invalid session.")]
    InvalidSession,

    #[error("EPJ {0} is no longer available. It may have just been checked out.")]
    EquipmentUnavailable(String),

    #[error("No active trip found.")]
    NoActiveTrip,

    #[error("Could not find original trip ID {0}.")]
    TripNotFound(String),

    /// Refused account action with an operator-facing reason.
    #[error("{0}")]
    Rejected(String),

    #[error("Timed out waiting for the checkout lock. Please try again.")]
    LockTimeout,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Hash error: {0}")]
    Hash(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AppError::Hash(e.to_string())
    }
}

impl AppError {
    /// Lost races and lookup misses. Surfaced as a message, never as a fault.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::EquipmentUnavailable(_)
                | AppError::NoActiveTrip
                | AppError::TripNotFound(_)
                | AppError::Rejected(_)
        )
    }

    /// Text shown to the operator for a recovered failure.
    pub fn user_message(&self) -> String {
        format!("Error: {}", self)
    }
}

/// Error body returned by the API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    code: String,
}

impl ErrorResponse {
    fn new(error: &str, message: String, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message,
            details: None,
            code: code.to_string(),
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorResponse::new("Forbidden", self.to_string(), "PERMISSION_DENIED"),
            ),
            AppError::InvalidSession => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("Unauthorized", self.to_string(), "INVALID_SESSION"),
            ),
            AppError::LockTimeout => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse::new("Service Unavailable", self.to_string(), "LOCK_TIMEOUT"),
            ),
            AppError::Database(e) => {
                error!("❌ Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "Database Error",
                        "An error occurred while accessing the database".to_string(),
                        "DB_ERROR",
                    ),
                )
            }
            AppError::Migration(e) => {
                error!("❌ Migration error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "Database Error",
                        "The database schema is not up to date".to_string(),
                        "DB_ERROR",
                    ),
                )
            }
            AppError::Cache(msg) => {
                error!("❌ Cache error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "Cache Error",
                        "An error occurred while accessing the cache".to_string(),
                        "CACHE_ERROR",
                    ),
                )
            }
            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(
                    "Validation Error",
                    "The provided data is invalid".to_string(),
                    "VALIDATION_ERROR",
                )
                .with_details(json!(e)),
            ),
            AppError::Serialization(e) => {
                error!("❌ Serialization error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "Internal Server Error",
                        "An unexpected error occurred".to_string(),
                        "SERIALIZATION_ERROR",
                    ),
                )
            }
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("Bad Request", msg.clone(), "BAD_REQUEST"),
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("Not Found", msg.clone(), "NOT_FOUND"),
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse::new("Conflict", msg.clone(), "CONFLICT"),
            ),
            AppError::Hash(msg) => {
                error!("❌ Hash error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "Hash Error",
                        "An error occurred while processing credentials".to_string(),
                        "HASH_ERROR",
                    ),
                )
            }
            AppError::Internal(msg) => {
                error!("❌ Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "Internal Server Error",
                        "An unexpected error occurred".to_string(),
                        "INTERNAL_ERROR",
                    ),
                )
            }
            AppError::EquipmentUnavailable(_)
            | AppError::NoActiveTrip
            | AppError::TripNotFound(_)
            | AppError::Rejected(_) => {
                warn!("⚠️ {}", self);
                let body = json!({
                    "success": false,
                    "message": self.user_message(),
                });
                return (StatusCode::OK, Json(body)).into_response();
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result alias used across services and handlers
pub type AppResult<T> = Result<T, AppError>;

/// Helper for lookup misses on registries.
pub fn not_found_error(resource: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{} '{}' not found", resource, id))
}

/// Helper for uniqueness violations on registries.
pub fn conflict_error(resource: &str, field: &str, value: &str) -> AppError {
    AppError::Conflict(format!("{} with {} '{}' already exists", resource, field, value))
}

pub fn bad_request_error(message: &str) -> AppError {
    AppError::BadRequest(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(AppError::EquipmentUnavailable("E1".to_string()).is_recoverable());
        assert!(AppError::NoActiveTrip.is_recoverable());
        assert!(AppError::TripNotFound("TRIP-1".to_string()).is_recoverable());
        assert!(!AppError::LockTimeout.is_recoverable());
        assert!(!AppError::PermissionDenied.is_recoverable());
    }

    #[test]
    fn test_user_message() {
        let err = AppError::EquipmentUnavailable("E7".to_string());
        assert_eq!(
            err.user_message(),
            "Error: EPJ E7 is no longer available. It may have just been checked out."
        );
        assert_eq!(AppError::NoActiveTrip.user_message(), "Error: No active trip found.");
        assert_eq!(
            AppError::Rejected("Incorrect current password.".to_string()).user_message(),
            "Error: Incorrect current password."
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::InvalidSession.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::PermissionDenied.into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::LockTimeout.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(AppError::NoActiveTrip.into_response().status(), StatusCode::OK);
        assert_eq!(
            conflict_error("User", "username", "bob").into_response().status(),
            StatusCode::CONFLICT
        );
    }
}
