//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Search parameter validation failures.
///
/// Every field that is later interpolated into the outbound geodata query is
/// constrained to a closed value set or a bounded numeric range. Anything
/// that fails these checks never reaches the query builder.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Latitude or longitude is missing or not parseable as a number.
    #[error("Latitude and longitude must be valid numbers")]
    InvalidCoordinates,

    /// Coordinates parse but fall outside [-90, 90] / [-180, 180].
    #[error("Latitude must be within [-90, 90] and longitude within [-180, 180]")]
    InvalidRange,

    /// POI type is not in the category allowlist.
    #[error("Unknown POI type")]
    InvalidType,

    /// Radius is missing, not an integer, or outside [100, 10000] meters.
    #[error("Radius must be between 100 and 10000 meters")]
    InvalidRadius,
}

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code. All error responses are
/// a flat JSON object with an `error` string; internal detail (database,
/// upstream) is logged and never leaked to the client.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Bearer token is missing or rejected by the identity provider.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Unauthorized")]
    Unauthorized,

    /// API key is missing, unknown, or revoked.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid or inactive API key")]
    InvalidApiKey,

    /// Referenced key does not exist for the authenticated owner.
    ///
    /// Returns HTTP 404 Not Found. Also produced when revoking a key that
    /// was already revoked, since the active-scoped lookup no longer sees it.
    #[error("API key not found")]
    KeyNotFound,

    /// Request body did not include the required `keyId` field.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Key ID is required")]
    MissingKeyId,

    /// Search parameters failed validation.
    ///
    /// Returns HTTP 400 Bad Request with the specific rule that failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Geodata upstream failed or timed out.
    ///
    /// Returns HTTP 500; the String carries detail for the log only.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Endpoint exists but was called with the wrong HTTP method.
    ///
    /// Returns HTTP 405 Method Not Allowed.
    #[error("Method not allowed")]
    MethodNotAllowed,
}

/// Convert AppError into an HTTP response.
///
/// Allows handlers to return `Result<T, AppError>` and have errors become
/// proper HTTP responses of the form `{"error": "<message>"}`.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::InvalidApiKey => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::KeyNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::MissingKeyId => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Validation(ref e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, self.to_string()),
            AppError::Upstream(ref detail) => {
                tracing::error!("Upstream geodata failure: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Database(ref e) => {
                tracing::error!("Database failure: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": message }));

        (status, body).into_response()
    }
}
