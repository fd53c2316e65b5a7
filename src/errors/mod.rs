//! Error handling module for the SEO publisher.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    pub const INVALID_RESPONSE: &str = "INVALID_RESPONSE";
    pub const DB_CONNECTION_ERROR: &str = "DB_CONNECTION_ERROR";
    pub const DB_WRITE_ERROR: &str = "DB_WRITE_ERROR";
    pub const DUPLICATE_TITLE: &str = "DUPLICATE_TITLE";
    pub const NO_DATA: &str = "NO_DATA";
    pub const FOREIGN_KEY_MISSING: &str = "FOREIGN_KEY_MISSING";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Application error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Missing or invalid operator identity
    Unauthorized(String),
    /// Empty, oversized or malformed operator input
    Validation(String),
    /// Transport failure talking to the language-model API
    Network(String),
    /// Language-model API answered without usable content
    InvalidResponse(String),
    /// Datastore unreachable
    DbConnection(String),
    /// Insert, update or query failure
    DbWrite(String),
    /// A canonical post with the same title already exists
    DuplicateTitle(String),
    /// Query returned nothing to work with
    NoData(String),
    /// Referenced staging post does not exist
    ForeignKeyMissing(i64),
    /// Internal server error
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Network(_) => StatusCode::BAD_GATEWAY,
            AppError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            AppError::DbConnection(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DbWrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::DuplicateTitle(_) => StatusCode::CONFLICT,
            AppError::NoData(_) => StatusCode::NOT_FOUND,
            AppError::ForeignKeyMissing(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::Network(_) => codes::NETWORK_ERROR,
            AppError::InvalidResponse(_) => codes::INVALID_RESPONSE,
            AppError::DbConnection(_) => codes::DB_CONNECTION_ERROR,
            AppError::DbWrite(_) => codes::DB_WRITE_ERROR,
            AppError::DuplicateTitle(_) => codes::DUPLICATE_TITLE,
            AppError::NoData(_) => codes::NO_DATA,
            AppError::ForeignKeyMissing(_) => codes::FOREIGN_KEY_MISSING,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Network(msg) => msg.clone(),
            AppError::InvalidResponse(msg) => msg.clone(),
            AppError::DbConnection(msg) => msg.clone(),
            AppError::DbWrite(msg) => msg.clone(),
            AppError::DuplicateTitle(title) => {
                format!("A post titled '{}' already exists", title)
            }
            AppError::NoData(msg) => msg.clone(),
            AppError::ForeignKeyMissing(post_id) => {
                format!("Staging post {} does not exist", post_id)
            }
            AppError::Internal(msg) => msg.clone(),
        }
    }

    /// Whether this failure belongs in the audit log when it ends a
    /// generation or publish attempt. Operator mistakes are reported inline only.
    pub fn is_audited(&self) -> bool {
        matches!(
            self,
            AppError::Network(_)
                | AppError::InvalidResponse(_)
                | AppError::DbConnection(_)
                | AppError::DbWrite(_)
        )
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        match &err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                AppError::DbConnection(format!("Database unavailable: {}", err))
            }
            _ => AppError::DbWrite(format!("Database error: {}", err)),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("HTTP error: {:?}", err);
        AppError::Network(format!("API request failed: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::InvalidResponse(format!("Invalid API response: {}", err))
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        tracing::warn!("CSV error: {:?}", err);
        AppError::Validation(format!("Invalid CSV: {}", err))
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}
