//! Error types for Labstock server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error codes exposed in API error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchRecord = 4,
    BadValue = 5,
    Duplicate = 6,
    InsufficientCapacity = 7,
    CapacityExceeded = 8,
    InvalidStateTransition = 9,
    InvalidQuantity = 10,
    AlreadySettled = 11,
    NotBorrowable = 12,
    PartialCommit = 13,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Applying the requested delta would drive an impact counter negative
    /// or push the impact sum past the item's total quantity.
    #[error("Insufficient capacity: {0}")]
    InsufficientCapacity(String),

    /// The ledger re-check at commit time rejected a release that an earlier
    /// advisory availability read had allowed.
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Already settled: {0}")]
    AlreadySettled(String),

    #[error("Equipment not borrowable: {0}")]
    NotBorrowable(String),

    /// A multi-record write was observed half-applied. Settlement and
    /// reservation writes share one transaction, so this indicates a bug
    /// or out-of-band tampering, never a normal outcome.
    #[error("Partial commit detected: {0}")]
    PartialCommit(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchRecord, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone())
            }
            AppError::InsufficientCapacity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::InsufficientCapacity,
                msg.clone(),
            ),
            AppError::CapacityExceeded(msg) => {
                (StatusCode::CONFLICT, ErrorCode::CapacityExceeded, msg.clone())
            }
            AppError::InvalidStateTransition(msg) => (
                StatusCode::CONFLICT,
                ErrorCode::InvalidStateTransition,
                msg.clone(),
            ),
            AppError::InvalidQuantity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::InvalidQuantity,
                msg.clone(),
            ),
            AppError::AlreadySettled(msg) => {
                (StatusCode::CONFLICT, ErrorCode::AlreadySettled, msg.clone())
            }
            AppError::NotBorrowable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::NotBorrowable,
                msg.clone(),
            ),
            AppError::PartialCommit(msg) => {
                tracing::error!("Partial commit: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::PartialCommit,
                    "Inconsistent write detected".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
