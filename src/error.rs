//! Error types for Libris server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable numeric error codes returned to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchMember = 4,
    NoSuchData = 5,
    InvalidState = 6,
    NoAvailableCopy = 7,
    Duplicate = 8,
    RenewalLimit = 9,
    AlreadyReturned = 10,
    NotPending = 11,
    HasDependents = 12,
    NotReady = 13,
    NotCancellable = 14,
    Conflict = 15,
    BadValue = 18,
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

    #[error("Member {0} not found")]
    MemberNotFound(i32),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("No available copy of book {0}")]
    NoAvailableCopy(i32),

    #[error("Member {member_id} already holds an open reservation for book {book_id}")]
    DuplicateReservation { member_id: i32, book_id: i32 },

    #[error("Maximum renewals reached ({0})")]
    RenewalLimitExceeded(i16),

    #[error("Loan {0} was already returned")]
    AlreadyReturned(i32),

    #[error("Transaction {0} is not pending")]
    TransactionNotPending(i32),

    #[error("Loan {0} has associated transactions")]
    HasTransactions(i32),

    #[error("Transaction {0} has associated payments")]
    HasPayments(i32),

    #[error("Copy {0} has loan history")]
    HasLoans(i32),

    #[error("Author {0} is credited on books")]
    HasBooks(i32),

    #[error("Reservation {0} is not ready for checkout")]
    NotReady(i32),

    #[error("Reservation {0} cannot be cancelled")]
    NotCancellable(i32),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// SQLSTATE codes that mean "another request got there first"
const CONFLICT_SQLSTATES: [&str; 4] = [
    "23505", // unique_violation
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "55P03", // lock_not_available
];

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        let conflict = e
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| CONFLICT_SQLSTATES.contains(&&*code))
            .unwrap_or(false);

        if conflict {
            AppError::Conflict(e.to_string())
        } else {
            AppError::Database(e)
        }
    }
}

/// Whether a database error is a unique violation of the named constraint or index
pub fn is_unique_violation(e: &sqlx::Error, constraint: &str) -> bool {
    e.as_database_error()
        .map(|db| db.code().as_deref() == Some("23505") && db.constraint() == Some(constraint))
        .unwrap_or(false)
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData),
            AppError::MemberNotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchMember),
            AppError::InvalidStateTransition(_) => (StatusCode::CONFLICT, ErrorCode::InvalidState),
            AppError::NoAvailableCopy(_) => (StatusCode::CONFLICT, ErrorCode::NoAvailableCopy),
            AppError::DuplicateReservation { .. } => (StatusCode::CONFLICT, ErrorCode::Duplicate),
            AppError::RenewalLimitExceeded(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::RenewalLimit)
            }
            AppError::AlreadyReturned(_) => (StatusCode::CONFLICT, ErrorCode::AlreadyReturned),
            AppError::TransactionNotPending(_) => (StatusCode::CONFLICT, ErrorCode::NotPending),
            AppError::HasTransactions(_)
            | AppError::HasPayments(_)
            | AppError::HasLoans(_)
            | AppError::HasBooks(_) => {
                (StatusCode::CONFLICT, ErrorCode::HasDependents)
            }
            AppError::NotReady(_) => (StatusCode::CONFLICT, ErrorCode::NotReady),
            AppError::NotCancellable(_) => (StatusCode::CONFLICT, ErrorCode::NotCancellable),
            AppError::Conflict(_) => (StatusCode::CONFLICT, ErrorCode::Conflict),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DbFailure),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::Conflict(msg) => {
                tracing::warn!("Concurrent update conflict: {}", msg);
                "The resource was modified concurrently, please retry".to_string()
            }
            other => other.to_string(),
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
