use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Persistence operation timed out")]
    PersistenceTimeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether a retry of the same request may succeed. Retryable errors are
    /// answered with 5xx so the payment provider redelivers the webhook.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::PersistenceTimeout | AppError::Internal(_)
        )
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    InvalidSignature,
    InvalidPayload,
    InvalidInput,
    NotFound,
    DatabaseError,
    PersistenceTimeout,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::InvalidPayload => "INVALID_PAYLOAD",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::PersistenceTimeout => "PERSISTENCE_TIMEOUT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
