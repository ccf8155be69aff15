use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            // Security-relevant: the only failure that means the caller could
            // not authenticate as the payment provider.
            AppError::InvalidSignature => {
                tracing::warn!("webhook signature verification failed");
                error_resp(StatusCode::UNAUTHORIZED, ErrorCode::InvalidSignature, None)
            }
            AppError::InvalidPayload(msg) => {
                tracing::error!(error = %msg, "Request failed");
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::InvalidPayload, Some(msg))
            }
            AppError::InvalidInput(msg) => {
                tracing::error!(error = %msg, "Request failed");
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::InvalidInput, Some(msg))
            }
            AppError::NotFound => error_resp(StatusCode::NOT_FOUND, ErrorCode::NotFound, None),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Request failed");
                error_resp(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DatabaseError,
                    None,
                )
            }
            // Retryable: the provider redelivers and dedup keeps it safe.
            AppError::PersistenceTimeout => {
                tracing::error!("Request failed: persistence timeout");
                error_resp(
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorCode::PersistenceTimeout,
                    None,
                )
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                error_resp(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::InternalError,
                    None,
                )
            }
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: Option<String>) -> Response {
    let body = match message {
        Some(msg) => serde_json::json!({ "code": code.as_str(), "message": msg }),
        None => serde_json::json!({ "code": code.as_str() }),
    };
    (status, Json(body)).into_response()
}
