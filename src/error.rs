//! API-facing error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::db::withdrawals::WithdrawalUpdateError;
use crate::status::TransitionError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Illegal transition: {0}")]
    Transition(TransitionError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            // A terminal row is immutable; report it as a conflict rather
            // than a bad transition request.
            TransitionError::Terminal(_) => AppError::Conflict(err.to_string()),
            _ => AppError::Transition(err),
        }
    }
}

impl From<WithdrawalUpdateError> for AppError {
    fn from(err: WithdrawalUpdateError) -> Self {
        match err {
            WithdrawalUpdateError::NotFound(id) => AppError::NotFound(format!("withdrawal {id}")),
            WithdrawalUpdateError::Transition(t) => t.into(),
            WithdrawalUpdateError::Database(e) => AppError::Database(e),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Transition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Transition(_) => "ILLEGAL_TRANSITION",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Database details stay in the logs, not the response body.
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("database error: {e}");
                "database error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(json!({
            "error": message,
            "code": self.error_code(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{MemberType, WithdrawalStatus};

    #[test]
    fn transition_errors_map_to_422() {
        let err: AppError = crate::status::validate_transition(
            WithdrawalStatus::AmlReview,
            WithdrawalStatus::Success,
            MemberType::Individual,
        )
        .unwrap_err()
        .into();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn terminal_transition_maps_to_409() {
        let err: AppError = crate::status::validate_transition(
            WithdrawalStatus::Success,
            WithdrawalStatus::Failed,
            MemberType::Individual,
        )
        .unwrap_err()
        .into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.error_code(), "CONFLICT");
    }
}
