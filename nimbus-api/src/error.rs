use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use nimbus_order::{SubmissionError, ValidationReport};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    /// Field-scoped errors the operator can correct before resubmitting.
    UnprocessableSelection(ValidationReport),
    NotFoundError(String),
    UpstreamError(String),
    InternalServerError(String),
}

impl AppError {
    pub fn from_submission(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Validation(report) => AppError::UnprocessableSelection(report),
            SubmissionError::Rejected(msg) => AppError::UpstreamError(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::UnprocessableSelection(report) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Selection has {} validation error(s)", report.error_count()),
                Some(json!(report)),
            ),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::UpstreamError(msg) => {
                tracing::warn!("Order service rejected submission: {}", msg);
                (StatusCode::BAD_GATEWAY, msg, None)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string(), None)
            }
        };

        let body = match details {
            Some(details) => json!({ "error": error_message, "details": details }),
            None => json!({ "error": error_message }),
        };

        (status, Json(body)).into_response()
    }
}
