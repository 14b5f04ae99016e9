//! HTTP error mapping.
//!
//! Every handler failure becomes `{ "error": <message>, "code": <CODE> }`.
//! Internal details are logged and never returned to the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use stemsplit_core::error::CoreError;

/// Message returned in place of any internal error detail.
const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Error type returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `stemsplit_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Malformed request outside the domain's own validation
    /// (e.g. a broken multipart body or a missing form field).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The upload exceeded the configured body limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Core(CoreError::NotFound { .. }) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Core(CoreError::Validation(_)) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::Core(CoreError::Conflict(_)) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::Core(CoreError::Internal(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Core(CoreError::NotFound { entity, id }) => {
                format!("{entity} with id {id} not found")
            }
            Self::Core(CoreError::Validation(msg) | CoreError::Conflict(msg))
            | Self::BadRequest(msg)
            | Self::PayloadTooLarge(msg) => msg.clone(),
            Self::Core(CoreError::Internal(msg)) => {
                tracing::error!(error = %msg, "Internal error");
                INTERNAL_MESSAGE.to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = ErrorBody {
            error: self.client_message(),
            code,
        };
        (status, Json(body)).into_response()
    }
}
