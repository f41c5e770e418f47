// HTTP error type and its mapping from upstream failures.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use validator_llm::LlmError;

use crate::models::ErrorBody;

/// Every failure a handler can return. The `Display` text is what clients
/// see in the `detail` field.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("AI service error")]
    UpstreamStatus,

    #[error("AI service timeout")]
    UpstreamTimeout,

    #[error("AI service unavailable")]
    UpstreamUnavailable,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Not Found")]
    NotFound,

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UpstreamStatus => StatusCode::BAD_GATEWAY,
            ApiError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Status { .. } => ApiError::UpstreamStatus,
            LlmError::Timeout => ApiError::UpstreamTimeout,
            LlmError::Network(_) | LlmError::Closed => ApiError::UpstreamUnavailable,
            LlmError::MalformedResponse(_) | LlmError::ClientBuild(_) => {
                error!("Unexpected error: {err}");
                ApiError::Internal
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
