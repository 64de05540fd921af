//! API error types and HTTP response conversion
//!
//! Pipeline errors map onto status codes by kind. Errors raised by the step
//! endpoint carry a `Step.Retryable` / `Step.Terminal` error name, which the
//! workflow definition's retry rules match on.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::workflow::definition::{RETRYABLE_ERROR, TERMINAL_ERROR};
use crate::{ErrorKind, PipelineError};

/// API error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for programmatic handling
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl ApiErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            code: code.into(),
            retryable: None,
        }
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request data
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// Error from a pipeline operation
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Error from a step invocation
    #[error(transparent)]
    Step(PipelineError),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(String),
}

fn pipeline_status(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
        PipelineError::PostNotFound(_) | PipelineError::SettingsNotFound(_) => StatusCode::NOT_FOUND,
        PipelineError::Conflict(_) | PipelineError::InvalidStateTransition { .. } => {
            StatusCode::CONFLICT
        }
        PipelineError::InactiveSite(_) | PipelineError::WebsiteMismatch { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        other => match other.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::ExternalApi => StatusCode::BAD_GATEWAY,
            ErrorKind::Storage => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

fn pipeline_code(err: &PipelineError) -> &'static str {
    match err {
        PipelineError::PostNotFound(_) | PipelineError::SettingsNotFound(_) => "NOT_FOUND",
        PipelineError::Conflict(_) | PipelineError::InvalidStateTransition { .. } => "CONFLICT",
        PipelineError::InactiveSite(_) => "INACTIVE_SITE",
        PipelineError::WebsiteMismatch { .. } => "WEBSITE_MISMATCH",
        other => match other.kind() {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::ExternalApi => "EXTERNAL_API_ERROR",
            ErrorKind::Storage => "STORAGE_ERROR",
            ErrorKind::Internal => "INTERNAL_ERROR",
        },
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::JsonError(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Pipeline(err) | ApiError::Step(err) => pipeline_status(err),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::JsonError(_) => "JSON_ERROR",
            ApiError::Pipeline(err) | ApiError::Step(err) => pipeline_code(err),
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::ValidationError(_) => "ValidationError",
            ApiError::JsonError(_) => "JsonError",
            ApiError::Pipeline(err) => match err.kind() {
                ErrorKind::Validation => "ValidationError",
                ErrorKind::ExternalApi => "ExternalApiError",
                ErrorKind::Storage => "StorageError",
                ErrorKind::Internal => "InternalError",
            },
            ApiError::Step(err) if err.is_retryable() => RETRYABLE_ERROR,
            ApiError::Step(_) => TERMINAL_ERROR,
        }
    }

    fn retryable(&self) -> Option<bool> {
        match self {
            ApiError::Pipeline(err) | ApiError::Step(err) => Some(err.is_retryable()),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = ApiErrorResponse::new(self.error_type(), self.to_string(), self.code());
        body.retryable = self.retryable();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), code = %body.code, "API error: {}", body.message);
        } else {
            tracing::warn!(status = status.as_u16(), code = %body.code, "API error: {}", body.message);
        }

        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::JsonError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    #[test]
    fn test_validation_family_status_codes() {
        let cases = [
            (PipelineError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (PipelineError::PostNotFound("p".into()), StatusCode::NOT_FOUND),
            (PipelineError::Conflict("busy".into()), StatusCode::CONFLICT),
            (PipelineError::InactiveSite("s".into()), StatusCode::UNPROCESSABLE_ENTITY),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::Pipeline(err).status_code(), status);
        }
    }

    #[test]
    fn test_external_and_storage_codes() {
        let err = ApiError::Pipeline(PipelineError::ExternalApi(llm::LlmError::Timeout("30s".into())));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code(), "EXTERNAL_API_ERROR");

        let err = ApiError::Pipeline(PipelineError::Storage(StorageError::NotFound("k".into())));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_type(), "StorageError");
    }

    #[test]
    fn test_step_error_names() {
        let retryable = ApiError::Step(PipelineError::ExternalApi(llm::LlmError::RateLimitExceeded(
            "slow down".into(),
        )));
        assert_eq!(retryable.error_type(), RETRYABLE_ERROR);
        assert_eq!(retryable.retryable(), Some(true));

        let terminal = ApiError::Step(PipelineError::Validation("missing postId".into()));
        assert_eq!(terminal.error_type(), TERMINAL_ERROR);
        assert_eq!(terminal.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_bad_request_error() {
        let err = ApiError::BadRequest("malformed".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "BAD_REQUEST");
        assert!(err.retryable().is_none());
    }
}
