//! Step invocation endpoint
//!
//! The workflow's task states call this with the step's JSON input and read
//! the JSON output back. Failures carry a retryable or terminal error name.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::api::{
    error::{ApiError, ApiResult},
    response,
    routes::AppState,
};
use crate::steps::{run_step, StepKind};

/// POST /api/v1/steps/:step
pub async fn invoke_step(
    State(app_state): State<AppState>,
    Path(step): Path<String>,
    Json(input): Json<Value>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let kind: StepKind = step.parse().map_err(|_| ApiError::BadRequest(format!("unknown step '{}'", step)))?;
    let output = run_step(&app_state.steps, kind, input)
        .await
        .map_err(ApiError::Step)?;
    Ok(response::ok(output))
}
