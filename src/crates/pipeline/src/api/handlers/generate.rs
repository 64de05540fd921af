//! Trigger endpoint

use axum::{extract::State, Json};

use crate::api::{error::ApiResult, models::GenerateRequest, response, routes::AppState};

/// Start a workflow run for a post
///
/// POST /api/v1/generate
pub async fn generate(
    State(app_state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    req.validate()?;
    let receipt = app_state.trigger.trigger(&req.post_id).await?;
    Ok(response::accepted(receipt))
}
