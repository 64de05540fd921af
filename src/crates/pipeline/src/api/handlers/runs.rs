//! Run and post status endpoints

use axum::extract::{Path, State};

use crate::api::{error::ApiResult, response, routes::AppState};

/// GET /api/v1/runs/:run_id
pub async fn get_run(
    State(app_state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let status = app_state.trigger.run_status(&run_id).await?;
    Ok(response::ok(status))
}

/// GET /api/v1/posts/:post_id
pub async fn get_post(
    State(app_state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let status = app_state.trigger.post_status(&post_id).await?;
    Ok(response::ok(status))
}
