//! REST API layer
//!
//! - `POST /api/v1/generate` starts a run for a post
//! - `GET /api/v1/runs/:run_id` and `GET /api/v1/posts/:post_id` report status
//! - `POST /api/v1/steps/:step` is what the workflow's task states call
//! - `GET /health` and `GET /api/v1/system/health`

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use routes::{create_router, AppState};
