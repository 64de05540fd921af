//! Trigger request model

use serde::{Deserialize, Serialize};

use crate::api::error::ApiResult;
use crate::api::middleware::validation::{validate_not_empty, validate_string_length};

/// Body of `POST /api/v1/generate`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub post_id: String,
}

impl GenerateRequest {
    pub fn validate(&self) -> ApiResult<()> {
        validate_not_empty(&self.post_id, "postId")?;
        validate_string_length(self.post_id.trim(), "postId", 1, 128)?;
        Ok(())
    }
}
