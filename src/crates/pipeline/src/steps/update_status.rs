//! Status step called by the workflow between phases and on failure

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::StepContext;
use crate::{PipelineError, PostStatus, Result};

const DEFAULT_FAILURE_MESSAGE: &str = "workflow run failed";
const MAX_ERROR_CHARS: usize = 2000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusInput {
    pub post_id: String,
    pub status: PostStatus,
    /// Error string, or the `{Error, Cause}` object a workflow catch hands over
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusOutput {
    pub post_id: String,
    pub status: PostStatus,
    /// False when the post already had this status
    pub changed: bool,
}

/// Render a workflow error payload as a single message
pub fn describe_error(error: Option<&Value>) -> String {
    let text = match error {
        None | Some(Value::Null) => DEFAULT_FAILURE_MESSAGE.to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Object(map)) => {
            let field = |key: &str| map.get(key).and_then(Value::as_str).map(str::trim);
            match (field("Error"), field("Cause")) {
                (Some(err), Some(cause)) if !cause.is_empty() => format!("{}: {}", err, cause),
                (Some(err), _) => err.to_string(),
                (None, Some(cause)) => cause.to_string(),
                (None, None) => Value::Object(map.clone()).to_string(),
            }
        }
        Some(Value::String(_)) => DEFAULT_FAILURE_MESSAGE.to_string(),
        Some(other) => other.to_string(),
    };
    text.chars().take(MAX_ERROR_CHARS).collect()
}

pub async fn run(ctx: &StepContext, input: UpdateStatusInput) -> Result<UpdateStatusOutput> {
    let post = ctx
        .posts
        .get(&input.post_id)
        .await?
        .ok_or_else(|| PipelineError::PostNotFound(input.post_id.clone()))?;
    let current = post.status()?;
    let target = input.status;

    if current == target {
        return Ok(UpdateStatusOutput {
            post_id: input.post_id,
            status: current,
            changed: false,
        });
    }

    match target {
        PostStatus::Processing => {
            return Err(PipelineError::Validation(
                "processing is set when a run is triggered".to_string(),
            ))
        }
        PostStatus::Complete => {
            return Err(PipelineError::Validation(
                "complete is set by the assemble step".to_string(),
            ))
        }
        _ => {}
    }
    current.validate_transition(target)?;

    let applied = match target {
        PostStatus::Failed => {
            let message = describe_error(input.error.as_ref());
            warn!(post_id = %input.post_id, from = %current, error = %message, "Marking post failed");
            ctx.posts.mark_failed(&input.post_id, &message).await?
        }
        _ => ctx.posts.transition(&input.post_id, current, target).await?,
    };

    if !applied {
        return Err(PipelineError::Conflict(format!(
            "post {} changed status concurrently",
            input.post_id
        )));
    }

    info!(post_id = %input.post_id, from = %current, to = %target, "Post status updated");
    Ok(UpdateStatusOutput {
        post_id: input.post_id,
        status: target,
        changed: true,
    })
}
