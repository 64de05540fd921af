//! Image generation step, one invocation per prompt
//!
//! Runs in parallel branches of the workflow's map state, so it writes only
//! its own blob key and never updates the post record.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::image_prompt::clean_slug;
use super::{StepContext, PNG_CONTENT_TYPE};
use crate::prompts;
use crate::types::{ImagePrompt, ImageRef};
use crate::{PipelineError, Result};

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGenInput {
    pub post_id: String,
    pub website_id: String,
    pub prompt: ImagePrompt,
}

pub async fn run(ctx: &StepContext, input: ImageGenInput) -> Result<ImageRef> {
    let prompt = &input.prompt;
    if prompt.index == 0 {
        return Err(PipelineError::Validation("prompt index starts at 1".to_string()));
    }
    if prompt.prompt.trim().is_empty() {
        return Err(PipelineError::Validation("prompt text is empty".to_string()));
    }

    let site = ctx.load_site(&input.post_id, &input.website_id).await?;
    let request = prompts::image(prompt, &site.settings, &ctx.models.image_model);
    let size = request.size;

    let bytes = ctx.ai.generate_image(request).await?;
    if !bytes.starts_with(PNG_SIGNATURE) {
        return Err(PipelineError::MalformedResponse(
            "image payload is not a PNG".to_string(),
        ));
    }

    let key = site.prefix.image(prompt.index, &clean_slug(&prompt.slug, prompt.index));
    let len = bytes.len();
    let uri = ctx.store.put(&key, bytes, PNG_CONTENT_TYPE).await?;

    info!(post_id = %input.post_id, index = prompt.index, %size, bytes = len, uri = %uri, "Image stored");
    Ok(ImageRef {
        index: prompt.index,
        image_uri: uri.to_string(),
    })
}
