//! Metadata step: SEO title, description and keywords

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::StepContext;
use crate::ai::parse_json_object;
use crate::prompts;
use crate::types::PostMetadata;
use crate::{PipelineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataInput {
    pub post_id: String,
    pub website_id: String,
    #[serde(default)]
    pub blog_title: Option<String>,
    pub refined_article_uri: String,
}

/// Check the model's reply carries all three fields with the right types
pub fn parse_metadata(reply: &str) -> Result<PostMetadata> {
    let object = parse_json_object(reply)?;
    let malformed = |msg: &str| PipelineError::MalformedResponse(format!("metadata {}", msg));

    let text_field = |key: &str| -> Result<String> {
        match object.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            Some(Value::String(_)) => Err(malformed(&format!("field '{}' is empty", key))),
            Some(_) => Err(malformed(&format!("field '{}' is not a string", key))),
            None => Err(malformed(&format!("is missing '{}'", key))),
        }
    };

    let meta_title = text_field("metaTitle")?;
    let meta_description = text_field("metaDescription")?;
    let keywords = match object.get("keywords") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        Some(_) => return Err(malformed("field 'keywords' is not a list")),
        None => return Err(malformed("is missing 'keywords'")),
    };

    Ok(PostMetadata {
        meta_title,
        meta_description,
        keywords,
    })
}

pub async fn run(ctx: &StepContext, input: MetadataInput) -> Result<PostMetadata> {
    let site = ctx.load_site(&input.post_id, &input.website_id).await?;
    let article = ctx
        .read_text(&site, &input.refined_article_uri, "refinedArticleUri")
        .await?;

    let request = prompts::metadata(site.title(input.blog_title.as_deref()), &article, &site.settings)
        .with_model(site.settings.text_model_or(&ctx.models.text_model));
    let metadata = parse_metadata(&ctx.complete_text(request).await?)?;

    ctx.posts
        .set_metadata(&input.post_id, &serde_json::to_string(&metadata)?)
        .await?;

    info!(post_id = %input.post_id, keywords = metadata.keywords.len(), "Metadata stored");
    Ok(metadata)
}
