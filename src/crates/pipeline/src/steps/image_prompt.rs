//! Image-prompt step: prompts for the image fan-out, each with a file slug

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{info, warn};

use super::StepContext;
use crate::ai::parse_string_list;
use crate::prompts;
use crate::types::ImagePrompt;
use crate::{PipelineError, Result};

const MAX_SLUG_CHARS: usize = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePromptInput {
    pub post_id: String,
    pub website_id: String,
    #[serde(default)]
    pub blog_title: Option<String>,
    pub refined_article_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePromptOutput {
    pub prompts: Vec<ImagePrompt>,
}

fn separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s_]+").expect("static regex"))
}

fn disallowed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9-]+").expect("static regex"))
}

fn repeated_hyphens() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-{2,}").expect("static regex"))
}

/// Reduce a model-suggested slug to `[a-z0-9-]`; blank results become
/// `image-<index>`.
pub fn clean_slug(raw: &str, index: u32) -> String {
    let lowered = raw.trim().to_lowercase();
    let hyphenated = separators().replace_all(&lowered, "-");
    let stripped = disallowed().replace_all(&hyphenated, "");
    let collapsed = repeated_hyphens().replace_all(&stripped, "-");

    let mut slug: String = collapsed.trim_matches('-').chars().take(MAX_SLUG_CHARS).collect();
    slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        format!("image-{}", index)
    } else {
        slug
    }
}

/// Pair prompts with slugs, padding or truncating the slug list to fit
fn build_prompts(texts: Vec<String>, slugs: Vec<String>) -> Vec<ImagePrompt> {
    texts
        .into_iter()
        .enumerate()
        .map(|(i, prompt)| {
            let index = i as u32 + 1;
            let slug = slugs.get(i).map(String::as_str).unwrap_or_default();
            ImagePrompt {
                index,
                prompt,
                slug: clean_slug(slug, index),
            }
        })
        .collect()
}

pub async fn run(ctx: &StepContext, input: ImagePromptInput) -> Result<ImagePromptOutput> {
    let site = ctx.load_site(&input.post_id, &input.website_id).await?;
    let article = ctx
        .read_text(&site, &input.refined_article_uri, "refinedArticleUri")
        .await?;
    let model = site.settings.text_model_or(&ctx.models.text_model);
    let wanted = site.settings.image_count();

    let request = prompts::image_prompts(site.title(input.blog_title.as_deref()), &article, &site.settings)
        .with_model(model);
    let reply = ctx.complete_text(request).await?;
    let mut texts = parse_string_list(&reply, &["prompts", "image_prompts"])?;
    texts.truncate(wanted);
    if texts.is_empty() {
        return Err(PipelineError::MalformedResponse(
            "model returned no usable image prompts".to_string(),
        ));
    }
    if texts.len() < wanted {
        warn!(post_id = %input.post_id, wanted, got = texts.len(), "Fewer image prompts than requested");
    }

    let reply = ctx
        .complete_text(prompts::slugs(&texts).with_model(model))
        .await?;
    let slugs = parse_string_list(&reply, &["slugs", "slug_list"])?;
    if slugs.len() != texts.len() {
        warn!(post_id = %input.post_id, prompts = texts.len(), slugs = slugs.len(), "Slug count mismatch, padding");
    }

    let prompts = build_prompts(texts, slugs);
    ctx.posts
        .set_image_prompts(&input.post_id, &serde_json::to_string(&prompts)?)
        .await?;

    info!(post_id = %input.post_id, count = prompts.len(), "Image prompts stored");
    Ok(ImagePromptOutput { prompts })
}
