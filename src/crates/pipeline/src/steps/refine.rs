//! Refine step: rewrite the draft to the site's tone and length

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{StepContext, MARKDOWN_CONTENT_TYPE};
use crate::prompts;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineInput {
    pub post_id: String,
    pub website_id: String,
    #[serde(default)]
    pub blog_title: Option<String>,
    pub research_article_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineOutput {
    pub refined_article_uri: String,
}

pub async fn run(ctx: &StepContext, input: RefineInput) -> Result<RefineOutput> {
    let site = ctx.load_site(&input.post_id, &input.website_id).await?;
    let draft = ctx
        .read_text(&site, &input.research_article_uri, "researchArticleUri")
        .await?;

    let request = prompts::refine(site.title(input.blog_title.as_deref()), &draft, &site.settings)
        .with_model(site.settings.text_model_or(&ctx.models.text_model));
    let article = ctx.complete_text(request).await?;

    let uri = ctx
        .store
        .put_text(&site.prefix.refined_article(), &article, MARKDOWN_CONTENT_TYPE)
        .await?
        .to_string();
    ctx.posts.set_refined_uri(&input.post_id, &uri).await?;

    info!(
        post_id = %input.post_id,
        uri = %uri,
        draft_chars = draft.len(),
        refined_chars = article.len(),
        "Refined article stored"
    );
    Ok(RefineOutput {
        refined_article_uri: uri,
    })
}
