//! Research step: first draft from the post title and site context

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{StepContext, MARKDOWN_CONTENT_TYPE};
use crate::prompts;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchInput {
    pub post_id: String,
    pub website_id: String,
    #[serde(default)]
    pub blog_title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchOutput {
    pub research_article_uri: String,
}

pub async fn run(ctx: &StepContext, input: ResearchInput) -> Result<ResearchOutput> {
    let site = ctx.load_site(&input.post_id, &input.website_id).await?;
    let title = site.title(input.blog_title.as_deref());
    let description = input
        .description
        .as_deref()
        .or(site.post.description.as_deref());

    let request = prompts::research(title, description, &site.settings)
        .with_model(site.settings.text_model_or(&ctx.models.text_model));
    let article = ctx.complete_text(request).await?;

    let uri = ctx
        .store
        .put_text(&site.prefix.research_article(), &article, MARKDOWN_CONTENT_TYPE)
        .await?;
    let uri = uri.to_string();
    ctx.posts.set_research_uri(&input.post_id, &uri).await?;

    info!(post_id = %input.post_id, uri = %uri, chars = article.len(), "Research draft stored");
    Ok(ResearchOutput {
        research_article_uri: uri,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ScriptedProvider;
    use crate::steps::test_support::harness;
    use crate::PipelineError;

    fn input() -> ResearchInput {
        ResearchInput {
            post_id: "post-1".to_string(),
            website_id: "site-1".to_string(),
            blog_title: None,
            description: Some("Focus on safety".to_string()),
        }
    }

    #[tokio::test]
    async fn test_research_stores_draft_and_pointer() {
        let h = harness(ScriptedProvider::new().reply_when("research writer", "# Tide pools\n\nDraft body.")).await;

        let output = run(&h.ctx, input()).await.unwrap();
        assert_eq!(
            output.research_article_uri,
            "mem://content/site-1/post-1/research_article.md"
        );
        assert_eq!(
            h.store.content_type("site-1/post-1/research_article.md").as_deref(),
            Some(MARKDOWN_CONTENT_TYPE)
        );

        let post = h.ctx.posts.get("post-1").await.unwrap().unwrap();
        assert_eq!(post.research_article_uri.as_deref(), Some(output.research_article_uri.as_str()));

        let request = &h.ai.chat_requests()[0];
        assert_eq!(request.config.model.as_deref(), Some("gpt-4o"));
        assert!(request.messages[1].text().contains("Focus on safety"));
        assert!(request.messages[1].text().contains("\"Tide pools\""));
    }

    #[tokio::test]
    async fn test_blank_reply_is_malformed() {
        let h = harness(ScriptedProvider::new().with_fallback("   ")).await;
        let err = run(&h.ctx, input()).await.unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)));
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_provider_outage_surfaces() {
        let h = harness(ScriptedProvider::new().fail_when("research writer")).await;
        let err = run(&h.ctx, input()).await.unwrap_err();
        assert!(matches!(err, PipelineError::ExternalApi(_)));
        assert!(err.is_retryable());
    }
}
