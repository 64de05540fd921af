//! Assemble step: final markdown document and completion
//!
//! The only step that moves a post to `complete`. It writes `final.md`, then
//! records the document pointer, image pointers and status in one update.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use super::{Site, StepContext, MARKDOWN_CONTENT_TYPE};
use crate::markdown::{assemble_markdown, FormattingNotes, MarkdownInput, PlacedImage};
use crate::types::{ImageRef, PostMetadata};
use crate::{PipelineError, PostStatus, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembleInput {
    pub post_id: String,
    pub website_id: String,
    #[serde(default)]
    pub blog_title: Option<String>,
    pub refined_article_uri: String,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    /// Falls back to the metadata stored by the metadata step
    #[serde(default)]
    pub metadata: Option<PostMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembleOutput {
    pub markdown_uri: String,
}

/// `03-rock-pool.png` -> `rock-pool`
fn slug_from_file_name(name: &str) -> String {
    let stem = name.strip_suffix(".png").unwrap_or(name);
    match stem.split_once('-') {
        Some((digits, rest)) if digits.chars().all(|c| c.is_ascii_digit()) => rest.to_string(),
        _ => stem.to_string(),
    }
}

/// Validate fan-in results and resolve them to links relative to the
/// final document.
async fn place_images(ctx: &StepContext, site: &Site, images: &[ImageRef]) -> Result<Vec<PlacedImage>> {
    let expected = site.post.image_prompts()?;
    if !expected.is_empty() && images.len() != expected.len() {
        return Err(PipelineError::Validation(format!(
            "expected {} images, got {}",
            expected.len(),
            images.len()
        )));
    }
    let slugs: BTreeMap<u32, &str> = expected.iter().map(|p| (p.index, p.slug.as_str())).collect();

    let mut seen = BTreeSet::new();
    let mut placed = Vec::with_capacity(images.len());
    for image in images {
        if !seen.insert(image.index) {
            return Err(PipelineError::Validation(format!(
                "duplicate image index {}",
                image.index
            )));
        }

        let uri = ctx.owned_pointer(site, &image.image_uri, "imageUri")?;
        if !ctx.store.exists(&uri).await? {
            return Err(crate::storage::StorageError::NotFound(uri.to_string()).into());
        }
        let path = site
            .prefix
            .relative(&uri)
            .map(str::to_string)
            .unwrap_or_else(|| uri.file_name().to_string());
        let slug = slugs
            .get(&image.index)
            .map(|s| s.to_string())
            .unwrap_or_else(|| slug_from_file_name(uri.file_name()));

        placed.push(PlacedImage {
            index: image.index,
            path,
            slug,
        });
    }
    Ok(placed)
}

pub async fn run(ctx: &StepContext, input: AssembleInput) -> Result<AssembleOutput> {
    let site = ctx.load_site(&input.post_id, &input.website_id).await?;
    site.post.status()?.validate_transition(PostStatus::Complete)?;

    let body = ctx
        .read_text(&site, &input.refined_article_uri, "refinedArticleUri")
        .await?;
    let metadata = match input.metadata.clone() {
        Some(metadata) => metadata,
        None => site.post.metadata()?.ok_or_else(|| {
            PipelineError::Validation("metadata missing from input and post".to_string())
        })?,
    };

    let images = place_images(ctx, &site, &input.images).await?;
    let notes = FormattingNotes::parse(site.settings.formatting_notes.as_deref());
    let date = site.post.created_date();
    let document = assemble_markdown(&MarkdownInput {
        blog_title: site.title(input.blog_title.as_deref()),
        metadata: &metadata,
        body: &body,
        images,
        date: date.as_deref(),
        notes: &notes,
    });

    let uri = ctx
        .store
        .put_text(&site.prefix.final_document(), &document, MARKDOWN_CONTENT_TYPE)
        .await?
        .to_string();

    let mut refs = input.images.clone();
    refs.sort_by_key(|r| r.index);
    let completed = ctx
        .posts
        .complete(&input.post_id, &uri, &serde_json::to_string(&refs)?)
        .await?;
    if !completed {
        let current = ctx
            .posts
            .get(&input.post_id)
            .await?
            .map(|p| p.status)
            .unwrap_or_else(|| "missing".to_string());
        return Err(PipelineError::InvalidStateTransition {
            from: current,
            to: PostStatus::Complete.to_string(),
        });
    }

    info!(post_id = %input.post_id, uri = %uri, images = refs.len(), bytes = document.len(), "Post complete");
    Ok(AssembleOutput { markdown_uri: uri })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ScriptedProvider;
    use crate::steps::test_support::{harness, Harness};
    use crate::storage::BlobStore;
    use crate::types::ImagePrompt;

    async fn prepared(status: PostStatus) -> (Harness, AssembleInput) {
        let h = harness(ScriptedProvider::new()).await;
        let posts = &h.ctx.posts;
        posts.claim_for_run("post-1").await.unwrap();
        if status != PostStatus::Processing {
            posts.transition("post-1", PostStatus::Processing, status).await.unwrap();
        }
        let prompts = vec![
            ImagePrompt { index: 1, prompt: "A crab".into(), slug: "crab".into() },
            ImagePrompt { index: 2, prompt: "An anemone".into(), slug: "anemone".into() },
        ];
        posts
            .set_image_prompts("post-1", &serde_json::to_string(&prompts).unwrap())
            .await
            .unwrap();

        let refined = h
            .store
            .put_text("site-1/post-1/refined_article.md", "P1\n\nP2\n\nP3\n\nP4\n\nP5", "text/markdown")
            .await
            .unwrap();
        let mut images = Vec::new();
        for (index, slug) in [(2, "anemone"), (1, "crab")] {
            let uri = h
                .store
                .put(&format!("site-1/post-1/images/{:02}-{}.png", index, slug), vec![1], "image/png")
                .await
                .unwrap();
            images.push(ImageRef { index, image_uri: uri.to_string() });
        }

        let input = AssembleInput {
            post_id: "post-1".to_string(),
            website_id: "site-1".to_string(),
            blog_title: None,
            refined_article_uri: refined.to_string(),
            images,
            metadata: Some(PostMetadata {
                meta_title: "Tide Pools 101".into(),
                meta_description: "A guide.".into(),
                keywords: vec!["tide pools".into()],
            }),
        };
        (h, input)
    }

    #[tokio::test]
    async fn test_assemble_completes_post() {
        let (h, input) = prepared(PostStatus::GeneratingImages).await;

        let output = run(&h.ctx, input).await.unwrap();
        assert_eq!(output.markdown_uri, "mem://content/site-1/post-1/final.md");

        let doc = h.store.get_text(&output.markdown_uri.parse().unwrap()).await.unwrap();
        assert!(doc.starts_with("---\ntitle: Tide Pools 101\n"));
        assert!(doc.contains("date: 2026-03-01\n"));
        assert!(doc.contains("P2\n\n![Crab](images/01-crab.png)\n\nP3"));
        assert!(doc.contains("![Anemone](images/02-anemone.png)"));

        let post = h.ctx.posts.get("post-1").await.unwrap().unwrap();
        assert_eq!(post.status().unwrap(), PostStatus::Complete);
        assert_eq!(post.result_uri(), Some(output.markdown_uri.as_str()));
        assert_eq!(post.image_refs().unwrap()[0].index, 1);
    }

    #[tokio::test]
    async fn test_assemble_is_repeatable() {
        let (h, input) = prepared(PostStatus::GeneratingImages).await;
        run(&h.ctx, input.clone()).await.unwrap();
        let first = h.store.get_text(&"mem://content/site-1/post-1/final.md".parse().unwrap()).await.unwrap();
        run(&h.ctx, input).await.unwrap();
        let second = h.store.get_text(&"mem://content/site-1/post-1/final.md".parse().unwrap()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_failed_post_is_not_completed() {
        let (h, input) = prepared(PostStatus::Failed).await;
        let err = run(&h.ctx, input).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidStateTransition { .. }));
        assert!(!h.store.keys().iter().any(|k| k.ends_with("final.md")));
    }

    #[tokio::test]
    async fn test_partial_fan_in_rejected() {
        let (h, mut input) = prepared(PostStatus::GeneratingImages).await;
        input.images.pop();
        assert!(matches!(run(&h.ctx, input).await, Err(PipelineError::Validation(_))));
    }

    #[tokio::test]
    async fn test_foreign_image_rejected() {
        let (h, mut input) = prepared(PostStatus::GeneratingImages).await;
        input.images[0].image_uri = "mem://content/site-1/other/images/02-anemone.png".to_string();
        assert!(matches!(run(&h.ctx, input).await, Err(PipelineError::Validation(_))));
    }

    #[test]
    fn test_slug_from_file_name() {
        assert_eq!(slug_from_file_name("03-rock-pool.png"), "rock-pool");
        assert_eq!(slug_from_file_name("cover.png"), "cover");
    }
}
