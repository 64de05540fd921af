//! Post model for database persistence

use crate::types::{ImagePrompt, ImageRef, PostMetadata};
use crate::{PipelineError, PostStatus, Result};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A tracked content-generation request
///
/// Step outputs are stored as pointers (URIs) or small JSON values. The
/// final document pointer is only meaningful while `status` is `complete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub post_id: String,

    /// Owning website
    pub website_id: String,

    pub blog_title: String,

    pub description: Option<String>,

    /// pending, processing, generating_images, complete, failed
    pub status: String,

    pub research_article_uri: Option<String>,

    pub refined_article_uri: Option<String>,

    /// JSON list of `ImagePrompt`
    pub image_prompts: Option<String>,

    /// JSON list of `ImageRef`, written together with the final document
    pub image_uris: Option<String>,

    /// JSON `PostMetadata`
    pub metadata: Option<String>,

    pub markdown_uri: Option<String>,

    /// Identifier of the workflow run processing this post
    pub run_id: Option<String>,

    pub error_message: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

impl Post {
    /// Create a pending post
    pub fn new(
        post_id: impl Into<String>,
        website_id: impl Into<String>,
        blog_title: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            post_id: post_id.into(),
            website_id: website_id.into(),
            blog_title: blog_title.into(),
            description: None,
            status: PostStatus::Pending.as_str().to_string(),
            research_article_uri: None,
            refined_article_uri: None,
            image_prompts: None,
            image_uris: None,
            metadata: None,
            markdown_uri: None,
            run_id: None,
            error_message: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Builder method to set the post description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the creation timestamp
    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = created_at.into();
        self
    }

    pub fn status(&self) -> Result<PostStatus> {
        self.status.parse()
    }

    /// The final document pointer, reported only for completed posts
    pub fn result_uri(&self) -> Option<&str> {
        match self.status() {
            Ok(PostStatus::Complete) => self.markdown_uri.as_deref(),
            _ => None,
        }
    }

    pub fn image_prompts(&self) -> Result<Vec<ImagePrompt>> {
        decode_json_list(self.image_prompts.as_deref(), "image_prompts")
    }

    pub fn image_refs(&self) -> Result<Vec<ImageRef>> {
        decode_json_list(self.image_uris.as_deref(), "image_uris")
    }

    pub fn metadata(&self) -> Result<Option<PostMetadata>> {
        match self.metadata.as_deref() {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw)
                .map(Some)
                .map_err(|e| PipelineError::Validation(format!("stored metadata is invalid: {}", e))),
            _ => Ok(None),
        }
    }

    /// Creation date (YYYY-MM-DD) for front matter, if the timestamp parses
    pub fn created_date(&self) -> Option<String> {
        chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
    }
}

fn decode_json_list<T: serde::de::DeserializeOwned>(raw: Option<&str>, field: &str) -> Result<Vec<T>> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw)
            .map_err(|e| PipelineError::Validation(format!("stored {} is invalid: {}", field, e))),
        _ => Ok(Vec::new()),
    }
}
