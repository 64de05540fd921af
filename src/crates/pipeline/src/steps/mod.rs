//! Step functions invoked by the external workflow
//!
//! Each step is a stateless async function taking a [`StepContext`] and a
//! typed input, returning a typed output. Steps pass data by pointer: large
//! artifacts go to the blob store and only their URIs travel between steps.
//! No step retries, caches or coordinates with another; the orchestrator
//! owns all of that.

pub mod assemble;
pub mod image_gen;
pub mod image_prompt;
pub mod metadata;
pub mod refine;
pub mod research;
pub mod update_status;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::ai::AiProvider;
use crate::config::AiConfig;
use crate::db::{Post, PostRepository, SettingsRepository, WebsiteSettings};
use crate::storage::{BlobStore, BlobUri, PostPrefix};
use crate::{PipelineError, Result};

pub use assemble::{AssembleInput, AssembleOutput};
pub use image_gen::ImageGenInput;
pub use image_prompt::{ImagePromptInput, ImagePromptOutput};
pub use metadata::MetadataInput;
pub use refine::{RefineInput, RefineOutput};
pub use research::{ResearchInput, ResearchOutput};
pub use update_status::{UpdateStatusInput, UpdateStatusOutput};

pub const MARKDOWN_CONTENT_TYPE: &str = "text/markdown; charset=utf-8";
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Models used when a site's settings do not name one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDefaults {
    pub text_model: String,
    pub image_model: String,
}

impl From<&AiConfig> for ModelDefaults {
    fn from(config: &AiConfig) -> Self {
        Self {
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
        }
    }
}

/// Everything a step may touch
#[derive(Clone)]
pub struct StepContext {
    pub posts: PostRepository,
    pub settings: SettingsRepository,
    pub store: Arc<dyn BlobStore>,
    pub ai: Arc<dyn AiProvider>,
    pub models: ModelDefaults,
}

/// A post together with its owning site's settings
#[derive(Debug, Clone)]
pub struct Site {
    pub post: Post,
    pub settings: WebsiteSettings,
    pub prefix: PostPrefix,
}

impl Site {
    /// Title from the step input when given, else the stored one
    pub fn title<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.post.blog_title)
    }
}

impl StepContext {
    /// Load a post and its settings, checking ownership and that the site
    /// is active.
    pub async fn load_site(&self, post_id: &str, website_id: &str) -> Result<Site> {
        if post_id.trim().is_empty() {
            return Err(PipelineError::Validation("postId is required".to_string()));
        }
        if website_id.trim().is_empty() {
            return Err(PipelineError::Validation("websiteId is required".to_string()));
        }

        let post = self
            .posts
            .get(post_id)
            .await?
            .ok_or_else(|| PipelineError::PostNotFound(post_id.to_string()))?;

        if post.website_id != website_id {
            return Err(PipelineError::WebsiteMismatch {
                post_id: post_id.to_string(),
                expected: post.website_id.clone(),
                actual: website_id.to_string(),
            });
        }

        let settings = self
            .settings
            .get(website_id)
            .await?
            .ok_or_else(|| PipelineError::SettingsNotFound(website_id.to_string()))?;
        if !settings.is_active {
            return Err(PipelineError::InactiveSite(website_id.to_string()));
        }

        let prefix = PostPrefix::new(website_id, post_id)?;
        Ok(Site {
            post,
            settings,
            prefix,
        })
    }

    /// Parse a pointer handed in by the orchestrator and make sure it
    /// belongs to this post.
    pub fn owned_pointer(&self, site: &Site, raw: &str, field: &str) -> Result<BlobUri> {
        let uri: BlobUri = raw
            .parse()
            .map_err(|e| PipelineError::Validation(format!("{}: {}", field, e)))?;
        if !site.prefix.contains(&uri) {
            return Err(PipelineError::Validation(format!(
                "{} {} is outside {}",
                field,
                uri,
                site.prefix.as_str()
            )));
        }
        Ok(uri)
    }

    /// Read a text artifact of this post
    pub async fn read_text(&self, site: &Site, raw: &str, field: &str) -> Result<String> {
        let uri = self.owned_pointer(site, raw, field)?;
        Ok(self.store.get_text(&uri).await?)
    }

    /// Chat completion whose reply must not be blank
    pub async fn complete_text(&self, request: llm::ChatRequest) -> Result<String> {
        let reply = self.ai.complete(request).await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(PipelineError::MalformedResponse(
                "model returned empty content".to_string(),
            ));
        }
        Ok(reply.to_string())
    }
}

/// Step names as used in URLs, the CLI and the workflow definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Research,
    Refine,
    ImagePrompt,
    ImageGen,
    Metadata,
    Assemble,
    UpdateStatus,
}

impl StepKind {
    pub const ALL: [StepKind; 7] = [
        StepKind::Research,
        StepKind::Refine,
        StepKind::ImagePrompt,
        StepKind::ImageGen,
        StepKind::Metadata,
        StepKind::Assemble,
        StepKind::UpdateStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Research => "research",
            StepKind::Refine => "refine",
            StepKind::ImagePrompt => "image_prompt",
            StepKind::ImageGen => "image_gen",
            StepKind::Metadata => "metadata",
            StepKind::Assemble => "assemble",
            StepKind::UpdateStatus => "update_status",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        StepKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| PipelineError::Validation(format!("unknown step '{}'", s)))
    }
}

async fn invoke<I, O, F, Fut>(input: Value, f: F) -> Result<Value>
where
    I: DeserializeOwned,
    O: Serialize,
    F: FnOnce(I) -> Fut,
    Fut: Future<Output = Result<O>>,
{
    let input: I = serde_json::from_value(input)
        .map_err(|e| PipelineError::Validation(format!("invalid step input: {}", e)))?;
    let output = f(input).await?;
    Ok(serde_json::to_value(output)?)
}

/// Run one step on raw JSON input, returning its JSON output
pub async fn run_step(ctx: &StepContext, kind: StepKind, input: Value) -> Result<Value> {
    let post_id = input
        .get("postId")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let started = Instant::now();
    info!(step = %kind, post_id = %post_id, "Step started");

    let result = match kind {
        StepKind::Research => invoke(input, |i| research::run(ctx, i)).await,
        StepKind::Refine => invoke(input, |i| refine::run(ctx, i)).await,
        StepKind::ImagePrompt => invoke(input, |i| image_prompt::run(ctx, i)).await,
        StepKind::ImageGen => invoke(input, |i| image_gen::run(ctx, i)).await,
        StepKind::Metadata => invoke(input, |i| metadata::run(ctx, i)).await,
        StepKind::Assemble => invoke(input, |i| assemble::run(ctx, i)).await,
        StepKind::UpdateStatus => invoke(input, |i| update_status::run(ctx, i)).await,
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => info!(step = %kind, post_id = %post_id, elapsed_ms, "Step finished"),
        Err(e) => error!(
            step = %kind,
            post_id = %post_id,
            elapsed_ms,
            kind = e.kind().as_str(),
            retryable = e.is_retryable(),
            error = %e,
            "Step failed"
        ),
    }
    result
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::ai::ScriptedProvider;
    use crate::db::{ensure_schema, DatabaseConnection};
    use crate::storage::MemoryBlobStore;

    pub struct Harness {
        pub ctx: StepContext,
        pub store: MemoryBlobStore,
        pub ai: ScriptedProvider,
        pub db: DatabaseConnection,
    }

    pub async fn harness(ai: ScriptedProvider) -> Harness {
        let db = DatabaseConnection::in_memory().await.unwrap();
        ensure_schema(db.pool(), "posts", "website_settings").await.unwrap();
        let store = MemoryBlobStore::new("content");
        let posts = PostRepository::new(db.pool().clone(), "posts");
        let settings = SettingsRepository::new(db.pool().clone(), "website_settings");

        settings
            .upsert(
                &WebsiteSettings::new("site-1")
                    .with_description("Marine life for families")
                    .with_keywords(["tide pools"])
                    .with_num_image_prompts(2),
            )
            .await
            .unwrap();
        posts
            .create(&crate::db::Post::new("post-1", "site-1", "Tide pools").with_created_at("2026-03-01T09:00:00Z"))
            .await
            .unwrap();

        let ctx = StepContext {
            posts,
            settings,
            store: Arc::new(store.clone()),
            ai: Arc::new(ai.clone()),
            models: ModelDefaults::from(&AiConfig::default()),
        };
        Harness { ctx, store, ai, db }
    }
}
