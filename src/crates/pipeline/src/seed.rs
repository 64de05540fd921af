//! Import of website settings and posts from a JSON document
//!
//! Settings are records the pipeline never writes during a run; this is how
//! local and test deployments populate them. Existing posts are left alone.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::{Post, PostRepository, SettingsRepository, WebsiteSettings};
use crate::{PipelineError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeedSettings {
    pub website_id: String,
    pub website_description: Option<String>,
    pub brand_tone: Option<String>,
    pub target_audience: Option<String>,
    pub article_length_min: Option<i64>,
    pub article_length_max: Option<i64>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub image_style: Option<String>,
    pub image_aspect_ratio: Option<String>,
    pub image_style_preference: Option<String>,
    pub num_image_prompts: Option<i64>,
    #[serde(default)]
    pub core_keywords: Vec<String>,
    pub seo_instructions: Option<String>,
    pub formatting_notes: Option<String>,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeedPost {
    pub post_id: String,
    pub website_id: String,
    pub blog_title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedDocument {
    pub settings: Vec<SeedSettings>,
    pub posts: Vec<SeedPost>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSummary {
    pub settings: usize,
    pub posts_created: usize,
    pub posts_skipped: usize,
}

impl SeedSettings {
    fn into_settings(self) -> Result<WebsiteSettings> {
        let keywords = if self.core_keywords.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&self.core_keywords)?)
        };
        let mut settings = WebsiteSettings::new(self.website_id);
        settings.website_description = self.website_description;
        settings.brand_tone = self.brand_tone;
        settings.target_audience = self.target_audience;
        settings.article_length_min = self.article_length_min;
        settings.article_length_max = self.article_length_max;
        settings.primary_color = self.primary_color;
        settings.secondary_color = self.secondary_color;
        settings.image_style = self.image_style;
        settings.image_aspect_ratio = self.image_aspect_ratio;
        settings.image_style_preference = self.image_style_preference;
        settings.num_image_prompts = self.num_image_prompts;
        settings.core_keywords = keywords;
        settings.seo_instructions = self.seo_instructions;
        settings.formatting_notes = self.formatting_notes;
        settings.text_model = self.text_model;
        settings.image_model = self.image_model;
        settings.is_active = self.is_active;
        Ok(settings)
    }
}

pub fn parse_seed(raw: &str) -> Result<SeedDocument> {
    serde_json::from_str(raw).map_err(|e| PipelineError::Validation(format!("invalid seed file: {}", e)))
}

/// Upsert every settings record, then create posts that do not exist yet
pub async fn apply_seed(
    document: SeedDocument,
    settings_repo: &SettingsRepository,
    posts: &PostRepository,
) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for entry in document.settings {
        if entry.website_id.trim().is_empty() {
            return Err(PipelineError::Validation("settings entry without websiteId".to_string()));
        }
        settings_repo.upsert(&entry.into_settings()?).await?;
        summary.settings += 1;
    }

    for entry in document.posts {
        if entry.post_id.trim().is_empty() || entry.blog_title.trim().is_empty() {
            return Err(PipelineError::Validation(
                "post entries need postId and blogTitle".to_string(),
            ));
        }
        if settings_repo.get(&entry.website_id).await?.is_none() {
            return Err(PipelineError::SettingsNotFound(entry.website_id));
        }
        if posts.get(&entry.post_id).await?.is_some() {
            summary.posts_skipped += 1;
            continue;
        }
        let mut post = Post::new(entry.post_id, entry.website_id, entry.blog_title);
        post.description = entry.description;
        posts.create(&post).await?;
        summary.posts_created += 1;
    }

    info!(
        settings = summary.settings,
        posts_created = summary.posts_created,
        posts_skipped = summary.posts_skipped,
        "Seed applied"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ensure_schema, DatabaseConnection};

    const SEED: &str = r#"{
        "settings": [
            {"websiteId": "site-1", "coreKeywords": ["tide pools", "crabs"], "numImagePrompts": 2},
            {"websiteId": "site-2", "isActive": false}
        ],
        "posts": [
            {"postId": "post-1", "websiteId": "site-1", "blogTitle": "Tide pools"}
        ]
    }"#;

    async fn repos() -> (SettingsRepository, PostRepository) {
        let db = DatabaseConnection::in_memory().await.unwrap();
        ensure_schema(db.pool(), "posts", "website_settings").await.unwrap();
        (
            SettingsRepository::new(db.pool().clone(), "website_settings"),
            PostRepository::new(db.pool().clone(), "posts"),
        )
    }

    #[tokio::test]
    async fn test_apply_seed_is_repeatable() {
        let (settings, posts) = repos().await;

        let summary = apply_seed(parse_seed(SEED).unwrap(), &settings, &posts).await.unwrap();
        assert_eq!(summary.settings, 2);
        assert_eq!(summary.posts_created, 1);

        let site = settings.get("site-1").await.unwrap().unwrap();
        assert_eq!(site.keywords(), vec!["tide pools", "crabs"]);
        assert!(!settings.get("site-2").await.unwrap().unwrap().is_active);

        let again = apply_seed(parse_seed(SEED).unwrap(), &settings, &posts).await.unwrap();
        assert_eq!(again.posts_created, 0);
        assert_eq!(again.posts_skipped, 1);
    }

    #[tokio::test]
    async fn test_post_for_unknown_site_is_rejected() {
        let (settings, posts) = repos().await;
        let doc = parse_seed(r#"{"posts": [{"postId": "p", "websiteId": "nope", "blogTitle": "T"}]}"#).unwrap();
        assert!(matches!(
            apply_seed(doc, &settings, &posts).await,
            Err(PipelineError::SettingsNotFound(_))
        ));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(parse_seed(r#"{"settings": [{"websiteId": "s", "colour": "red"}]}"#).is_err());
    }
}
