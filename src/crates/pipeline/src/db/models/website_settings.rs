//! Website settings model for database persistence

use llm::{ImageSize, ImageStyle};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_ARTICLE_LENGTH_MIN: u32 = 1500;
pub const DEFAULT_ARTICLE_LENGTH_MAX: u32 = 2500;
pub const DEFAULT_IMAGE_PROMPTS: usize = 3;
pub const MAX_IMAGE_PROMPTS: usize = 10;

/// Per-site brand and style configuration consumed by every step
///
/// Populated out of band; the pipeline only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteSettings {
    pub website_id: String,
    pub website_description: Option<String>,
    pub brand_tone: Option<String>,
    pub target_audience: Option<String>,
    pub article_length_min: Option<i64>,
    pub article_length_max: Option<i64>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    /// Free-text art direction appended to image prompts
    pub image_style: Option<String>,
    /// "16:9", "9:16" or "1:1"
    pub image_aspect_ratio: Option<String>,
    /// "vivid" or "natural"
    pub image_style_preference: Option<String>,
    pub num_image_prompts: Option<i64>,
    /// JSON list of keywords
    pub core_keywords: Option<String>,
    pub seo_instructions: Option<String>,
    pub formatting_notes: Option<String>,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl WebsiteSettings {
    /// Active settings with every optional field unset
    pub fn new(website_id: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            website_id: website_id.into(),
            website_description: None,
            brand_tone: None,
            target_audience: None,
            article_length_min: None,
            article_length_max: None,
            primary_color: None,
            secondary_color: None,
            image_style: None,
            image_aspect_ratio: None,
            image_style_preference: None,
            num_image_prompts: None,
            core_keywords: None,
            seo_instructions: None,
            formatting_notes: None,
            text_model: None,
            image_model: None,
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.website_description = Some(description.into());
        self
    }

    pub fn with_brand_tone(mut self, tone: impl Into<String>) -> Self {
        self.brand_tone = Some(tone.into());
        self
    }

    pub fn with_target_audience(mut self, audience: impl Into<String>) -> Self {
        self.target_audience = Some(audience.into());
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<String> = keywords.into_iter().map(Into::into).collect();
        self.core_keywords = serde_json::to_string(&list).ok();
        self
    }

    pub fn with_num_image_prompts(mut self, count: i64) -> Self {
        self.num_image_prompts = Some(count);
        self
    }

    pub fn with_image_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.image_aspect_ratio = Some(ratio.into());
        self
    }

    pub fn with_formatting_notes(mut self, notes: impl Into<String>) -> Self {
        self.formatting_notes = Some(notes.into());
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    /// Core keywords. Accepts a JSON list or, for hand-edited rows, a
    /// comma-separated string.
    pub fn keywords(&self) -> Vec<String> {
        let raw = match self.core_keywords.as_deref() {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Vec::new(),
        };

        match serde_json::from_str::<Vec<String>>(raw) {
            Ok(list) => list
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            Err(_) => raw
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Target article length in words; invalid or missing bounds fall back
    /// to the defaults.
    pub fn length_bounds(&self) -> (u32, u32) {
        let positive = |v: Option<i64>| v.filter(|v| *v > 0).and_then(|v| u32::try_from(v).ok());

        let min = positive(self.article_length_min).unwrap_or(DEFAULT_ARTICLE_LENGTH_MIN);
        let max = positive(self.article_length_max)
            .filter(|max| *max >= min)
            .unwrap_or_else(|| DEFAULT_ARTICLE_LENGTH_MAX.max(min));
        (min, max)
    }

    /// Number of image prompts to request, clamped to 1..=10
    pub fn image_count(&self) -> usize {
        match self.num_image_prompts {
            Some(n) if n > 0 => (n as usize).min(MAX_IMAGE_PROMPTS),
            _ => DEFAULT_IMAGE_PROMPTS,
        }
    }

    pub fn image_size(&self) -> ImageSize {
        ImageSize::from_aspect_ratio(self.image_aspect_ratio.as_deref().unwrap_or("1:1"))
    }

    pub fn image_style_preference(&self) -> ImageStyle {
        ImageStyle::from_preference(self.image_style_preference.as_deref())
    }

    /// Site text model, or the given default
    pub fn text_model_or<'a>(&'a self, default: &'a str) -> &'a str {
        non_blank(self.text_model.as_deref()).unwrap_or(default)
    }

    /// Site image model, or the given default
    pub fn image_model_or<'a>(&'a self, default: &'a str) -> &'a str {
        non_blank(self.image_model.as_deref()).unwrap_or(default)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
