//! Website settings repository for database operations

use crate::db::connection::DatabasePool;
use crate::db::error::DbResult;
use crate::db::models::WebsiteSettings;
use chrono::Utc;

/// Website settings repository
#[derive(Clone)]
pub struct SettingsRepository {
    pool: DatabasePool,
    table: String,
}

impl SettingsRepository {
    pub fn new(pool: DatabasePool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    /// Get settings by website ID
    pub async fn get(&self, website_id: &str) -> DbResult<Option<WebsiteSettings>> {
        let sql = format!("SELECT * FROM {} WHERE website_id = ?", self.table);
        let settings = sqlx::query_as::<_, WebsiteSettings>(&sql)
            .bind(website_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(settings)
    }

    /// List all settings records
    pub async fn list(&self) -> DbResult<Vec<WebsiteSettings>> {
        let sql = format!("SELECT * FROM {} ORDER BY website_id", self.table);
        let settings = sqlx::query_as::<_, WebsiteSettings>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(settings)
    }

    /// Insert or replace a settings record. Used by out-of-band seeding only.
    pub async fn upsert(&self, settings: &WebsiteSettings) -> DbResult<WebsiteSettings> {
        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "INSERT INTO {} (
                website_id, website_description, brand_tone, target_audience,
                article_length_min, article_length_max, primary_color, secondary_color,
                image_style, image_aspect_ratio, image_style_preference, num_image_prompts,
                core_keywords, seo_instructions, formatting_notes, text_model, image_model,
                is_active, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(website_id) DO UPDATE SET
                website_description = excluded.website_description,
                brand_tone = excluded.brand_tone,
                target_audience = excluded.target_audience,
                article_length_min = excluded.article_length_min,
                article_length_max = excluded.article_length_max,
                primary_color = excluded.primary_color,
                secondary_color = excluded.secondary_color,
                image_style = excluded.image_style,
                image_aspect_ratio = excluded.image_aspect_ratio,
                image_style_preference = excluded.image_style_preference,
                num_image_prompts = excluded.num_image_prompts,
                core_keywords = excluded.core_keywords,
                seo_instructions = excluded.seo_instructions,
                formatting_notes = excluded.formatting_notes,
                text_model = excluded.text_model,
                image_model = excluded.image_model,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at
             RETURNING *",
            self.table
        );

        let saved = sqlx::query_as::<_, WebsiteSettings>(&sql)
            .bind(&settings.website_id)
            .bind(&settings.website_description)
            .bind(&settings.brand_tone)
            .bind(&settings.target_audience)
            .bind(settings.article_length_min)
            .bind(settings.article_length_max)
            .bind(&settings.primary_color)
            .bind(&settings.secondary_color)
            .bind(&settings.image_style)
            .bind(&settings.image_aspect_ratio)
            .bind(&settings.image_style_preference)
            .bind(settings.num_image_prompts)
            .bind(&settings.core_keywords)
            .bind(&settings.seo_instructions)
            .bind(&settings.formatting_notes)
            .bind(&settings.text_model)
            .bind(&settings.image_model)
            .bind(settings.is_active)
            .bind(&settings.created_at)
            .bind(&now)
            .fetch_one(&self.pool)
            .await?;

        Ok(saved)
    }

    /// Switch a site on or off
    pub async fn set_active(&self, website_id: &str, active: bool) -> DbResult<bool> {
        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "UPDATE {} SET is_active = ?, updated_at = ? WHERE website_id = ?",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(active)
            .bind(&now)
            .bind(website_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
