//! Table creation for configurable table names

use crate::db::connection::DatabasePool;

/// Create the posts and settings tables if they do not exist.
///
/// Table names must already have passed config validation (plain identifiers).
pub async fn ensure_schema(
    pool: &DatabasePool,
    posts_table: &str,
    settings_table: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {settings_table} (
            website_id TEXT PRIMARY KEY NOT NULL,
            website_description TEXT,
            brand_tone TEXT,
            target_audience TEXT,
            article_length_min INTEGER,
            article_length_max INTEGER,
            primary_color TEXT,
            secondary_color TEXT,
            image_style TEXT,
            image_aspect_ratio TEXT,
            image_style_preference TEXT,
            num_image_prompts INTEGER,
            core_keywords TEXT,
            seo_instructions TEXT,
            formatting_notes TEXT,
            text_model TEXT,
            image_model TEXT,
            is_active BOOLEAN NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )"
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {posts_table} (
            post_id TEXT PRIMARY KEY NOT NULL,
            website_id TEXT NOT NULL,
            blog_title TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            research_article_uri TEXT,
            refined_article_uri TEXT,
            image_prompts TEXT,
            image_uris TEXT,
            metadata TEXT,
            markdown_uri TEXT,
            run_id TEXT,
            error_message TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK (status IN ('pending', 'processing', 'generating_images', 'complete', 'failed'))
        )"
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{posts_table}_run_id ON {posts_table} (run_id)"
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{posts_table}_website_id ON {posts_table} (website_id)"
    ))
    .execute(pool)
    .await?;

    Ok(())
}
