//! Post repository for database operations

use crate::db::connection::DatabasePool;
use crate::db::error::DbResult;
use crate::db::models::Post;
use crate::PostStatus;
use chrono::Utc;

/// Post repository
///
/// Status changes are conditional updates (`WHERE status IN (...)`) so that
/// concurrent writers cannot move a post through an illegal transition.
#[derive(Clone)]
pub struct PostRepository {
    pool: DatabasePool,
    table: String,
}

impl PostRepository {
    pub fn new(pool: DatabasePool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Insert a new post
    pub async fn create(&self, post: &Post) -> DbResult<Post> {
        let sql = format!(
            "INSERT INTO {} (post_id, website_id, blog_title, description, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING *",
            self.table
        );
        let created = sqlx::query_as::<_, Post>(&sql)
            .bind(&post.post_id)
            .bind(&post.website_id)
            .bind(&post.blog_title)
            .bind(&post.description)
            .bind(&post.status)
            .bind(&post.created_at)
            .bind(&post.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    /// Get a post by ID
    pub async fn get(&self, post_id: &str) -> DbResult<Option<Post>> {
        let sql = format!("SELECT * FROM {} WHERE post_id = ?", self.table);
        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    /// Find the post a workflow run belongs to
    pub async fn find_by_run_id(&self, run_id: &str) -> DbResult<Option<Post>> {
        let sql = format!("SELECT * FROM {} WHERE run_id = ?", self.table);
        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    /// List posts for a website, newest first
    pub async fn list_by_website(&self, website_id: &str) -> DbResult<Vec<Post>> {
        let sql = format!(
            "SELECT * FROM {} WHERE website_id = ? ORDER BY created_at DESC",
            self.table
        );
        let posts = sqlx::query_as::<_, Post>(&sql)
            .bind(website_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(posts)
    }

    /// Atomically move a post from pending/failed to processing.
    ///
    /// Clears the previous run's id, error and result pointer. Returns false
    /// when the post is missing or already running or complete.
    pub async fn claim_for_run(&self, post_id: &str) -> DbResult<bool> {
        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "UPDATE {} SET status = ?, run_id = NULL, error_message = NULL, markdown_uri = NULL,
                 image_uris = NULL, updated_at = ?
             WHERE post_id = ? AND status IN (?, ?)",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(PostStatus::Processing.as_str())
            .bind(&now)
            .bind(post_id)
            .bind(PostStatus::Pending.as_str())
            .bind(PostStatus::Failed.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Record the workflow run id for a post
    pub async fn set_run_id(&self, post_id: &str, run_id: &str) -> DbResult<()> {
        self.update_column(post_id, "run_id", Some(run_id)).await
    }

    /// Conditionally change status. Returns false if the stored status was
    /// not `from` (someone else moved it first).
    pub async fn transition(
        &self,
        post_id: &str,
        from: PostStatus,
        to: PostStatus,
    ) -> DbResult<bool> {
        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "UPDATE {} SET status = ?, updated_at = ? WHERE post_id = ? AND status = ?",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(to.as_str())
            .bind(&now)
            .bind(post_id)
            .bind(from.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Mark a post failed, recording the reason and withdrawing any result
    /// pointer in the same statement. Complete posts are left untouched.
    pub async fn mark_failed(&self, post_id: &str, error_message: &str) -> DbResult<bool> {
        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "UPDATE {} SET status = ?, error_message = ?, markdown_uri = NULL, updated_at = ?
             WHERE post_id = ? AND status != ?",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(PostStatus::Failed.as_str())
            .bind(error_message)
            .bind(&now)
            .bind(post_id)
            .bind(PostStatus::Complete.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Record the final document, image pointers and `complete` status together.
    pub async fn complete(
        &self,
        post_id: &str,
        markdown_uri: &str,
        image_uris_json: &str,
    ) -> DbResult<bool> {
        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "UPDATE {} SET status = ?, markdown_uri = ?, image_uris = ?, error_message = NULL, updated_at = ?
             WHERE post_id = ? AND status IN (?, ?, ?)",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(PostStatus::Complete.as_str())
            .bind(markdown_uri)
            .bind(image_uris_json)
            .bind(&now)
            .bind(post_id)
            .bind(PostStatus::Processing.as_str())
            .bind(PostStatus::GeneratingImages.as_str())
            .bind(PostStatus::Complete.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn set_research_uri(&self, post_id: &str, uri: &str) -> DbResult<()> {
        self.update_column(post_id, "research_article_uri", Some(uri)).await
    }

    pub async fn set_refined_uri(&self, post_id: &str, uri: &str) -> DbResult<()> {
        self.update_column(post_id, "refined_article_uri", Some(uri)).await
    }

    pub async fn set_image_prompts(&self, post_id: &str, prompts_json: &str) -> DbResult<()> {
        self.update_column(post_id, "image_prompts", Some(prompts_json)).await
    }

    pub async fn set_metadata(&self, post_id: &str, metadata_json: &str) -> DbResult<()> {
        self.update_column(post_id, "metadata", Some(metadata_json)).await
    }

    /// Count posts in a given status
    pub async fn count_by_status(&self, status: PostStatus) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE status = ?", self.table);
        let result: (i64,) = sqlx::query_as(&sql)
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0)
    }

    async fn update_column(&self, post_id: &str, column: &'static str, value: Option<&str>) -> DbResult<()> {
        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "UPDATE {} SET {} = ?, updated_at = ? WHERE post_id = ?",
            self.table, column
        );
        sqlx::query(&sql)
            .bind(value)
            .bind(&now)
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ensure_schema, DatabaseConnection};

    async fn setup_repo() -> PostRepository {
        let conn = DatabaseConnection::in_memory().await.unwrap();
        ensure_schema(conn.pool(), "posts", "website_settings")
            .await
            .unwrap();
        PostRepository::new(conn.pool().clone(), "posts")
    }

    #[tokio::test]
    async fn test_create_and_get_post() {
        let repo = setup_repo().await;
        let post = Post::new("post-1", "site-1", "Tide pools").with_description("Intro");

        let created = repo.create(&post).await.unwrap();
        assert_eq!(created.post_id, "post-1");
        assert_eq!(created.status, "pending");

        let fetched = repo.get("post-1").await.unwrap().unwrap();
        assert_eq!(fetched.description.as_deref(), Some("Intro"));
        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_create_is_constraint_violation() {
        let repo = setup_repo().await;
        let post = Post::new("post-1", "site-1", "Tide pools");
        repo.create(&post).await.unwrap();

        let err = repo.create(&post).await.unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[tokio::test]
    async fn test_claim_only_once() {
        let repo = setup_repo().await;
        repo.create(&Post::new("post-1", "site-1", "T")).await.unwrap();

        assert!(repo.claim_for_run("post-1").await.unwrap());
        assert!(!repo.claim_for_run("post-1").await.unwrap());
        assert!(!repo.claim_for_run("missing").await.unwrap());

        let post = repo.get("post-1").await.unwrap().unwrap();
        assert_eq!(post.status().unwrap(), PostStatus::Processing);
    }

    #[tokio::test]
    async fn test_claim_after_failure_resets_run_fields() {
        let repo = setup_repo().await;
        repo.create(&Post::new("post-1", "site-1", "T")).await.unwrap();
        repo.claim_for_run("post-1").await.unwrap();
        repo.set_run_id("post-1", "run-1").await.unwrap();
        repo.mark_failed("post-1", "provider timeout").await.unwrap();

        assert!(repo.claim_for_run("post-1").await.unwrap());
        let post = repo.get("post-1").await.unwrap().unwrap();
        assert!(post.run_id.is_none());
        assert!(post.error_message.is_none());
    }

    #[tokio::test]
    async fn test_find_by_run_id() {
        let repo = setup_repo().await;
        repo.create(&Post::new("post-1", "site-1", "T")).await.unwrap();
        repo.set_run_id("post-1", "run-abc").await.unwrap();

        let post = repo.find_by_run_id("run-abc").await.unwrap().unwrap();
        assert_eq!(post.post_id, "post-1");
        assert!(repo.find_by_run_id("run-zzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transition_is_conditional() {
        let repo = setup_repo().await;
        repo.create(&Post::new("post-1", "site-1", "T")).await.unwrap();
        repo.claim_for_run("post-1").await.unwrap();

        assert!(repo
            .transition("post-1", PostStatus::Processing, PostStatus::GeneratingImages)
            .await
            .unwrap());
        assert!(!repo
            .transition("post-1", PostStatus::Processing, PostStatus::GeneratingImages)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_complete_sets_pointer_and_status_together() {
        let repo = setup_repo().await;
        repo.create(&Post::new("post-1", "site-1", "T")).await.unwrap();

        // pending posts cannot complete
        assert!(!repo.complete("post-1", "mem://b/final.md", "[]").await.unwrap());

        repo.claim_for_run("post-1").await.unwrap();
        assert!(repo.complete("post-1", "mem://b/final.md", "[]").await.unwrap());

        let post = repo.get("post-1").await.unwrap().unwrap();
        assert_eq!(post.result_uri(), Some("mem://b/final.md"));
    }

    #[tokio::test]
    async fn test_mark_failed_clears_pointer_but_not_complete_posts() {
        let repo = setup_repo().await;
        repo.create(&Post::new("post-1", "site-1", "T")).await.unwrap();
        repo.claim_for_run("post-1").await.unwrap();
        repo.complete("post-1", "mem://b/final.md", "[]").await.unwrap();

        assert!(!repo.mark_failed("post-1", "late failure").await.unwrap());
        let post = repo.get("post-1").await.unwrap().unwrap();
        assert_eq!(post.status().unwrap(), PostStatus::Complete);

        repo.create(&Post::new("post-2", "site-1", "T")).await.unwrap();
        repo.claim_for_run("post-2").await.unwrap();
        assert!(repo.mark_failed("post-2", "image step failed").await.unwrap());
        let post = repo.get("post-2").await.unwrap().unwrap();
        assert_eq!(post.status().unwrap(), PostStatus::Failed);
        assert!(post.result_uri().is_none());
        assert!(post.markdown_uri.is_none());
        assert_eq!(post.error_message.as_deref(), Some("image step failed"));
    }

    #[tokio::test]
    async fn test_step_output_columns() {
        let repo = setup_repo().await;
        repo.create(&Post::new("post-1", "site-1", "T")).await.unwrap();
        repo.set_research_uri("post-1", "mem://b/r.md").await.unwrap();
        repo.set_refined_uri("post-1", "mem://b/f.md").await.unwrap();
        repo.set_metadata("post-1", r#"{"metaTitle":"t","metaDescription":"d","keywords":[]}"#)
            .await
            .unwrap();

        let post = repo.get("post-1").await.unwrap().unwrap();
        assert_eq!(post.research_article_uri.as_deref(), Some("mem://b/r.md"));
        assert_eq!(post.refined_article_uri.as_deref(), Some("mem://b/f.md"));
        assert_eq!(post.metadata().unwrap().unwrap().meta_title, "t");
    }

    #[tokio::test]
    async fn test_count_by_status_and_list() {
        let repo = setup_repo().await;
        repo.create(&Post::new("post-1", "site-1", "A")).await.unwrap();
        repo.create(&Post::new("post-2", "site-1", "B")).await.unwrap();
        repo.create(&Post::new("post-3", "site-2", "C")).await.unwrap();
        repo.claim_for_run("post-1").await.unwrap();

        assert_eq!(repo.count_by_status(PostStatus::Pending).await.unwrap(), 2);
        assert_eq!(repo.count_by_status(PostStatus::Processing).await.unwrap(), 1);
        assert_eq!(repo.list_by_website("site-1").await.unwrap().len(), 2);
    }
}
