//! Starting runs and reporting their status
//!
//! The trigger owns the only write that happens outside a workflow run: the
//! pending/failed to processing claim. A claim is a conditional update, so
//! two concurrent triggers for one post start at most one run.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::db::{Post, PostRepository, SettingsRepository};
use crate::workflow::{run_name, StartRunRequest, WorkflowClient, WorkflowInput};
use crate::{PipelineError, PostStatus, Result};

/// Acknowledgement returned when a run was started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerReceipt {
    pub post_id: String,
    pub run_id: String,
    pub status: PostStatus,
}

/// Current state of a post and its latest run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    pub post_id: String,
    pub run_id: Option<String>,
    pub status: PostStatus,
    /// Final document pointer, present only once the post is complete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: String,
}

impl RunStatus {
    pub fn from_post(post: &Post) -> Result<Self> {
        Ok(Self {
            post_id: post.post_id.clone(),
            run_id: post.run_id.clone(),
            status: post.status()?,
            result_uri: post.result_uri().map(str::to_string),
            error: post.error_message.clone(),
            updated_at: post.updated_at.clone(),
        })
    }
}

pub struct TriggerService {
    posts: PostRepository,
    settings: SettingsRepository,
    workflow: Arc<dyn WorkflowClient>,
    workflow_name: String,
}

impl TriggerService {
    pub fn new(
        posts: PostRepository,
        settings: SettingsRepository,
        workflow: Arc<dyn WorkflowClient>,
        workflow_name: impl Into<String>,
    ) -> Self {
        Self {
            posts,
            settings,
            workflow,
            workflow_name: workflow_name.into(),
        }
    }

    /// Start a workflow run for a post.
    ///
    /// The post must exist, belong to an active site and be pending or
    /// failed. If the workflow service refuses the run, the post is marked
    /// failed so a later trigger can retry it.
    pub async fn trigger(&self, post_id: &str) -> Result<TriggerReceipt> {
        let post_id = post_id.trim();
        if post_id.is_empty() {
            return Err(PipelineError::Validation("postId is required".to_string()));
        }

        let post = self
            .posts
            .get(post_id)
            .await?
            .ok_or_else(|| PipelineError::PostNotFound(post_id.to_string()))?;

        let settings = self
            .settings
            .get(&post.website_id)
            .await?
            .ok_or_else(|| PipelineError::SettingsNotFound(post.website_id.clone()))?;
        if !settings.is_active {
            return Err(PipelineError::InactiveSite(post.website_id.clone()));
        }

        if !self.posts.claim_for_run(post_id).await? {
            let current = post.status()?;
            warn!(post_id = %post_id, status = %current, "Trigger refused, post not startable");
            return Err(PipelineError::Conflict(format!(
                "post {} is {} and cannot start a new run",
                post_id, current
            )));
        }

        let request = StartRunRequest {
            workflow: self.workflow_name.clone(),
            run_name: run_name(post_id),
            input: WorkflowInput::from(&post),
        };

        let run_id = match self.workflow.start_run(&request).await {
            Ok(run_id) => run_id,
            Err(e) => {
                error!(post_id = %post_id, error = %e, "Failed to start workflow run");
                let reason = format!("failed to start workflow run: {}", e);
                if let Err(mark_err) = self.posts.mark_failed(post_id, &reason).await {
                    error!(post_id = %post_id, error = %mark_err, "Failed to record start failure");
                }
                return Err(e.into());
            }
        };

        self.posts.set_run_id(post_id, &run_id).await?;
        info!(post_id = %post_id, run_id = %run_id, run_name = %request.run_name, "Run triggered");

        Ok(TriggerReceipt {
            post_id: post_id.to_string(),
            run_id,
            status: PostStatus::Processing,
        })
    }

    /// Status of the post a run belongs to
    pub async fn run_status(&self, run_id: &str) -> Result<RunStatus> {
        let post = self
            .posts
            .find_by_run_id(run_id)
            .await?
            .ok_or_else(|| PipelineError::PostNotFound(format!("run {}", run_id)))?;
        RunStatus::from_post(&post)
    }

    pub async fn post_status(&self, post_id: &str) -> Result<RunStatus> {
        let post = self
            .posts
            .get(post_id)
            .await?
            .ok_or_else(|| PipelineError::PostNotFound(post_id.to_string()))?;
        RunStatus::from_post(&post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ensure_schema, DatabaseConnection, WebsiteSettings};
    use crate::workflow::{UnconfiguredWorkflowClient, WorkflowError};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingClient {
        started: Mutex<Vec<StartRunRequest>>,
    }

    #[async_trait]
    impl WorkflowClient for RecordingClient {
        async fn start_run(&self, request: &StartRunRequest) -> std::result::Result<String, WorkflowError> {
            let mut started = self.started.lock();
            started.push(request.clone());
            Ok(format!("run-{}", started.len()))
        }
    }

    async fn service(client: Arc<dyn WorkflowClient>) -> (TriggerService, PostRepository, SettingsRepository) {
        let db = DatabaseConnection::in_memory().await.unwrap();
        ensure_schema(db.pool(), "posts", "website_settings").await.unwrap();
        let posts = PostRepository::new(db.pool().clone(), "posts");
        let settings = SettingsRepository::new(db.pool().clone(), "website_settings");
        settings.upsert(&WebsiteSettings::new("site-1")).await.unwrap();
        posts
            .create(&Post::new("post-1", "site-1", "Tide pools").with_description("Safety first"))
            .await
            .unwrap();
        let trigger = TriggerService::new(posts.clone(), settings.clone(), client, "content-pipeline");
        (trigger, posts, settings)
    }

    #[tokio::test]
    async fn test_trigger_starts_one_run() {
        let client = Arc::new(RecordingClient::default());
        let (trigger, posts, _) = service(client.clone()).await;

        let receipt = trigger.trigger("post-1").await.unwrap();
        assert_eq!(receipt.run_id, "run-1");
        assert_eq!(receipt.status, PostStatus::Processing);

        let started = client.started.lock().clone();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].workflow, "content-pipeline");
        assert_eq!(started[0].input.description.as_deref(), Some("Safety first"));

        let post = posts.get("post-1").await.unwrap().unwrap();
        assert_eq!(post.run_id.as_deref(), Some("run-1"));

        let err = trigger.trigger("post-1").await.unwrap_err();
        assert!(matches!(err, PipelineError::Conflict(_)));
        assert_eq!(client.started.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_trigger_validation() {
        let (trigger, posts, settings) = service(Arc::new(RecordingClient::default())).await;

        assert!(matches!(trigger.trigger("  ").await, Err(PipelineError::Validation(_))));
        assert!(matches!(trigger.trigger("nope").await, Err(PipelineError::PostNotFound(_))));

        settings.set_active("site-1", false).await.unwrap();
        assert!(matches!(trigger.trigger("post-1").await, Err(PipelineError::InactiveSite(_))));
        let post = posts.get("post-1").await.unwrap().unwrap();
        assert_eq!(post.status().unwrap(), PostStatus::Pending);
    }

    #[tokio::test]
    async fn test_start_failure_marks_post_failed_and_allows_retry() {
        let (trigger, posts, settings) = service(Arc::new(UnconfiguredWorkflowClient)).await;

        let err = trigger.trigger("post-1").await.unwrap_err();
        assert!(matches!(err, PipelineError::Workflow(WorkflowError::NotConfigured(_))));

        let post = posts.get("post-1").await.unwrap().unwrap();
        assert_eq!(post.status().unwrap(), PostStatus::Failed);
        assert!(post.error_message.unwrap().contains("not configured"));

        let retry = TriggerService::new(
            posts.clone(),
            settings,
            Arc::new(RecordingClient::default()),
            "content-pipeline",
        );
        assert!(retry.trigger("post-1").await.is_ok());
        let status = retry.post_status("post-1").await.unwrap();
        assert_eq!(status.status, PostStatus::Processing);
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn test_run_status_lookup() {
        let (trigger, posts, _) = service(Arc::new(RecordingClient::default())).await;
        trigger.trigger("post-1").await.unwrap();

        let status = trigger.run_status("run-1").await.unwrap();
        assert_eq!(status.post_id, "post-1");
        assert!(status.result_uri.is_none());

        posts
            .complete("post-1", "file://content/site-1/post-1/final.md", "[]")
            .await
            .unwrap();
        let status = trigger.run_status("run-1").await.unwrap();
        assert_eq!(status.status, PostStatus::Complete);
        assert_eq!(status.result_uri.as_deref(), Some("file://content/site-1/post-1/final.md"));

        assert!(matches!(trigger.run_status("run-9").await, Err(PipelineError::PostNotFound(_))));
    }
}
