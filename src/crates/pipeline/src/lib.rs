//! AI content pipeline: step functions, trigger service and deployment scaffold
//!
//! Orchestration is delegated to an external managed workflow service. This
//! crate owns the pieces that service calls into:
//! - independently invocable step functions (research, refine, image prompts,
//!   image generation, metadata, markdown assembly, status updates)
//! - the HTTP trigger and run-status surface
//! - the declarative workflow definition and code packaging used to deploy it
//! - the post and website-settings records the steps read and update

pub mod ai;
pub mod api;
pub mod config;
pub mod db;
pub mod logging;
pub mod markdown;
pub mod package;
pub mod prompts;
pub mod secrets;
pub mod seed;
pub mod steps;
pub mod storage;
pub mod trigger;
pub mod types;
pub mod version;
pub mod workflow;

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::config::ConfigError;
use crate::db::DatabaseError;
use crate::secrets::SecretError;
use crate::storage::StorageError;
use crate::workflow::WorkflowError;

/// Errors that can occur while running pipeline operations
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Request input failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Post does not exist
    #[error("Post not found: {0}")]
    PostNotFound(String),

    /// Website settings do not exist
    #[error("Website settings not found: {0}")]
    SettingsNotFound(String),

    /// Website settings exist but are switched off
    #[error("Website is inactive: {0}")]
    InactiveSite(String),

    /// Caller supplied a website id that does not own the post
    #[error("Post {post_id} belongs to website {expected}, not {actual}")]
    WebsiteMismatch {
        post_id: String,
        expected: String,
        actual: String,
    },

    /// Post is already being processed or finished
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid state transition
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    /// Provider call failed
    #[error("External API error: {0}")]
    ExternalApi(#[from] llm::LlmError),

    /// Provider answered but the payload was unusable
    #[error("Malformed AI response: {0}")]
    MalformedResponse(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Secret error: {0}")]
    Secret(#[from] SecretError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Workflow service error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        PipelineError::Database(err.into())
    }
}

/// Coarse error classification reported to callers and the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    ExternalApi,
    Storage,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::ExternalApi => "external_api",
            ErrorKind::Storage => "storage",
            ErrorKind::Internal => "internal",
        }
    }
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation(_)
            | PipelineError::PostNotFound(_)
            | PipelineError::SettingsNotFound(_)
            | PipelineError::InactiveSite(_)
            | PipelineError::WebsiteMismatch { .. }
            | PipelineError::Conflict(_)
            | PipelineError::InvalidStateTransition { .. } => ErrorKind::Validation,
            PipelineError::ExternalApi(_)
            | PipelineError::MalformedResponse(_)
            | PipelineError::Workflow(_) => ErrorKind::ExternalApi,
            PipelineError::Storage(_) | PipelineError::Database(_) => ErrorKind::Storage,
            PipelineError::Secret(_) | PipelineError::Config(_) | PipelineError::Serialization(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether retrying the same call might succeed.
    ///
    /// Only informational for callers: retries happen in the external
    /// orchestrator, never inside this crate.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::ExternalApi(e) => e.is_retryable(),
            PipelineError::MalformedResponse(_) => true,
            PipelineError::Storage(e) => e.is_retryable(),
            PipelineError::Database(e) => e.is_retryable(),
            PipelineError::Workflow(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Lifecycle status of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    /// Created, no run started yet
    Pending,
    /// A workflow run has been started
    Processing,
    /// Image fan-out in progress
    GeneratingImages,
    /// Final document written
    Complete,
    /// Run ended in failure
    Failed,
}

impl PostStatus {
    pub const ALL: [PostStatus; 5] = [
        PostStatus::Pending,
        PostStatus::Processing,
        PostStatus::GeneratingImages,
        PostStatus::Complete,
        PostStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Pending => "pending",
            PostStatus::Processing => "processing",
            PostStatus::GeneratingImages => "generating_images",
            PostStatus::Complete => "complete",
            PostStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PostStatus::Complete | PostStatus::Failed)
    }

    /// Whether a new run may be started from this status
    pub fn can_start_run(&self) -> bool {
        matches!(self, PostStatus::Pending | PostStatus::Failed)
    }

    /// Validate a status change. Re-setting the current status is allowed so
    /// retried status steps stay harmless.
    pub fn validate_transition(&self, to: PostStatus) -> Result<()> {
        use PostStatus::*;

        let allowed = *self == to
            || matches!(
                (*self, to),
                (Pending, Processing)
                    | (Failed, Processing)
                    | (Processing, GeneratingImages)
                    | (Processing, Complete)
                    | (GeneratingImages, Complete)
                    | (Pending, Failed)
                    | (Processing, Failed)
                    | (GeneratingImages, Failed)
            );

        if allowed {
            Ok(())
        } else {
            Err(PipelineError::InvalidStateTransition {
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        PostStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| PipelineError::Validation(format!("unknown post status '{}'", s)))
    }
}

/// Get version information
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_strings() {
        for status in PostStatus::ALL {
            assert_eq!(status.as_str().parse::<PostStatus>().unwrap(), status);
        }
        assert!("running".parse::<PostStatus>().is_err());
    }

    #[test]
    fn test_status_serde_matches_column_values() {
        let json = serde_json::to_string(&PostStatus::GeneratingImages).unwrap();
        assert_eq!(json, "\"generating_images\"");
    }

    #[test]
    fn test_happy_path_transitions() {
        assert!(PostStatus::Pending.validate_transition(PostStatus::Processing).is_ok());
        assert!(PostStatus::Processing
            .validate_transition(PostStatus::GeneratingImages)
            .is_ok());
        assert!(PostStatus::GeneratingImages
            .validate_transition(PostStatus::Complete)
            .is_ok());
    }

    #[test]
    fn test_failure_and_restart_transitions() {
        assert!(PostStatus::GeneratingImages
            .validate_transition(PostStatus::Failed)
            .is_ok());
        assert!(PostStatus::Failed.validate_transition(PostStatus::Processing).is_ok());
        assert!(PostStatus::Failed.validate_transition(PostStatus::Failed).is_ok());
    }

    #[test]
    fn test_complete_is_terminal() {
        assert!(PostStatus::Complete.validate_transition(PostStatus::Complete).is_ok());
        let err = PostStatus::Complete
            .validate_transition(PostStatus::Failed)
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidStateTransition { .. }));
        assert!(PostStatus::Complete
            .validate_transition(PostStatus::Processing)
            .is_err());
    }

    #[test]
    fn test_cannot_skip_to_complete_from_pending() {
        assert!(PostStatus::Pending.validate_transition(PostStatus::Complete).is_err());
        assert!(PostStatus::Pending
            .validate_transition(PostStatus::GeneratingImages)
            .is_err());
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            PipelineError::InactiveSite("site-1".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            PipelineError::MalformedResponse("not json".into()).kind(),
            ErrorKind::ExternalApi
        );
        assert_eq!(
            PipelineError::ExternalApi(llm::LlmError::Timeout("30s".into())).kind(),
            ErrorKind::ExternalApi
        );
        assert!(PipelineError::ExternalApi(llm::LlmError::RateLimitExceeded("x".into())).is_retryable());
        assert!(!PipelineError::Validation("x".into()).is_retryable());
    }

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
