//! Clients that start workflow runs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::{WorkflowError, WorkflowInput};

/// Body of a start-run call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRunRequest {
    pub workflow: String,
    pub run_name: String,
    pub input: WorkflowInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartRunResponse {
    run_id: String,
}

/// Starts runs of a deployed workflow and returns the run id
#[async_trait]
pub trait WorkflowClient: Send + Sync {
    async fn start_run(&self, request: &StartRunRequest) -> Result<String, WorkflowError>;
}

/// JSON-over-HTTP client: `POST <endpoint>/executions`
#[derive(Debug, Clone)]
pub struct HttpWorkflowClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpWorkflowClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, WorkflowError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(crate::version::user_agent())
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    fn executions_url(&self) -> String {
        format!("{}/executions", self.endpoint)
    }
}

#[async_trait]
impl WorkflowClient for HttpWorkflowClient {
    async fn start_run(&self, request: &StartRunRequest) -> Result<String, WorkflowError> {
        let url = self.executions_url();
        debug!(url = %url, run_name = %request.run_name, "Starting workflow run");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    WorkflowError::Unavailable(e.to_string())
                } else {
                    WorkflowError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WorkflowError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: StartRunResponse = response
            .json()
            .await
            .map_err(|e| WorkflowError::InvalidResponse(e.to_string()))?;
        if parsed.run_id.trim().is_empty() {
            return Err(WorkflowError::InvalidResponse("empty runId".to_string()));
        }

        info!(workflow = %request.workflow, run_id = %parsed.run_id, "Workflow run started");
        Ok(parsed.run_id)
    }
}

/// Stand-in used when no endpoint is configured; every start fails with a
/// configuration error, while steps and status reads keep working.
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredWorkflowClient;

#[async_trait]
impl WorkflowClient for UnconfiguredWorkflowClient {
    async fn start_run(&self, _request: &StartRunRequest) -> Result<String, WorkflowError> {
        Err(WorkflowError::NotConfigured(
            "set WORKFLOW_ENDPOINT to trigger runs".to_string(),
        ))
    }
}
