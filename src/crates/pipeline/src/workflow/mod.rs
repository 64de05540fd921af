//! Managed workflow service integration
//!
//! This crate never orchestrates. It starts runs on an external service
//! ([`WorkflowClient`]) and emits the declarative definition that service
//! executes ([`definition`]).

pub mod client;
pub mod definition;
pub mod input;

use thiserror::Error;

pub use client::{HttpWorkflowClient, StartRunRequest, UnconfiguredWorkflowClient, WorkflowClient};
pub use definition::{build_definition, DefinitionOptions};
pub use input::{run_name, WorkflowInput};

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// No workflow endpoint configured
    #[error("Workflow service is not configured: {0}")]
    NotConfigured(String),

    #[error("Workflow service unavailable: {0}")]
    Unavailable(String),

    #[error("Workflow service rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid response from workflow service: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl WorkflowError {
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkflowError::Unavailable(_) | WorkflowError::Http(_) => true,
            WorkflowError::Rejected { status, .. } => *status == 429 || *status >= 500,
            WorkflowError::NotConfigured(_) | WorkflowError::InvalidResponse(_) => false,
        }
    }
}
