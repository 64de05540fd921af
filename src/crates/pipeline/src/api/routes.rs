//! API route definitions

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;

use crate::ai::OpenAiProvider;
use crate::api::{handlers, middleware};
use crate::config::PipelineConfig;
use crate::db::{ensure_schema, DatabaseConnection, PostRepository, SettingsRepository};
use crate::secrets::{EnvSecretStore, FileSecretStore, SecretStore};
use crate::steps::{ModelDefaults, StepContext};
use crate::storage::FsBlobStore;
use crate::trigger::TriggerService;
use crate::workflow::{HttpWorkflowClient, UnconfiguredWorkflowClient, WorkflowClient};
use crate::Result;

const WORKFLOW_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub steps: StepContext,
    pub trigger: Arc<TriggerService>,
}

impl AppState {
    /// Wire the production services: SQL store, filesystem blob store,
    /// secret-backed AI provider and the workflow client.
    pub async fn from_config(config: &PipelineConfig) -> Result<Self> {
        let db = DatabaseConnection::new(&config.database.url).await?;
        ensure_schema(db.pool(), &config.database.posts_table, &config.database.settings_table).await?;

        let posts = PostRepository::new(db.pool().clone(), config.database.posts_table.clone());
        let settings = SettingsRepository::new(db.pool().clone(), config.database.settings_table.clone());

        let secrets: Arc<dyn SecretStore> = match &config.ai.secrets_dir {
            Some(dir) => Arc::new(FileSecretStore::new(dir)),
            None => Arc::new(EnvSecretStore),
        };

        let workflow: Arc<dyn WorkflowClient> = match &config.workflow.endpoint {
            Some(endpoint) => Arc::new(HttpWorkflowClient::new(endpoint.clone(), WORKFLOW_TIMEOUT)?),
            None => {
                tracing::warn!("WORKFLOW_ENDPOINT not set; triggering runs is disabled");
                Arc::new(UnconfiguredWorkflowClient)
            }
        };

        let steps = StepContext {
            posts: posts.clone(),
            settings: settings.clone(),
            store: Arc::new(FsBlobStore::new(&config.storage.root, &config.storage.bucket)),
            ai: Arc::new(OpenAiProvider::new(&config.ai, secrets)),
            models: ModelDefaults::from(&config.ai),
        };
        let trigger = Arc::new(TriggerService::new(
            posts,
            settings,
            workflow,
            config.workflow.name.clone(),
        ));

        Ok(Self { db, steps, trigger })
    }
}

/// Build the complete API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/system/health", get(handlers::health_detailed))
        .route("/api/v1/generate", post(handlers::generate))
        .route("/api/v1/runs/:run_id", get(handlers::get_run))
        .route("/api/v1/posts/:post_id", get(handlers::get_post))
        .route("/api/v1/steps/:step", post(handlers::invoke_step))
        .layer(middleware::logging_layer())
        .layer(middleware::cors_layer())
        .with_state(state)
}
