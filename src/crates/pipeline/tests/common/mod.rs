//! Shared fixtures for integration tests: in-memory SQLite, in-memory blob
//! store, scripted AI provider and a recording workflow client.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use content_pipeline::ai::ScriptedProvider;
use content_pipeline::api::AppState;
use content_pipeline::config::AiConfig;
use content_pipeline::db::{ensure_schema, DatabaseConnection, Post, PostRepository, SettingsRepository, WebsiteSettings};
use content_pipeline::steps::{ModelDefaults, StepContext};
use content_pipeline::storage::MemoryBlobStore;
use content_pipeline::trigger::TriggerService;
use content_pipeline::workflow::{StartRunRequest, WorkflowClient, WorkflowError};

pub const POSTS_TABLE: &str = "test_posts";
pub const SETTINGS_TABLE: &str = "test_settings";
pub const BUCKET: &str = "content";

pub const ARTICLE: &str = "# Tide Pools\n\nTide pools form where the sea retreats.\n\n\
Crabs shelter under rocks.\n\nAnemones close when the water leaves.\n\n\
Starfish cling to the walls.\n\nVisit at low tide and tread carefully.";

/// Workflow client that records start requests and hands out sequential ids
#[derive(Default)]
pub struct RecordingWorkflow {
    pub started: Mutex<Vec<StartRunRequest>>,
    pub fail: bool,
}

impl RecordingWorkflow {
    pub fn failing() -> Self {
        Self {
            started: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn count(&self) -> usize {
        self.started.lock().len()
    }
}

#[async_trait]
impl WorkflowClient for RecordingWorkflow {
    async fn start_run(&self, request: &StartRunRequest) -> Result<String, WorkflowError> {
        if self.fail {
            return Err(WorkflowError::Unavailable("test outage".to_string()));
        }
        let mut started = self.started.lock();
        started.push(request.clone());
        Ok(format!("run-{}", started.len()))
    }
}

/// Provider that answers every prompt the pipeline sends
pub fn scripted_ai() -> ScriptedProvider {
    ScriptedProvider::new()
        .reply_when("research writer", "Tide Pools\n\nA rough draft about tide pools.")
        .reply_when("an editor", ARTICLE)
        .reply_when(
            "art director",
            r#"{"prompts": ["A hermit crab under a rock at dawn", "A green anemone in clear water"]}"#,
        )
        .reply_when("URL slugs", "```json\n{\"slugs\": [\"Hermit Crab\", \"green_anemone\"]}\n```")
        .reply_when(
            "SEO specialist",
            r#"{"metaTitle": "Tide Pools: A Family Guide", "metaDescription": "What lives in tide pools.", "keywords": ["tide pools", "crabs"]}"#,
        )
}

pub struct TestEnv {
    pub db: DatabaseConnection,
    pub posts: PostRepository,
    pub settings: SettingsRepository,
    pub store: MemoryBlobStore,
    pub ai: ScriptedProvider,
    pub workflow: Arc<RecordingWorkflow>,
    pub state: AppState,
}

impl TestEnv {
    pub fn steps(&self) -> &StepContext {
        &self.state.steps
    }
}

pub async fn setup() -> TestEnv {
    setup_with(scripted_ai(), RecordingWorkflow::default()).await
}

pub async fn setup_with(ai: ScriptedProvider, workflow: RecordingWorkflow) -> TestEnv {
    let db = DatabaseConnection::in_memory().await.expect("in-memory database");
    ensure_schema(db.pool(), POSTS_TABLE, SETTINGS_TABLE)
        .await
        .expect("schema");

    let posts = PostRepository::new(db.pool().clone(), POSTS_TABLE);
    let settings = SettingsRepository::new(db.pool().clone(), SETTINGS_TABLE);

    settings
        .upsert(
            &WebsiteSettings::new("site-1")
                .with_description("Marine life for families")
                .with_target_audience("parents")
                .with_keywords(["tide pools", "rock pools"])
                .with_num_image_prompts(2)
                .with_formatting_notes("image_captions: true\nKeep paragraphs short."),
        )
        .await
        .expect("settings");
    settings
        .upsert(&WebsiteSettings::new("site-off").with_active(false))
        .await
        .expect("settings");

    posts
        .create(
            &Post::new("post-1", "site-1", "Tide pools")
                .with_description("A family outing guide")
                .with_created_at("2026-03-01T09:00:00Z"),
        )
        .await
        .expect("post");
    posts
        .create(&Post::new("post-off", "site-off", "Hidden"))
        .await
        .expect("post");

    let store = MemoryBlobStore::new(BUCKET);
    let workflow = Arc::new(workflow);
    let steps = StepContext {
        posts: posts.clone(),
        settings: settings.clone(),
        store: Arc::new(store.clone()),
        ai: Arc::new(ai.clone()),
        models: ModelDefaults::from(&AiConfig::default()),
    };
    let trigger = Arc::new(TriggerService::new(
        posts.clone(),
        settings.clone(),
        workflow.clone(),
        "content-pipeline",
    ));
    let state = AppState {
        db: db.clone(),
        steps,
        trigger,
    };

    TestEnv {
        db,
        posts,
        settings,
        store,
        ai,
        workflow,
        state,
    }
}
