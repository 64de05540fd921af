//! AI provider seam used by the step functions
//!
//! Steps talk to an [`AiProvider`]. The production implementation,
//! [`OpenAiProvider`], looks the API key up in a [`SecretStore`] on every
//! call and drives the `llm` crate's OpenAI-compatible client. Tests use
//! [`ScriptedProvider`].

pub mod parse;
pub mod scripted;

use async_trait::async_trait;
use llm::remote::OpenAiClient;
use llm::{ChatModel, ChatRequest, ImageModel, ImageRequest, RemoteLlmConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::AiConfig;
use crate::secrets::SecretStore;
use crate::Result;

pub use parse::{extract_json, parse_json_object, parse_string_list};
pub use scripted::ScriptedProvider;

/// Text and image generation as seen by the steps
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Run a chat completion and return the reply text
    async fn complete(&self, request: ChatRequest) -> Result<String>;

    /// Generate one image and return its decoded bytes
    async fn generate_image(&self, request: ImageRequest) -> Result<Vec<u8>>;
}

/// OpenAI-compatible provider with per-call credential lookup
pub struct OpenAiProvider {
    secrets: Arc<dyn SecretStore>,
    secret_name: String,
    base_url: String,
    text_model: String,
    image_model: String,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(config: &AiConfig, secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            secrets,
            secret_name: config.api_key_secret.clone(),
            base_url: config.base_url.clone(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    async fn client(&self, default_model: &str) -> Result<OpenAiClient> {
        let key = self.secrets.get_secret(&self.secret_name).await?;
        let config = RemoteLlmConfig::new(key.expose(), &self.base_url, default_model)
            .with_timeout(self.timeout);
        Ok(OpenAiClient::new(config)?)
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let client = self.client(&self.text_model).await?;
        let response = client.chat(request).await?;
        if let Some(usage) = response.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Chat completion finished"
            );
        }
        Ok(response.text().to_string())
    }

    async fn generate_image(&self, request: ImageRequest) -> Result<Vec<u8>> {
        let client = self.client(&self.image_model).await?;
        let response = client.generate_image(request).await?;
        Ok(response.first()?.bytes()?)
    }
}
