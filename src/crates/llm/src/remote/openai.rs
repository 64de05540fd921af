//! OpenAI client implementation.
//!
//! Supports chat completions (`/chat/completions`) including JSON-object
//! output mode, and image generation (`/images/generations`) with base64
//! payloads so callers can store the bytes themselves.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::remote::OpenAiClient;
//! use llm::{ImageModel, ImageRequest, ImageSize, RemoteLlmConfig};
//!
//! let config = RemoteLlmConfig::new(api_key, "https://api.openai.com/v1", "dall-e-3");
//! let client = OpenAiClient::new(config)?;
//!
//! let request = ImageRequest::new("A lighthouse at dusk").with_size(ImageSize::Landscape);
//! let png = client.generate_image(request).await?.first()?.bytes()?;
//! ```

use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use crate::types::{
    ChatModel, ChatRequest, ChatResponse, GeneratedImage, ImageModel, ImageRequest, ImageResponse,
    Message, MessageRole, ResponseFormat, UsageMetadata,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// OpenAI API client.
#[derive(Clone)]
pub struct OpenAiClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl OpenAiClient {
    /// Create a new OpenAI client with the given configuration.
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::ApiKeyNotFound("empty API key".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Convert a message to OpenAI message format.
    fn convert_message(&self, msg: &Message) -> OpenAiMessage {
        OpenAiMessage {
            role: match msg.role {
                MessageRole::System => "system".to_string(),
                MessageRole::Human => "user".to_string(),
                MessageRole::Assistant => "assistant".to_string(),
            },
            content: Some(msg.content.clone()),
        }
    }

    fn build_chat_body(&self, request: &ChatRequest) -> OpenAiRequest {
        OpenAiRequest {
            model: request
                .config
                .model
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            messages: request.messages.iter().map(|m| self.convert_message(m)).collect(),
            temperature: request.config.temperature,
            max_tokens: request.config.max_tokens,
            response_format: match request.config.response_format {
                ResponseFormat::Text => None,
                ResponseFormat::JsonObject => Some(OpenAiResponseFormat {
                    kind: "json_object".to_string(),
                }),
            },
            stream: false,
        }
    }

    /// Convert OpenAI response to ChatResponse.
    fn convert_response(&self, openai_resp: OpenAiResponse) -> Result<ChatResponse> {
        let choice = openai_resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".to_string()))?;

        let content = choice.message.content.unwrap_or_default();
        if content.trim().is_empty() {
            return Err(LlmError::InvalidResponse("response content was empty".to_string()));
        }

        let usage = openai_resp
            .usage
            .as_ref()
            .map(|u| UsageMetadata::new(u.prompt_tokens, u.completion_tokens));

        let mut metadata = HashMap::new();
        metadata.insert(
            "model".to_string(),
            serde_json::Value::String(openai_resp.model),
        );
        metadata.insert(
            "finish_reason".to_string(),
            serde_json::Value::String(choice.finish_reason.unwrap_or_default()),
        );

        Ok(ChatResponse {
            message: Message::assistant(content),
            usage,
            metadata,
        })
    }

    fn convert_image_response(&self, model: String, resp: OpenAiImageResponse) -> Result<ImageResponse> {
        let images: Vec<GeneratedImage> = resp
            .data
            .into_iter()
            .filter_map(|d| {
                d.b64_json.map(|b64_json| GeneratedImage {
                    b64_json,
                    revised_prompt: d.revised_prompt,
                })
            })
            .collect();

        if images.is_empty() {
            return Err(LlmError::InvalidResponse("no image data in response".to_string()));
        }

        Ok(ImageResponse { images, model })
    }

    fn authorize(&self, mut req: RequestBuilder) -> RequestBuilder {
        req = req.header("Authorization", format!("Bearer {}", self.config.api_key));

        if let Some(org) = &self.config.organization {
            req = req.header("OpenAI-Organization", org);
        }
        req
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(e.to_string())
            } else if e.is_connect() {
                LlmError::ServiceUnavailable(e.to_string())
            } else {
                LlmError::HttpError(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status("OpenAI", status.as_u16(), error_text));
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = self.config.endpoint("chat/completions");
        let req_body = self.build_chat_body(&request);

        tracing::debug!(model = %req_body.model, messages = req_body.messages.len(), "OpenAI chat request");

        let response = self.send(self.authorize(self.client.post(&url).json(&req_body))).await?;

        let openai_resp: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        self.convert_response(openai_resp)
    }
}

#[async_trait]
impl ImageModel for OpenAiClient {
    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResponse> {
        let url = self.config.endpoint("images/generations");
        let model = request.model.clone().unwrap_or_else(|| self.config.model.clone());

        let req_body = OpenAiImageRequest {
            model: model.clone(),
            prompt: request.prompt,
            n: 1,
            size: request.size.as_str().to_string(),
            quality: request.quality,
            style: request.style,
            response_format: "b64_json".to_string(),
        };

        tracing::debug!(model = %model, size = %req_body.size, "OpenAI image request");

        let response = self.send(self.authorize(self.client.post(&url).json(&req_body))).await?;

        let image_resp: OpenAiImageResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        self.convert_image_response(model, image_resp)
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAiResponseFormat>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

#[derive(Debug, Serialize)]
struct OpenAiImageRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
    quality: crate::types::ImageQuality,
    style: crate::types::ImageStyle,
    response_format: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiImageResponse {
    data: Vec<OpenAiImageData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiImageData {
    b64_json: Option<String>,
    revised_prompt: Option<String>,
}
