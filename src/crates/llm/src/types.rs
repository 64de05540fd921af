//! Provider-neutral request/response types and the model traits.

use crate::error::{LlmError, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Role of a message sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    Human,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a human message
    pub fn human(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Human, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn text(&self) -> &str {
        &self.content
    }
}

/// Output format requested from a chat model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    #[default]
    Text,
    /// Ask the provider to return a single JSON object.
    JsonObject,
}

/// Generation settings for a chat request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Sampling temperature (0.0-2.0).
    pub temperature: Option<f32>,

    /// Maximum tokens to generate.
    pub max_tokens: Option<usize>,

    /// Overrides the client's configured model for this request.
    pub model: Option<String>,

    pub response_format: ResponseFormat,
}

/// Request to generate a chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The conversation messages to send to the model.
    pub messages: Vec<Message>,

    /// Configuration for generation behavior.
    pub config: ChatConfig,
}

impl ChatRequest {
    /// Create a new chat request with the given messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            config: ChatConfig::default(),
        }
    }

    /// Set the temperature for generation.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = Some(max_tokens);
        self
    }

    /// Use a specific model for this request.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    /// Request JSON object output.
    pub fn with_json_output(mut self) -> Self {
        self.config.response_format = ResponseFormat::JsonObject;
        self
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

impl UsageMetadata {
    pub fn new(input_tokens: usize, output_tokens: usize) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }
}

/// Completed chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: Message,
    pub usage: Option<UsageMetadata>,
    /// Provider-specific extras such as the resolved model and finish reason.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ChatResponse {
    pub fn text(&self) -> &str {
        self.message.text()
    }
}

/// Output dimensions supported by the image endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSize {
    #[serde(rename = "1024x1024")]
    Square,
    #[serde(rename = "1792x1024")]
    Landscape,
    #[serde(rename = "1024x1792")]
    Portrait,
}

impl ImageSize {
    /// Pick a size from an aspect ratio label like "16:9". Unknown labels are square.
    pub fn from_aspect_ratio(ratio: &str) -> Self {
        match ratio.trim() {
            "16:9" => ImageSize::Landscape,
            "9:16" => ImageSize::Portrait,
            _ => ImageSize::Square,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Square => "1024x1024",
            ImageSize::Landscape => "1792x1024",
            ImageSize::Portrait => "1024x1792",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    #[default]
    Standard,
    Hd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStyle {
    #[default]
    Vivid,
    Natural,
}

impl ImageStyle {
    /// Parse a style preference, falling back to vivid.
    pub fn from_preference(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "natural" => ImageStyle::Natural,
            _ => ImageStyle::Vivid,
        }
    }
}

/// Request to generate a single image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub size: ImageSize,
    pub quality: ImageQuality,
    pub style: ImageStyle,
    /// Overrides the client's configured model for this request.
    pub model: Option<String>,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            size: ImageSize::Square,
            quality: ImageQuality::default(),
            style: ImageStyle::default(),
            model: None,
        }
    }

    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }

    pub fn with_quality(mut self, quality: ImageQuality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_style(mut self, style: ImageStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// A generated image, carried as base64 as returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub b64_json: String,
    pub revised_prompt: Option<String>,
}

impl GeneratedImage {
    /// Decode the image payload.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.b64_json.trim())
            .map_err(|e| LlmError::InvalidResponse(format!("image payload is not base64: {}", e)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResponse {
    pub images: Vec<GeneratedImage>,
    pub model: String,
}

impl ImageResponse {
    /// The first image, or an error when the provider returned none.
    pub fn first(&self) -> Result<&GeneratedImage> {
        self.images
            .first()
            .ok_or_else(|| LlmError::InvalidResponse("no image data in response".to_string()))
    }
}

/// Chat completion capability.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;
}

/// Image generation capability.
#[async_trait]
pub trait ImageModel: Send + Sync {
    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResponse>;
}
