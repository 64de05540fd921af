//! Text and image generation provider client for content-pipeline.
//!
//! The crate exposes two provider-neutral traits, [`ChatModel`] for chat
//! completions and [`ImageModel`] for image generation, plus an
//! OpenAI-compatible HTTP implementation of both.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::remote::OpenAiClient;
//! use llm::{ChatModel, ChatRequest, Message, RemoteLlmConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RemoteLlmConfig::new(api_key, "https://api.openai.com/v1", "gpt-4o");
//!     let client = OpenAiClient::new(config)?;
//!
//!     let request = ChatRequest::new(vec![
//!         Message::system("You are a research writer."),
//!         Message::human("Write about tide pools."),
//!     ])
//!     .with_temperature(0.7);
//!
//!     let response = client.chat(request).await?;
//!     println!("{}", response.text());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod types;

#[cfg(feature = "remote")]
pub mod remote;

pub use config::RemoteLlmConfig;
pub use error::{LlmError, Result};
pub use types::{
    ChatConfig, ChatModel, ChatRequest, ChatResponse, GeneratedImage, ImageModel, ImageQuality,
    ImageRequest, ImageResponse, ImageSize, ImageStyle, Message, MessageRole, ResponseFormat,
    UsageMetadata,
};
