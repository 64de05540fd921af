//! Deterministic provider for tests and offline runs
//!
//! Replies are chosen by matching a needle against the request's system and
//! user messages; the first matching rule wins.

use async_trait::async_trait;
use llm::{ChatRequest, ImageRequest, LlmError};
use parking_lot::Mutex;
use std::sync::Arc;

use super::AiProvider;
use crate::Result;

/// Smallest valid PNG (1x1, transparent)
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Unavailable,
}

#[derive(Debug, Default)]
struct Recorded {
    chats: Vec<ChatRequest>,
    images: Vec<ImageRequest>,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    rules: Vec<(String, Reply)>,
    fallback: Option<String>,
    image_failure: bool,
    recorded: Arc<Mutex<Recorded>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `text` when a request message contains `needle`
    pub fn reply_when(mut self, needle: impl Into<String>, text: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Reply::Text(text.into())));
        self
    }

    /// Fail with a retryable provider error when a message contains `needle`
    pub fn fail_when(mut self, needle: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Reply::Unavailable));
        self
    }

    /// Reply used when no rule matches
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(text.into());
        self
    }

    /// Make every image request fail
    pub fn failing_images(mut self) -> Self {
        self.image_failure = true;
        self
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.recorded.lock().chats.clone()
    }

    pub fn image_requests(&self) -> Vec<ImageRequest> {
        self.recorded.lock().images.clone()
    }
}

#[async_trait]
impl AiProvider for ScriptedProvider {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let haystack: String = request
            .messages
            .iter()
            .map(|m| m.text())
            .collect::<Vec<_>>()
            .join("\n");
        self.recorded.lock().chats.push(request);

        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| haystack.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .or_else(|| self.fallback.clone().map(Reply::Text));

        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Unavailable) => {
                Err(LlmError::ServiceUnavailable("scripted outage".to_string()).into())
            }
            None => Err(LlmError::InvalidResponse("no scripted reply".to_string()).into()),
        }
    }

    async fn generate_image(&self, request: ImageRequest) -> Result<Vec<u8>> {
        self.recorded.lock().images.push(request);
        if self.image_failure {
            return Err(LlmError::RateLimitExceeded("scripted image failure".to_string()).into());
        }
        Ok(TINY_PNG.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm::Message;

    #[tokio::test]
    async fn test_first_matching_rule_wins() {
        let provider = ScriptedProvider::new()
            .reply_when("research", "draft")
            .reply_when("research writer", "never used")
            .with_fallback("other");

        let reply = provider
            .complete(ChatRequest::new(vec![Message::system("You are a research writer")]))
            .await
            .unwrap();
        assert_eq!(reply, "draft");

        let reply = provider
            .complete(ChatRequest::new(vec![Message::human("hello")]))
            .await
            .unwrap();
        assert_eq!(reply, "other");
        assert_eq!(provider.chat_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_failures() {
        let provider = ScriptedProvider::new().fail_when("boom").failing_images();

        let err = provider
            .complete(ChatRequest::new(vec![Message::human("boom")]))
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        assert!(provider.generate_image(ImageRequest::new("x")).await.is_err());
        assert_eq!(provider.image_requests().len(), 1);
    }
}
