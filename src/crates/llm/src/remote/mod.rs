//! Remote provider implementations.
//!
//! - **OpenAI** (and OpenAI-compatible gateways) for chat completions and
//!   image generation.

pub mod openai;

pub use openai::OpenAiClient;
