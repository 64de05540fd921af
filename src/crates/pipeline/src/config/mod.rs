//! Configuration for the content pipeline
//!
//! Settings are read from an optional TOML file (`CONFIG_PATH`) and then
//! overridden by environment variables. Endpoint names, table names, the
//! bucket and model identifiers always come from here, never from code.

pub mod pipeline;

pub use pipeline::{
    AiConfig, ConfigError, DatabaseConfig, LogFormat, LoggingConfig, PipelineConfig,
    RetryPolicyConfig, ServerConfig, StorageConfig, WorkflowServiceConfig,
};
