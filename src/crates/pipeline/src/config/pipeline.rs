//! Pipeline configuration loaded from TOML and the environment

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(toml::de::Error),
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("Missing required setting: {0}")]
    Missing(String),
}

/// HTTP bind settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Status store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection string
    pub url: String,
    pub posts_table: String,
    pub settings_table: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:content-pipeline.db?mode=rwc".to_string(),
            posts_table: "posts".to_string(),
            settings_table: "website_settings".to_string(),
        }
    }
}

/// Object storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory that holds one subdirectory per bucket
    pub root: PathBuf,
    pub bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./data"),
            bucket: String::new(),
        }
    }
}

/// AI provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub base_url: String,
    /// Name of the secret holding the API key
    pub api_key_secret: String,
    /// When set, secrets are read from files in this directory
    pub secrets_dir: Option<PathBuf>,
    pub text_model: String,
    pub image_model: String,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_secret: "OPENAI_API_KEY".to_string(),
            secrets_dir: None,
            text_model: "gpt-4o".to_string(),
            image_model: "dall-e-3".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Declarative retry policy written into the workflow definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicyConfig {
    pub max_attempts: u32,
    pub interval_secs: u64,
    pub backoff_rate: f64,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            interval_secs: 2,
            backoff_rate: 2.0,
        }
    }
}

/// Managed workflow service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowServiceConfig {
    /// Base URL of the workflow service; required to trigger runs
    pub endpoint: Option<String>,
    pub name: String,
    /// Public URL of this service, used as the target of task states
    pub step_base_url: Option<String>,
    pub image_max_concurrency: u32,
    pub retry: RetryPolicyConfig,
}

impl Default for WorkflowServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            name: "content-pipeline".to_string(),
            step_base_url: None,
            image_max_concurrency: 4,
            retry: RetryPolicyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub ai: AiConfig,
    pub workflow: WorkflowServiceConfig,
    pub logging: LoggingConfig,
}

impl PipelineConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadError)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::ParseError)
    }

    /// Load from `CONFIG_PATH` (if set), apply environment overrides and validate
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::load_unchecked()?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`PipelineConfig::load`] without validation, for commands that
    /// never touch storage (printing the workflow definition).
    pub fn load_unchecked() -> Result<Self, ConfigError> {
        let base = match std::env::var("CONFIG_PATH") {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path)?,
            _ => Self::default(),
        };
        base.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup. Empty values are ignored.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = parse_value("PORT", &v)?;
        }
        if let Some(v) = get("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = get("POSTS_TABLE_NAME") {
            self.database.posts_table = v;
        }
        if let Some(v) = get("SETTINGS_TABLE_NAME") {
            self.database.settings_table = v;
        }
        if let Some(v) = get("STORAGE_ROOT") {
            self.storage.root = PathBuf::from(v);
        }
        if let Some(v) = get("CONTENT_BUCKET_NAME") {
            self.storage.bucket = v;
        }
        if let Some(v) = get("AI_BASE_URL") {
            self.ai.base_url = v;
        }
        if let Some(v) = get("AI_API_KEY_SECRET") {
            self.ai.api_key_secret = v;
        }
        if let Some(v) = get("SECRETS_DIR") {
            self.ai.secrets_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("TEXT_MODEL") {
            self.ai.text_model = v;
        }
        if let Some(v) = get("IMAGE_MODEL") {
            self.ai.image_model = v;
        }
        if let Some(v) = get("AI_TIMEOUT_SECS") {
            self.ai.timeout_secs = parse_value("AI_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("WORKFLOW_ENDPOINT") {
            self.workflow.endpoint = Some(v);
        }
        if let Some(v) = get("WORKFLOW_NAME") {
            self.workflow.name = v;
        }
        if let Some(v) = get("STEP_BASE_URL") {
            self.workflow.step_base_url = Some(v);
        }
        if let Some(v) = get("IMAGE_MAX_CONCURRENCY") {
            self.workflow.image_max_concurrency = parse_value("IMAGE_MAX_CONCURRENCY", &v)?;
        }
        if let Some(v) = get("RETRY_MAX_ATTEMPTS") {
            self.workflow.retry.max_attempts = parse_value("RETRY_MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = get("RETRY_INTERVAL_SECS") {
            self.workflow.retry.interval_secs = parse_value("RETRY_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = get("RETRY_BACKOFF_RATE") {
            self.workflow.retry.backoff_rate = parse_value("RETRY_BACKOFF_RATE", &v)?;
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = get("LOG_FORMAT") {
            self.logging.format = match v.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" | "pretty" => LogFormat::Text,
                other => {
                    return Err(ConfigError::InvalidValue {
                        key: "LOG_FORMAT".to_string(),
                        message: format!("expected 'text' or 'json', got '{}'", other),
                    })
                }
            };
        }

        Ok(self)
    }

    /// Check required settings and value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.bucket.trim().is_empty() {
            return Err(ConfigError::Missing("CONTENT_BUCKET_NAME".to_string()));
        }
        validate_bucket_name(&self.storage.bucket)?;
        validate_table_name("POSTS_TABLE_NAME", &self.database.posts_table)?;
        validate_table_name("SETTINGS_TABLE_NAME", &self.database.settings_table)?;

        if self.database.posts_table == self.database.settings_table {
            return Err(ConfigError::InvalidValue {
                key: "SETTINGS_TABLE_NAME".to_string(),
                message: "must differ from POSTS_TABLE_NAME".to_string(),
            });
        }
        if self.ai.api_key_secret.trim().is_empty() {
            return Err(ConfigError::Missing("AI_API_KEY_SECRET".to_string()));
        }
        if self.ai.timeout_secs == 0 {
            return Err(invalid("AI_TIMEOUT_SECS", "must be greater than zero"));
        }
        if self.workflow.image_max_concurrency == 0 {
            return Err(invalid("IMAGE_MAX_CONCURRENCY", "must be greater than zero"));
        }
        if self.workflow.retry.max_attempts == 0 {
            return Err(invalid("RETRY_MAX_ATTEMPTS", "must be greater than zero"));
        }
        if self.workflow.retry.backoff_rate < 1.0 {
            return Err(invalid("RETRY_BACKOFF_RATE", "must be at least 1.0"));
        }
        Ok(())
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Base URL the workflow's task states call back into
    pub fn step_base_url(&self) -> String {
        self.workflow
            .step_base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.bind_address()))
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{}': {}", value, e),
    })
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

/// Table names end up in SQL text, so only plain identifiers are accepted.
fn validate_table_name(key: &str, name: &str) -> Result<(), ConfigError> {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    let re = IDENT.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("static regex"));
    if re.is_match(name) {
        Ok(())
    } else {
        Err(invalid(key, "must be a plain identifier (letters, digits, underscore)"))
    }
}

fn validate_bucket_name(name: &str) -> Result<(), ConfigError> {
    static BUCKET: OnceLock<Regex> = OnceLock::new();
    let re = BUCKET.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$").expect("static regex"));
    if re.is_match(name) {
        Ok(())
    } else {
        Err(invalid(
            "CONTENT_BUCKET_NAME",
            "must be 3-63 lowercase letters, digits, dots or hyphens",
        ))
    }
}
