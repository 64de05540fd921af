//! Tracing subscriber setup

use crate::config::{LogFormat, LoggingConfig};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Parse a log level name. Accepts tracing names plus the common
/// `WARNING` and `CRITICAL` spellings, case-insensitively.
pub fn parse_level(raw: &str) -> Option<Level> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Some(Level::TRACE),
        "DEBUG" => Some(Level::DEBUG),
        "INFO" => Some(Level::INFO),
        "WARN" | "WARNING" => Some(Level::WARN),
        "ERROR" | "CRITICAL" => Some(Level::ERROR),
        _ => None,
    }
}

/// Build the filter: `RUST_LOG` wins, otherwise the configured level with
/// noisy dependencies turned down.
fn build_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.to_string().to_lowercase();
        EnvFilter::new(format!(
            "{level},content_pipeline={level},llm={level},sqlx=warn,hyper=warn,reqwest=warn"
        ))
    })
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_logging(config: &LoggingConfig) {
    let parsed = parse_level(&config.level);
    let filter = build_filter(parsed.unwrap_or(Level::INFO));

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init()
            .is_ok(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .is_ok(),
    };

    if installed && parsed.is_none() {
        tracing::warn!(level = %config.level, "Invalid LOG_LEVEL, defaulting to INFO");
    }
}
