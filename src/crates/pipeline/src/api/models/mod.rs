//! API request and response models
//!
//! Run status and trigger receipts are served as-is from [`crate::trigger`].

pub mod generate;

pub use generate::GenerateRequest;

/// System health response
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    /// Overall status
    pub status: String,

    /// Database connection status
    pub database: String,

    pub version: String,

    pub timestamp: String,
}

impl HealthResponse {
    pub fn new(status: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            database: database.into(),
            version: crate::version::VERSION.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
