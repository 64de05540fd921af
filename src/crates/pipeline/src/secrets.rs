//! Secret lookup for provider credentials
//!
//! Secrets are fetched at call time and wrapped in [`Secret`], whose `Debug`
//! and `Display` never print the value.

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Placeholder deployments leave in unset secret slots
const UNSET_SENTINEL: &str = "NOT_SET";

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Secret '{0}' is not set")]
    NotFound(String),

    #[error("Secret '{0}' is empty or a placeholder")]
    Unusable(String),

    #[error("Invalid secret name '{0}'")]
    InvalidName(String),

    #[error("Failed to read secret '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// A secret value that does not leak through formatting
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, name: &str) -> Result<Secret, SecretError>;
}

fn usable(name: &str, raw: String) -> Result<Secret, SecretError> {
    let value = raw.trim();
    if value.is_empty() || value == UNSET_SENTINEL {
        return Err(SecretError::Unusable(name.to_string()));
    }
    Ok(Secret::new(value))
}

/// Secrets from process environment variables
#[derive(Debug, Clone, Default)]
pub struct EnvSecretStore;

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get_secret(&self, name: &str) -> Result<Secret, SecretError> {
        let raw = std::env::var(name).map_err(|_| SecretError::NotFound(name.to_string()))?;
        usable(name, raw)
    }
}

/// Secrets from one file per secret in a directory (mounted secret volumes)
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    dir: PathBuf,
}

impl FileSecretStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get_secret(&self, name: &str) -> Result<Secret, SecretError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(SecretError::InvalidName(name.to_string()));
        }

        match tokio::fs::read_to_string(self.dir.join(name)).await {
            Ok(raw) => usable(name, raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SecretError::NotFound(name.to_string()))
            }
            Err(source) => Err(SecretError::Io {
                name: name.to_string(),
                source,
            }),
        }
    }
}

/// Fixed secrets, for tests and local tooling
#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    values: std::collections::HashMap<String, String>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn get_secret(&self, name: &str) -> Result<Secret, SecretError> {
        let raw = self
            .values
            .get(name)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(name.to_string()))?;
        usable(name, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_secret_is_redacted() {
        let secret = Secret::new("sk-live-123");
        assert!(!format!("{:?}", secret).contains("sk-live"));
        assert!(!format!("{}", secret).contains("sk-live"));
        assert_eq!(secret.expose(), "sk-live-123");
    }

    #[tokio::test]
    async fn test_static_store_rejects_sentinel() {
        let store = StaticSecretStore::new()
            .with_secret("OPENAI_API_KEY", "NOT_SET")
            .with_secret("OTHER", " sk-abc \n");

        assert!(matches!(
            store.get_secret("OPENAI_API_KEY").await,
            Err(SecretError::Unusable(_))
        ));
        assert_eq!(store.get_secret("OTHER").await.unwrap().expose(), "sk-abc");
        assert!(matches!(
            store.get_secret("MISSING").await,
            Err(SecretError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_file_store() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("OPENAI_API_KEY"), "sk-file\n").unwrap();
        let store = FileSecretStore::new(dir.path());

        assert_eq!(store.get_secret("OPENAI_API_KEY").await.unwrap().expose(), "sk-file");
        assert!(matches!(
            store.get_secret("NOPE").await,
            Err(SecretError::NotFound(_))
        ));
        assert!(matches!(
            store.get_secret("../etc/passwd").await,
            Err(SecretError::InvalidName(_))
        ));
    }
}
