//! Object storage for step artifacts
//!
//! Steps exchange data by pointer. A pointer is a [`BlobUri`] of the form
//! `<scheme>://<bucket>/<key>`; keys are grouped under a per-post prefix
//! `<website_id>/<post_id>/`.

pub mod fs;
pub mod layout;
pub mod memory;

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use fs::FsBlobStore;
pub use layout::PostPrefix;
pub use memory::MemoryBlobStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage pointer '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    /// Pointer refers to a bucket or scheme this store does not serve
    #[error("Pointer {uri} is not served by this store ({expected})")]
    ForeignUri { uri: String, expected: String },

    #[error("Object {uri} is not valid UTF-8 text")]
    NotText { uri: String },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Io(_))
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Pointer to a stored object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobUri {
    pub scheme: String,
    pub bucket: String,
    pub key: String,
}

impl BlobUri {
    pub fn new(scheme: impl Into<String>, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Last path segment of the key
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

impl fmt::Display for BlobUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.key)
    }
}

impl FromStr for BlobUri {
    type Err = StorageError;

    fn from_str(s: &str) -> StorageResult<Self> {
        let invalid = |reason: &str| StorageError::InvalidUri {
            uri: s.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = s.split_once("://").ok_or_else(|| invalid("missing scheme"))?;
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("bad scheme"));
        }

        let (bucket, key) = rest.split_once('/').ok_or_else(|| invalid("missing key"))?;
        if bucket.is_empty() {
            return Err(invalid("missing bucket"));
        }
        validate_key(key)?;

        Ok(BlobUri::new(scheme, bucket, key))
    }
}

/// Keys are relative, slash-separated and never escape their prefix.
pub fn validate_key(key: &str) -> StorageResult<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");

    if bad {
        Err(StorageError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

/// Object store used by the steps
///
/// Writes overwrite, so a retried step writing the same key is harmless.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `key` and return the pointer
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<BlobUri>;

    /// Read the object a pointer refers to
    async fn get(&self, uri: &BlobUri) -> StorageResult<Vec<u8>>;

    /// Whether the object exists
    async fn exists(&self, uri: &BlobUri) -> StorageResult<bool>;

    /// Bucket this store writes into
    fn bucket(&self) -> &str;

    /// Read an object as UTF-8 text
    async fn get_text(&self, uri: &BlobUri) -> StorageResult<String> {
        let bytes = self.get(uri).await?;
        String::from_utf8(bytes).map_err(|_| StorageError::NotText { uri: uri.to_string() })
    }

    /// Store UTF-8 text
    async fn put_text(&self, key: &str, text: &str, content_type: &str) -> StorageResult<BlobUri> {
        self.put(key, text.as_bytes().to_vec(), content_type).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let uri: BlobUri = "file://content/site-1/post-1/images/01-crab.png".parse().unwrap();
        assert_eq!(uri.scheme, "file");
        assert_eq!(uri.bucket, "content");
        assert_eq!(uri.key, "site-1/post-1/images/01-crab.png");
        assert_eq!(uri.file_name(), "01-crab.png");
        assert_eq!(uri.to_string(), "file://content/site-1/post-1/images/01-crab.png");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("content/site-1/post-1".parse::<BlobUri>().is_err());
        assert!("file://content".parse::<BlobUri>().is_err());
        assert!("file:///key".parse::<BlobUri>().is_err());
        assert!("file://content/../etc/passwd".parse::<BlobUri>().is_err());
        assert!("fi le://content/key".parse::<BlobUri>().is_err());
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("a/b/c.md").is_ok());
        assert!(validate_key("/a").is_err());
        assert!(validate_key("a//b").is_err());
        assert!(validate_key("a/./b").is_err());
        assert!(validate_key("a\\b").is_err());
        assert!(validate_key("").is_err());
    }
}
