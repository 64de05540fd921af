//! Filesystem-backed object store
//!
//! Objects live at `<root>/<bucket>/<key>`. Writes go to a temporary file
//! first and are renamed into place, so readers never see partial objects.

use super::{validate_key, BlobStore, BlobUri, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub const FS_SCHEME: &str = "file";

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    bucket: String,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        let mut path = self.root.join(&self.bucket);
        for segment in key.split('/') {
            path.push(segment);
        }
        Ok(path)
    }

    fn check_owned(&self, uri: &BlobUri) -> StorageResult<()> {
        if uri.scheme != FS_SCHEME || uri.bucket != self.bucket {
            return Err(StorageError::ForeignUri {
                uri: uri.to_string(),
                expected: format!("{}://{}", FS_SCHEME, self.bucket),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<BlobUri> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        let uri = BlobUri::new(FS_SCHEME, &self.bucket, key);
        tracing::debug!(%uri, bytes = bytes.len(), content_type, "Stored object");
        Ok(uri)
    }

    async fn get(&self, uri: &BlobUri) -> StorageResult<Vec<u8>> {
        self.check_owned(uri)?;
        let path = self.path_for(&uri.key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(uri.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, uri: &BlobUri) -> StorageResult<bool> {
        self.check_owned(uri)?;
        let path = self.path_for(&uri.key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path(), "content");

        let uri = store
            .put_text("site-1/post-1/research_article.md", "# Draft", "text/markdown")
            .await
            .unwrap();
        assert_eq!(uri.to_string(), "file://content/site-1/post-1/research_article.md");
        assert!(dir.path().join("content/site-1/post-1/research_article.md").exists());
        assert_eq!(store.get_text(&uri).await.unwrap(), "# Draft");
        assert!(store.exists(&uri).await.unwrap());
    }

    #[tokio::test]
    async fn test_overwrite_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path(), "content");

        store.put("a/b.png", vec![1, 2, 3], "image/png").await.unwrap();
        let uri = store.put("a/b.png", vec![4, 5], "image/png").await.unwrap();
        assert_eq!(store.get(&uri).await.unwrap(), vec![4, 5]);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("content/a"))
            .unwrap()
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_object() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path(), "content");
        let uri = BlobUri::new("file", "content", "nope.md");

        assert!(matches!(store.get(&uri).await, Err(StorageError::NotFound(_))));
        assert!(!store.exists(&uri).await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_other_bucket_and_bad_keys() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path(), "content");

        let foreign = BlobUri::new("file", "other", "a.md");
        assert!(matches!(store.get(&foreign).await, Err(StorageError::ForeignUri { .. })));

        let err = store.put("../escape.md", vec![], "text/plain").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}
