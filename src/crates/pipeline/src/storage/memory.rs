//! In-memory object store for tests and local runs

use super::{validate_key, BlobStore, BlobUri, StorageError, StorageResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const MEMORY_SCHEME: &str = "mem";

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

#[derive(Debug, Clone)]
pub struct MemoryBlobStore {
    bucket: String,
    objects: Arc<RwLock<BTreeMap<String, StoredObject>>>,
}

impl MemoryBlobStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// All stored keys, sorted
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.read().get(key).map(|o| o.content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    fn check_owned(&self, uri: &BlobUri) -> StorageResult<()> {
        if uri.scheme != MEMORY_SCHEME || uri.bucket != self.bucket {
            return Err(StorageError::ForeignUri {
                uri: uri.to_string(),
                expected: format!("{}://{}", MEMORY_SCHEME, self.bucket),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<BlobUri> {
        validate_key(key)?;
        self.objects.write().insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(BlobUri::new(MEMORY_SCHEME, &self.bucket, key))
    }

    async fn get(&self, uri: &BlobUri) -> StorageResult<Vec<u8>> {
        self.check_owned(uri)?;
        self.objects
            .read()
            .get(&uri.key)
            .map(|o| o.bytes.clone())
            .ok_or_else(|| StorageError::NotFound(uri.to_string()))
    }

    async fn exists(&self, uri: &BlobUri) -> StorageResult<bool> {
        self.check_owned(uri)?;
        Ok(self.objects.read().contains_key(&uri.key))
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}
