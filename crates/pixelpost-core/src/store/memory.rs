//! In-memory object store.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{object_reference, ObjectStore, UploadError};

/// Keeps every uploaded object in a map keyed by object key.
///
/// Later uploads to the same key overwrite earlier ones, matching the
/// behaviour of a typical bucket.
#[derive(Debug)]
pub struct MemoryStore {
    bucket: String,
    objects: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStore {
    pub const SCHEME: &'static str = "mem";

    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Fetch a stored object.
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.read().await.get(key).cloned()
    }

    /// Sorted list of stored keys.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, bytes: Bytes, key: &str) -> Result<String, UploadError> {
        if key.is_empty() {
            return Err(UploadError::InvalidKey {
                key: key.to_string(),
                reason: "key is empty".to_string(),
            });
        }

        self.objects.write().await.insert(key.to_string(), bytes);
        Ok(object_reference(Self::SCHEME, &self.bucket, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryStore::new("asdf");
        let reference = store
            .put(Bytes::from_static(b"payload"), "a/asdf.jpeg")
            .await
            .unwrap();

        assert_eq!(reference, "mem://asdf/a/asdf.jpeg");
        assert_eq!(
            store.get("a/asdf.jpeg").await,
            Some(Bytes::from_static(b"payload"))
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let store = MemoryStore::new("bucket");
        store.put(Bytes::from_static(b"one"), "k").await.unwrap();
        store.put(Bytes::from_static(b"two"), "k").await.unwrap();

        assert_eq!(store.keys().await, vec!["k".to_string()]);
        assert_eq!(store.get("k").await, Some(Bytes::from_static(b"two")));
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let store = MemoryStore::new("bucket");
        let result = store.put(Bytes::new(), "").await;
        assert!(matches!(result, Err(UploadError::InvalidKey { .. })));
        assert!(store.is_empty().await);
    }
}
