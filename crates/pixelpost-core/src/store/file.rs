//! Filesystem-backed object store.
//!
//! Objects land at `{root}/{bucket}/{key}`; key separators become directories.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use super::{object_reference, ObjectStore, UploadError};

/// Writes each object to a file under a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    bucket: String,
}

impl FileStore {
    pub const SCHEME: &'static str = "file";

    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
        }
    }

    /// Filesystem location of `key`, or `None` if the key would escape the bucket.
    pub fn object_path(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        safe.then(|| self.root.join(&self.bucket).join(relative))
    }
}

#[async_trait]
impl ObjectStore for FileStore {
    async fn put(&self, bytes: Bytes, key: &str) -> Result<String, UploadError> {
        let path = self.object_path(key).ok_or_else(|| UploadError::InvalidKey {
            key: key.to_string(),
            reason: "key must be a relative path inside the bucket".to_string(),
        })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| UploadError::Transport {
                    key: key.to_string(),
                    message: format!("creating {}: {e}", parent.display()),
                })?;
        }

        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| UploadError::Rejected {
                key: key.to_string(),
                message: format!("writing {}: {e}", path.display()),
            })?;

        Ok(object_reference(Self::SCHEME, &self.bucket, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), "images");

        let reference = store
            .put(Bytes::from_static(b"jpeg"), "a/asdf.jpeg")
            .await
            .unwrap();

        assert_eq!(reference, "file://images/a/asdf.jpeg");
        let written = std::fs::read(dir.path().join("images/a/asdf.jpeg")).unwrap();
        assert_eq!(written, b"jpeg");
    }

    #[tokio::test]
    async fn test_parent_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), "images");

        let result = store.put(Bytes::from_static(b"x"), "../escape.png").await;
        assert!(matches!(result, Err(UploadError::InvalidKey { .. })));
    }

    #[test]
    fn test_object_path() {
        let store = FileStore::new("/srv", "bucket");
        assert_eq!(
            store.object_path("p/asdf.png"),
            Some(PathBuf::from("/srv/bucket/p/asdf.png"))
        );
        assert_eq!(store.object_path("/etc/passwd"), None);
        assert_eq!(store.object_path(""), None);
    }
}
