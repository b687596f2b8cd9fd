//! Object stores that encoded variants are dispatched to.
//!
//! The executor only ever talks to the [`ObjectStore`] trait, so the
//! destination is injected by the caller rather than hardcoded. Two stores ship
//! with the crate:
//! - [`MemoryStore`] - keeps objects in memory, useful for dry runs and tests
//! - [`FileStore`] - writes objects under a local directory

mod file;
mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors raised by an upload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// The key cannot be stored by this backend.
    #[error("Invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// The store received the object but refused it.
    #[error("Store rejected '{key}': {message}")]
    Rejected { key: String, message: String },

    /// The object never reached the store.
    #[error("Transport failure uploading '{key}': {message}")]
    Transport { key: String, message: String },
}

/// Upload collaborator: persists a payload under a key and returns its
/// fully-qualified reference (`scheme://bucket/key`).
///
/// Implementations are shared across all workers of a batch and must be safe
/// to call concurrently. No retry is expected at this layer.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, bytes: Bytes, key: &str) -> Result<String, UploadError>;
}

/// Build a reference string from its parts.
pub(crate) fn object_reference(scheme: &str, bucket: &str, key: &str) -> String {
    format!("{scheme}://{bucket}/{key}")
}
