//! Task inputs and the encode-then-upload unit of work.

use std::sync::Arc;

use bytes::Bytes;

use crate::encode::{validate_request, EncodeError, Encoder};
use crate::format::{Dimensions, ImageFormat};
use crate::outcome::{StoredObject, TaskError};
use crate::store::ObjectStore;
use crate::timing::{timed_async, ProgressObserver, TimingEvent};

/// One requested variant: a raw buffer and how to encode it.
///
/// The buffer is reference-counted, so many specs can share one source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeSpec {
    pixels: Bytes,
    format: ImageFormat,
    quality: u8,
    key_prefix: String,
}

impl EncodeSpec {
    pub fn new(pixels: impl Into<Bytes>, format: ImageFormat, quality: u8) -> Self {
        Self {
            pixels: pixels.into(),
            format,
            quality,
            key_prefix: String::new(),
        }
    }

    /// Extra prefix placed after the batch prefix in this spec's key.
    pub fn with_key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    pub fn pixels(&self) -> &Bytes {
        &self.pixels
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }
}

/// Ordered set of specs submitted together. Order defines outcome order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskBatch {
    specs: Vec<EncodeSpec>,
}

impl TaskBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, spec: EncodeSpec) -> &mut Self {
        self.specs.push(spec);
        self
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&EncodeSpec> {
        self.specs.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EncodeSpec> {
        self.specs.iter()
    }
}

impl From<Vec<EncodeSpec>> for TaskBatch {
    fn from(specs: Vec<EncodeSpec>) -> Self {
        Self { specs }
    }
}

impl FromIterator<EncodeSpec> for TaskBatch {
    fn from_iter<I: IntoIterator<Item = EncodeSpec>>(iter: I) -> Self {
        Self {
            specs: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TaskBatch {
    type Item = &'a EncodeSpec;
    type IntoIter = std::slice::Iter<'a, EncodeSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}

/// Object key for a variant: `{prefix}{key_prefix}{stem}{suffix}`.
///
/// Depends only on its arguments. The batch index is deliberately not part of
/// the key, so identical specs in one batch map to the same object.
pub fn derive_key(prefix: &str, key_prefix: &str, stem: &str, format: ImageFormat) -> String {
    let suffix = format.suffix();
    let mut key = String::with_capacity(prefix.len() + key_prefix.len() + stem.len() + suffix.len());
    key.push_str(prefix);
    key.push_str(key_prefix);
    key.push_str(stem);
    key.push_str(suffix);
    key
}

/// Encode-then-upload for a single spec.
///
/// Holds only shared, read-only collaborators; cloning is cheap and every
/// worker of a batch gets its own clone.
#[derive(Clone)]
pub struct EncodeUploadTask {
    encoder: Arc<dyn Encoder>,
    store: Arc<dyn ObjectStore>,
    observer: Arc<dyn ProgressObserver>,
    dimensions: Dimensions,
    object_stem: Arc<str>,
}

impl EncodeUploadTask {
    pub fn new(
        encoder: Arc<dyn Encoder>,
        store: Arc<dyn ObjectStore>,
        observer: Arc<dyn ProgressObserver>,
        dimensions: Dimensions,
        object_stem: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            encoder,
            store,
            observer,
            dimensions,
            object_stem: object_stem.into(),
        }
    }

    /// Key this task would store `spec` under.
    pub fn key_for(&self, spec: &EncodeSpec, prefix: &str) -> String {
        derive_key(prefix, spec.key_prefix(), &self.object_stem, spec.format())
    }

    /// Encode `spec` and upload the result.
    ///
    /// `index` only tags progress events; it never influences the key.
    ///
    /// # Errors
    ///
    /// * `TaskError::Encode` if the buffer or quality is invalid for the format,
    ///   or the encoder fails
    /// * `TaskError::Upload` if the store refuses the object
    pub async fn execute(
        &self,
        index: usize,
        spec: &EncodeSpec,
        prefix: &str,
    ) -> Result<StoredObject, TaskError> {
        let format = spec.format();
        let quality = spec.quality();

        let (encoded, encode_elapsed) = timed_async(self.encode(spec)).await;
        self.observer.on_event(&TimingEvent::EncodeCompleted {
            index,
            format,
            quality,
            elapsed: encode_elapsed,
            success: encoded.is_ok(),
        });
        let encoded = encoded?;
        let encoded_len = encoded.len();

        let key = self.key_for(spec, prefix);
        tracing::debug!(index, key = key.as_str(), bytes = encoded_len, "Uploading image");

        let (uploaded, upload_elapsed) =
            timed_async(self.store.put(Bytes::from(encoded), &key)).await;
        self.observer.on_event(&TimingEvent::UploadCompleted {
            index,
            key,
            elapsed: upload_elapsed,
            success: uploaded.is_ok(),
        });
        let reference = uploaded?;

        Ok(StoredObject {
            reference,
            encoded_len,
            encode_elapsed,
            upload_elapsed,
        })
    }

    /// Validate, then run the encoder on the blocking pool.
    async fn encode(&self, spec: &EncodeSpec) -> Result<Vec<u8>, EncodeError> {
        let format = spec.format();
        let mode = format.pixel_mode();
        validate_request(
            spec.pixels().len(),
            mode,
            format,
            spec.quality(),
            self.dimensions,
        )?;

        let encoder = Arc::clone(&self.encoder);
        let pixels = spec.pixels().clone();
        let quality = spec.quality();
        let dimensions = self.dimensions;

        tokio::task::spawn_blocking(move || {
            encoder.encode(&pixels, mode, format, quality, dimensions)
        })
        .await
        .map_err(|e| EncodeError::EncodingFailed {
            format,
            message: if e.is_panic() {
                "encoder panicked".to_string()
            } else {
                format!("encoder did not finish: {e}")
            },
        })?
    }
}
