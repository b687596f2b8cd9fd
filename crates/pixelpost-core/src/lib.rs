//! Pixelpost Core - concurrent image conversion and dispatch
//!
//! This crate turns one raw pixel buffer into several encoded variants
//! (different container formats and qualities) and uploads each variant to an
//! object store, running the whole batch concurrently.
//!
//! # Module Structure
//!
//! - `format` - Target formats, pixel layouts and dimensions
//! - `encode` - Raw buffer validation and encoding
//! - `decode` - Loading a source image into a raw buffer
//! - `store` - Object store trait plus in-memory and filesystem stores
//! - `task` - Task inputs, key derivation and the encode-then-upload unit
//! - `executor` - Fan-out/gather over a batch with ordered outcomes
//! - `timing` - Elapsed-time measurement and progress events
//! - `config` - Pipeline configuration
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use pixelpost_core::{BatchExecutor, EncodeSpec, ImageFormat, MemoryStore, PipelineConfig, TaskBatch};
//!
//! let executor = BatchExecutor::new(PipelineConfig::default(), Arc::new(MemoryStore::new("bucket")))?;
//! let batch: TaskBatch = vec![
//!     EncodeSpec::new(rgb_pixels, ImageFormat::Jpeg, 90),
//!     EncodeSpec::new(rgba_pixels, ImageFormat::Png, 90),
//! ].into();
//! let report = executor.run(&batch, "covers/").await?;
//! for outcome in report.outcomes() {
//!     println!("{}: {:?}", outcome.index, outcome.reference());
//! }
//! ```

pub mod config;
pub mod decode;
pub mod encode;
pub mod executor;
pub mod format;
pub mod outcome;
pub mod store;
pub mod task;
pub mod timing;

pub use config::{ConfigError, PipelineConfig};
pub use decode::{load_pixel_buffer, DecodeError, SourceImage};
pub use encode::{EncodeError, Encoder, ImageCodec};
pub use executor::{BatchExecutor, SchedulingError};
pub use format::{Dimensions, ImageFormat, PixelMode, UnknownFormat};
pub use outcome::{BatchReport, StoredObject, TaskError, TaskOutcome};
pub use store::{FileStore, MemoryStore, ObjectStore, UploadError};
pub use task::{derive_key, EncodeSpec, EncodeUploadTask, TaskBatch};
pub use timing::{ProgressObserver, RecordingObserver, TimingEvent, TracingObserver};

// Token accepted by `BatchExecutor::run_with_cancel`.
pub use tokio_util::sync::CancellationToken;

/// Get the version of the core library
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
