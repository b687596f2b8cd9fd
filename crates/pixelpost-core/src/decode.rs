//! Loading a source image into the raw pixel buffers the pipeline consumes.
//!
//! The pipeline itself only ever sees raw buffers of the agreed size; this
//! module is the edge where a file on disk becomes such a buffer.

use std::io::Cursor;
use std::path::Path;

use bytes::Bytes;
use image::{DynamicImage, ImageReader};
use thiserror::Error;

use crate::format::{Dimensions, PixelMode};

/// Error types for loading a source image.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// I/O error during file reading.
    #[error("I/O error reading {path}: {message}")]
    Io { path: String, message: String },

    /// The file format is not recognized or the data is corrupted.
    #[error("Corrupted or unsupported image: {0}")]
    CorruptedFile(String),

    /// The decoded image is not the size the pipeline was configured for.
    #[error("Image is {actual}, expected {expected}")]
    DimensionMismatch {
        expected: Dimensions,
        actual: Dimensions,
    },
}

/// A decoded source image, convertible into raw buffers for either layout.
#[derive(Debug, Clone)]
pub struct SourceImage {
    image: DynamicImage,
}

impl SourceImage {
    /// Decode an image from encoded bytes, guessing the container format.
    pub fn from_encoded(bytes: &[u8]) -> Result<Self, DecodeError> {
        let image = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?
            .decode()
            .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;
        Ok(Self { image })
    }

    /// Read and decode an image file.
    pub fn open(path: &Path) -> Result<Self, DecodeError> {
        let bytes = std::fs::read(path).map_err(|e| DecodeError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_encoded(&bytes)
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.image.width(), self.image.height())
    }

    /// Fail unless the image has exactly the expected dimensions.
    pub fn ensure_dimensions(&self, expected: Dimensions) -> Result<(), DecodeError> {
        let actual = self.dimensions();
        if actual != expected {
            return Err(DecodeError::DimensionMismatch { expected, actual });
        }
        Ok(())
    }

    /// Raw row-major pixels in `mode`.
    ///
    /// Converting to RGB drops any alpha channel; converting to RGBA adds an
    /// opaque one where the source has none.
    pub fn pixels(&self, mode: PixelMode) -> Bytes {
        match mode {
            PixelMode::Rgb => Bytes::from(self.image.to_rgb8().into_raw()),
            PixelMode::Rgba => Bytes::from(self.image.to_rgba8().into_raw()),
        }
    }
}

/// Load `path` as a raw buffer in `mode`, requiring the agreed dimensions.
pub fn load_pixel_buffer(
    path: &Path,
    mode: PixelMode,
    dimensions: Dimensions,
) -> Result<Bytes, DecodeError> {
    let source = SourceImage::open(path)?;
    source.ensure_dimensions(dimensions)?;
    Ok(source.pixels(mode))
}
