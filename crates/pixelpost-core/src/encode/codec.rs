//! Raw pixel encoding using the `image` crate's encoders.
//!
//! JPEG honours the requested quality directly. PNG maps quality onto the
//! compression effort, since PNG is lossless. WebP is written losslessly and
//! accepts the full 0-100 range for interface symmetry.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::ImageEncoder;
use thiserror::Error;

use crate::format::{Dimensions, ImageFormat, PixelMode};

/// Errors that can occur while encoding a raw buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes ({dimensions}, {mode:?}), got {actual}")]
    InvalidPixelData {
        expected: usize,
        actual: usize,
        dimensions: Dimensions,
        mode: PixelMode,
    },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// Quality outside the range the format accepts
    #[error("Quality {quality} is out of range for {format} ({min}-{max})")]
    QualityOutOfRange {
        format: ImageFormat,
        quality: u8,
        min: u8,
        max: u8,
    },

    /// The buffer layout is not the one the format is encoded from
    #[error("{format} cannot be encoded from {mode:?} pixels")]
    ModeMismatch { format: ImageFormat, mode: PixelMode },

    /// The underlying encoder failed
    #[error("{format} encoding failed: {message}")]
    EncodingFailed { format: ImageFormat, message: String },
}

/// Encode collaborator: raw pixels in, container bytes out.
///
/// Implementations must be pure with respect to their inputs so that the
/// executor can call them from many workers at once.
pub trait Encoder: Send + Sync {
    fn encode(
        &self,
        pixels: &[u8],
        mode: PixelMode,
        format: ImageFormat,
        quality: u8,
        dimensions: Dimensions,
    ) -> Result<Vec<u8>, EncodeError>;
}

/// Check a request before any encoding work is done.
///
/// # Errors
///
/// * `InvalidDimensions` if either side is zero
/// * `ModeMismatch` if `mode` is not the layout `format` is encoded from
/// * `QualityOutOfRange` if `quality` is outside `format.quality_range()`
/// * `InvalidPixelData` if the buffer length disagrees with `dimensions` and `mode`
pub fn validate_request(
    pixel_len: usize,
    mode: PixelMode,
    format: ImageFormat,
    quality: u8,
    dimensions: Dimensions,
) -> Result<(), EncodeError> {
    if dimensions.is_empty() {
        return Err(EncodeError::InvalidDimensions {
            width: dimensions.width,
            height: dimensions.height,
        });
    }

    if mode != format.pixel_mode() {
        return Err(EncodeError::ModeMismatch { format, mode });
    }

    if !format.accepts_quality(quality) {
        let range = format.quality_range();
        return Err(EncodeError::QualityOutOfRange {
            format,
            quality,
            min: *range.start(),
            max: *range.end(),
        });
    }

    let expected = dimensions.buffer_len(mode);
    if pixel_len != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: pixel_len,
            dimensions,
            mode,
        });
    }

    Ok(())
}

/// Default encoder backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl ImageCodec {
    /// Map a 0-100 quality onto PNG compression effort.
    ///
    /// Higher quality spends more time compressing; output is lossless either way.
    fn png_compression(quality: u8) -> CompressionType {
        match quality {
            0..=33 => CompressionType::Fast,
            34..=66 => CompressionType::Default,
            _ => CompressionType::Best,
        }
    }
}

impl Encoder for ImageCodec {
    fn encode(
        &self,
        pixels: &[u8],
        mode: PixelMode,
        format: ImageFormat,
        quality: u8,
        dimensions: Dimensions,
    ) -> Result<Vec<u8>, EncodeError> {
        validate_request(pixels.len(), mode, format, quality, dimensions)?;

        let Dimensions { width, height } = dimensions;
        let color = mode.to_color_type();
        let mut buffer = Cursor::new(Vec::new());

        let written = match format {
            ImageFormat::Jpeg => JpegEncoder::new_with_quality(&mut buffer, quality)
                .write_image(pixels, width, height, color),
            ImageFormat::Png => PngEncoder::new_with_quality(
                &mut buffer,
                Self::png_compression(quality),
                PngFilter::Adaptive,
            )
            .write_image(pixels, width, height, color),
            ImageFormat::WebP => {
                WebPEncoder::new_lossless(&mut buffer).write_image(pixels, width, height, color)
            }
        };

        written.map_err(|e| EncodeError::EncodingFailed {
            format,
            message: e.to_string(),
        })?;

        Ok(buffer.into_inner())
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn format_strategy() -> impl Strategy<Value = ImageFormat> {
        prop_oneof![
            Just(ImageFormat::Jpeg),
            Just(ImageFormat::Png),
            Just(ImageFormat::WebP),
        ]
    }

    proptest! {
        /// Property: validation accepts exactly the quality range of the format.
        #[test]
        fn prop_quality_validation_matches_range(
            format in format_strategy(),
            quality in any::<u8>(),
        ) {
            let dims = Dimensions::new(4, 4);
            let result = validate_request(
                dims.buffer_len(format.pixel_mode()),
                format.pixel_mode(),
                format,
                quality,
                dims,
            );
            prop_assert_eq!(result.is_ok(), format.quality_range().contains(&quality));
        }

        /// Property: any buffer length other than the expected one is rejected.
        #[test]
        fn prop_wrong_length_rejected(
            format in format_strategy(),
            (width, height) in (1u32..=40, 1u32..=40),
            delta in prop_oneof![-8i64..=-1, 1i64..=8],
        ) {
            let dims = Dimensions::new(width, height);
            let expected = dims.buffer_len(format.pixel_mode()) as i64;
            let actual = (expected + delta).max(0) as usize;
            prop_assume!(actual as i64 != expected);

            let result = validate_request(actual, format.pixel_mode(), format, 50, dims);
            let is_invalid_pixel_data = matches!(result, Err(EncodeError::InvalidPixelData { .. }));
            prop_assert!(is_invalid_pixel_data);
        }

        /// Property: valid requests encode to a non-empty, deterministic payload.
        #[test]
        fn prop_valid_input_encodes_deterministically(
            format in format_strategy(),
            (width, height) in (1u32..=16, 1u32..=16),
            quality in 1u8..=100,
        ) {
            let dims = Dimensions::new(width, height);
            let pixels = vec![100u8; dims.buffer_len(format.pixel_mode())];

            let first = ImageCodec.encode(&pixels, format.pixel_mode(), format, quality, dims);
            let second = ImageCodec.encode(&pixels, format.pixel_mode(), format, quality, dims);

            prop_assert!(first.is_ok());
            let first = first.unwrap();
            prop_assert!(!first.is_empty());
            prop_assert_eq!(first, second.unwrap());
        }
    }
}
