//! Target container formats and the pixel layouts they consume.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a format name cannot be mapped to a supported [`ImageFormat`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported image format: {0}")]
pub struct UnknownFormat(pub String);

/// Pixel layout of a raw buffer handed to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelMode {
    /// Opaque 8-bit RGB, 3 bytes per pixel.
    Rgb,
    /// 8-bit RGB with alpha, 4 bytes per pixel.
    Rgba,
}

impl PixelMode {
    /// Number of bytes a single pixel occupies in this layout.
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelMode::Rgb => 3,
            PixelMode::Rgba => 4,
        }
    }

    /// Convert to the image crate's color type.
    pub fn to_color_type(self) -> image::ExtendedColorType {
        match self {
            PixelMode::Rgb => image::ExtendedColorType::Rgb8,
            PixelMode::Rgba => image::ExtendedColorType::Rgba8,
        }
    }
}

/// Image dimensions agreed between the pixel producer and the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Get the total number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Expected buffer length for a raw image of this size in `mode`.
    pub fn buffer_len(&self, mode: PixelMode) -> usize {
        self.pixel_count() * mode.bytes_per_pixel()
    }

    /// Check if either side is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Container format an encoded variant is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
}

impl ImageFormat {
    /// All supported formats.
    pub fn all() -> &'static [ImageFormat] {
        &[ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP]
    }

    /// Pixel layout the encoder expects for this format.
    ///
    /// JPEG has no alpha channel; every other format is fed RGBA.
    pub fn pixel_mode(self) -> PixelMode {
        match self {
            ImageFormat::Jpeg => PixelMode::Rgb,
            ImageFormat::Png | ImageFormat::WebP => PixelMode::Rgba,
        }
    }

    /// Accepted quality values for this format.
    pub fn quality_range(self) -> RangeInclusive<u8> {
        match self {
            // The JPEG encoder rejects quality 0
            ImageFormat::Jpeg => 1..=100,
            ImageFormat::Png | ImageFormat::WebP => 0..=100,
        }
    }

    /// Check whether `quality` is accepted by this format.
    pub fn accepts_quality(self, quality: u8) -> bool {
        self.quality_range().contains(&quality)
    }

    /// Filename suffix, including the leading dot.
    pub fn suffix(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => ".jpeg",
            ImageFormat::Png => ".png",
            ImageFormat::WebP => ".webp",
        }
    }

    /// Short uppercase name used in progress output.
    pub fn name(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Png => "PNG",
            ImageFormat::WebP => "WEBP",
        }
    }

    /// MIME type of the encoded payload.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::WebP => "image/webp",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ImageFormat {
    type Err = UnknownFormat;

    /// Parse a format from a name or extension, with or without the leading dot.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let name = trimmed.strip_prefix('.').unwrap_or(trimmed);
        match name.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            "webp" => Ok(ImageFormat::WebP),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}
