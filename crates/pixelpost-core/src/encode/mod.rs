//! Image encoding for pixelpost.
//!
//! This module provides functionality for:
//! - Validating a raw pixel buffer against its agreed dimensions and layout
//! - Encoding raw pixels to JPEG, PNG or WebP with a target quality
//!
//! # Architecture
//!
//! Encoding is a pure, CPU-bound step. The batch executor runs it on tokio's
//! blocking pool so that one slow encode never stalls the upload of another
//! task. Callers can substitute their own [`Encoder`] implementation; the
//! default is [`ImageCodec`], backed by the `image` crate.
//!
//! # Examples
//!
//! ```ignore
//! use pixelpost_core::encode::{Encoder, ImageCodec};
//! use pixelpost_core::format::{Dimensions, ImageFormat};
//!
//! let dims = Dimensions::new(100, 100);
//! let pixels = vec![128u8; dims.buffer_len(ImageFormat::Jpeg.pixel_mode())];
//! let jpeg = ImageCodec.encode(&pixels, ImageFormat::Jpeg.pixel_mode(), ImageFormat::Jpeg, 90, dims).unwrap();
//! println!("Encoded {} bytes", jpeg.len());
//! ```

mod codec;

pub use codec::{validate_request, EncodeError, Encoder, ImageCodec};
