//! Codec backend trait and shared image types.
//!
//! The [`ImageBackend`] trait covers the two operations that need a codec:
//! decoding raw bytes into a [`DecodedImage`] and encoding one back to bytes.
//! Pixel work (color, resize, watermark) is pure and lives in
//! [`operations`](super::operations) and [`color`](super::color), so the
//! pipeline can be exercised against a mock backend without real codecs.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::EncodeParams;
use image::{ColorType, DynamicImage, GenericImageView};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {name}: {reason}")]
    Decode { name: String, reason: String },
    #[error("{format} encode failed: {reason}")]
    Encode { format: String, reason: String },
}

/// Pixel width and height of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A decoded image plus the metadata the pipeline cares about.
///
/// Orientation has already been applied to `pixels` by the decoder, and the
/// EXIF orientation tag in `exif` reset to match.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub pixels: DynamicImage,
    /// Embedded ICC color profile, if any.
    pub icc_profile: Option<Vec<u8>>,
    /// Raw EXIF block (TIFF structure, without the `Exif\0\0` prefix).
    pub exif: Option<Vec<u8>>,
    /// Name the image was loaded under: a file path or an archive entry name.
    pub source_name: String,
}

impl DecodedImage {
    /// Wrap bare pixels with no embedded metadata.
    pub fn new(pixels: DynamicImage, source_name: impl Into<String>) -> Self {
        Self {
            pixels,
            icc_profile: None,
            exif: None,
            source_name: source_name.into(),
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        let (width, height) = self.pixels.dimensions();
        Dimensions { width, height }
    }

    pub fn color(&self) -> ColorType {
        self.pixels.color()
    }

    /// Replace the pixel buffer, keeping metadata and name.
    pub fn with_pixels(&self, pixels: DynamicImage) -> Self {
        Self {
            pixels,
            icc_profile: self.icc_profile.clone(),
            exif: self.exif.clone(),
            source_name: self.source_name.clone(),
        }
    }
}

/// Trait for codec backends.
///
/// Implementations must never mutate the image handed to [`encode`](Self::encode),
/// and must treat metadata-embedding failures as recoverable (retry without
/// metadata) rather than as encode errors.
pub trait ImageBackend {
    /// Decode raw bytes. `name` is used for format hints and error messages.
    fn decode(&self, name: &str, bytes: &[u8]) -> Result<DecodedImage, BackendError>;

    /// Encode an image to a complete file in the requested format.
    fn encode(&self, image: &DecodedImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError>;
}
