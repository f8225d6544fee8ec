//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [`pipeline`](crate::pipeline) (which decides what
//! each image goes through) and the pixel/codec code in
//! [`operations`](super::operations) and the [`backend`](super::backend).
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (0–100, default 85). Clamped on construction.
//! - [`OutputFormat`]: JPEG, WebP or lossless PNG, with extension and MIME type.
//! - [`WatermarkPosition`]: Anchor for the watermark. Unknown names fall back to bottom-right.
//! - [`EncodeParams`]: Everything the encoder needs: format, quality, progressive, optimize, metadata.
//! - [`WatermarkParams`]: Scale, opacity, margin and position of a watermark overlay.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality setting for lossy image encoding (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Target container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Webp,
    /// Lossless; quality, progressive, optimize and metadata options are ignored.
    Png,
}

impl OutputFormat {
    /// Lowercase file extension used for output names.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
            Self::Png => "png",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Png => "image/png",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Jpeg => "JPEG",
            Self::Webp => "WEBP",
            Self::Png => "PNG",
        })
    }
}

/// Where the watermark is anchored on the base image.
///
/// Parsing is lenient: any name that is not one of the five anchors maps to
/// [`WatermarkPosition::BottomRight`], so a typo in a config file still
/// produces a watermark rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

impl WatermarkPosition {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "top-left" => Self::TopLeft,
            "top-right" => Self::TopRight,
            "bottom-left" => Self::BottomLeft,
            "center" => Self::Center,
            _ => Self::BottomRight,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
            Self::Center => "center",
        }
    }
}

impl From<String> for WatermarkPosition {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<WatermarkPosition> for String {
    fn from(position: WatermarkPosition) -> Self {
        position.as_str().to_string()
    }
}

impl fmt::Display for WatermarkPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for a single encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub format: OutputFormat,
    pub quality: Quality,
    /// Progressive scans. JPEG only.
    pub progressive: bool,
    /// Optimized Huffman tables. JPEG only.
    pub optimize: bool,
    /// Carry the source EXIF block into the output container.
    pub keep_metadata: bool,
}

impl Default for EncodeParams {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: Quality::default(),
            progressive: true,
            optimize: true,
            keep_metadata: false,
        }
    }
}

/// Placement and blending of a watermark overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkParams {
    pub position: WatermarkPosition,
    /// Watermark width as a percentage of the base width.
    pub scale_pct: f32,
    /// 100 (or more) leaves the watermark's own alpha untouched.
    pub opacity_pct: f32,
    pub margin_px: u32,
}

impl Default for WatermarkParams {
    fn default() -> Self {
        Self {
            position: WatermarkPosition::BottomRight,
            scale_pct: 12.0,
            opacity_pct: 70.0,
            margin_px: 24,
        }
    }
}
