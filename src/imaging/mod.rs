//! Image processing: codecs plus pure pixel operations.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image` crate (JPEG, PNG, TIFF, WebP), EXIF orientation applied |
//! | **Color** | `moxcms` ICC → sRGB transform |
//! | **Resize** | Lanczos3 long-edge downscale, never upscale |
//! | **Watermark** | scale, opacity, anchor + margin, source-over, flatten to RGB |
//! | **Encode** | `mozjpeg` / `webp` / `image` (PNG), EXIF via `img-parts` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and placement math (unit testable)
//! - **Parameters**: Data structures describing encode and watermark settings
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`] (decode/encode only)
//! - **Operations**: Pixel operations combining calculations + the `image` crate
//! - **Color**: ICC-aware normalization to RGB/RGBA

pub mod backend;
pub mod calculations;
pub mod color;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, DecodedImage, Dimensions, ImageBackend};
pub use color::normalize;
pub use operations::{apply_watermark, resize_to_long_edge};
pub use params::{EncodeParams, OutputFormat, Quality, WatermarkParams, WatermarkPosition};
pub use rust_backend::RustBackend;
