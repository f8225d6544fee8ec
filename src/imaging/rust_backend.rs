//! Pure Rust decoding plus native-library lossy encoders.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate, format sniffed from magic bytes |
//! | ICC / EXIF extraction | `ImageDecoder::icc_profile` / `ImageDecoder::exif_metadata` |
//! | Orientation | `ImageDecoder::orientation` + `DynamicImage::apply_orientation` |
//! | Encode → JPEG | `mozjpeg` (quality, progressive scans, Huffman optimization) |
//! | Encode → WebP | `webp` (libwebp, quality + method 6) |
//! | Encode → PNG | `image` crate, lossless |
//! | EXIF embedding | `img-parts` (APP1 segment for JPEG, EXIF chunk for WebP) |

use super::backend::{BackendError, DecodedImage, ImageBackend};
use super::params::{EncodeParams, OutputFormat};
use image::metadata::Orientation;
use image::{ColorType, DynamicImage, ImageDecoder, ImageFormat, ImageReader, RgbImage};
use img_parts::jpeg::Jpeg;
use img_parts::webp::WebP;
use img_parts::{Bytes, ImageEXIF};
use mozjpeg::{ColorSpace, Compress};
use std::borrow::Cow;
use std::io::Cursor;

/// Largest EXIF payload that fits one JPEG APP1 segment
/// (65535 minus the length field and the `Exif\0\0` prefix).
const MAX_JPEG_EXIF: usize = 65535 - 2 - 6;

const EXIF_PREFIX: &[u8] = b"Exif\0\0";

/// Codec backend built on the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_error(name: &str, reason: impl ToString) -> BackendError {
    BackendError::Decode {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn encode_error(format: OutputFormat, reason: impl ToString) -> BackendError {
    BackendError::Encode {
        format: format.to_string(),
        reason: reason.to_string(),
    }
}

/// Decode bytes, extract ICC/EXIF, and rotate pixels into display orientation.
fn decode_image(name: &str, bytes: &[u8]) -> Result<DecodedImage, BackendError> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(BackendError::Io)?;
    if reader.format().is_none() {
        if let Ok(format) = ImageFormat::from_path(name) {
            reader.set_format(format);
        }
    }

    let mut decoder = reader.into_decoder().map_err(|e| decode_error(name, e))?;
    let icc_profile = decoder.icc_profile().ok().flatten();
    let exif = decoder.exif_metadata().ok().flatten();
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);

    let mut pixels = DynamicImage::from_decoder(decoder).map_err(|e| decode_error(name, e))?;
    if orientation != Orientation::NoTransforms {
        tracing::debug!("{name}: applying EXIF orientation {orientation:?}");
        pixels.apply_orientation(orientation);
    }

    Ok(DecodedImage {
        pixels,
        icc_profile,
        exif: exif.map(upright_exif),
        source_name: name.to_string(),
    })
}

/// Drop any `Exif\0\0` marker and reset Orientation to 1.
///
/// Pixels are already rotated during decode, so re-embedding the original
/// tag would make viewers rotate them again.
fn upright_exif(raw: Vec<u8>) -> Vec<u8> {
    let mut tiff = match raw.strip_prefix(EXIF_PREFIX) {
        Some(rest) => rest.to_vec(),
        None => raw,
    };
    Orientation::remove_from_exif_chunk(&mut tiff);
    tiff
}

/// Encode as baseline or progressive JPEG through mozjpeg.
fn encode_jpeg(img: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
    let rgb: Cow<'_, RgbImage> = match img {
        DynamicImage::ImageRgb8(rgb) => Cow::Borrowed(rgb),
        _ => Cow::Owned(img.to_rgb8()),
    };
    let (w, h) = rgb.dimensions();
    if w == 0 || h == 0 {
        return Err(encode_error(OutputFormat::Jpeg, "image has zero width or height"));
    }

    let mut comp = Compress::new(ColorSpace::JCS_RGB);
    if !params.progressive {
        // mozjpeg's default profile turns on progressive scans; the
        // libjpeg-compatible profile gives a baseline file.
        comp.set_fastest_defaults();
    }
    comp.set_size(w as usize, h as usize);
    comp.set_color_space(ColorSpace::JCS_YCbCr);
    comp.set_quality(params.quality.value() as f32);
    comp.set_optimize_coding(params.optimize);
    if params.progressive {
        comp.set_progressive_mode();
    }

    let estimated_size = (w as usize * h as usize * 3 / 10).max(4096);
    let mut writer = comp
        .start_compress(Vec::with_capacity(estimated_size))
        .map_err(|e| encode_error(OutputFormat::Jpeg, format!("failed to start compress: {e}")))?;

    let stride = w as usize * 3;
    for row in rgb.as_raw().chunks(stride) {
        writer
            .write_scanlines(row)
            .map_err(|e| encode_error(OutputFormat::Jpeg, format!("failed to write scanlines: {e}")))?;
    }

    writer
        .finish()
        .map_err(|e| encode_error(OutputFormat::Jpeg, format!("failed to finish: {e}")))
}

/// Encode lossy WebP at the given quality with the slowest/best method.
fn encode_webp(img: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
    let (w, h) = (img.width(), img.height());
    let mut config =
        webp::WebPConfig::new().map_err(|_| encode_error(OutputFormat::Webp, "failed to create WebPConfig"))?;
    config.quality = params.quality.value() as f32;
    config.method = 6;

    let memory = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), w, h).encode_advanced(&config)
    } else {
        let rgb = img.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), w, h).encode_advanced(&config)
    }
    .map_err(|e| encode_error(OutputFormat::Webp, format!("{e:?}")))?;

    Ok(memory.to_vec())
}

/// Encode lossless PNG. Float buffers are narrowed to 8-bit first.
fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, BackendError> {
    let narrowed = match img.color() {
        ColorType::Rgb32F => Cow::Owned(DynamicImage::ImageRgb8(img.to_rgb8())),
        ColorType::Rgba32F => Cow::Owned(DynamicImage::ImageRgba8(img.to_rgba8())),
        _ => Cow::Borrowed(img),
    };
    let mut buf = Vec::new();
    narrowed
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| encode_error(OutputFormat::Png, e))?;
    Ok(buf)
}

/// Insert an EXIF block into an encoded JPEG or WebP file.
fn embed_exif(encoded: &[u8], format: OutputFormat, exif: &[u8]) -> Result<Vec<u8>, String> {
    let data = Bytes::copy_from_slice(encoded);
    let exif = Bytes::copy_from_slice(exif);
    let mut out = Vec::with_capacity(encoded.len() + exif.len() + 16);

    match format {
        OutputFormat::Jpeg => {
            if exif.len() > MAX_JPEG_EXIF {
                return Err(format!("{} bytes does not fit a JPEG APP1 segment", exif.len()));
            }
            let mut jpeg = Jpeg::from_bytes(data).map_err(|e| format!("failed to parse JPEG: {e}"))?;
            jpeg.set_exif(Some(exif));
            jpeg.encoder()
                .write_to(&mut out)
                .map_err(|e| format!("failed to write JPEG: {e}"))?;
        }
        OutputFormat::Webp => {
            let mut webp = WebP::from_bytes(data).map_err(|e| format!("failed to parse WebP: {e}"))?;
            webp.set_exif(Some(exif));
            webp.encoder()
                .write_to(&mut out)
                .map_err(|e| format!("failed to write WebP: {e}"))?;
        }
        OutputFormat::Png => return Err("PNG output does not carry metadata".into()),
    }
    Ok(out)
}

impl ImageBackend for RustBackend {
    fn decode(&self, name: &str, bytes: &[u8]) -> Result<DecodedImage, BackendError> {
        decode_image(name, bytes)
    }

    /// Encode `image` per `params`.
    ///
    /// Works from borrowed pixels and converts into fresh buffers, so the
    /// caller's image is never touched. When `keep_metadata` is set and the
    /// image carries EXIF, embedding is attempted after encoding; if the
    /// container rejects it the plain encoding is returned instead.
    fn encode(&self, image: &DecodedImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        let encoded = match params.format {
            OutputFormat::Jpeg => encode_jpeg(&image.pixels, params)?,
            OutputFormat::Webp => encode_webp(&image.pixels, params)?,
            OutputFormat::Png => return encode_png(&image.pixels),
        };

        let exif = match (&image.exif, params.keep_metadata) {
            (Some(exif), true) if !exif.is_empty() => exif,
            _ => return Ok(encoded),
        };

        match embed_exif(&encoded, params.format, exif) {
            Ok(with_metadata) => Ok(with_metadata),
            Err(reason) => {
                tracing::warn!(
                    "{}: could not embed metadata ({}), writing without it",
                    image.source_name,
                    reason
                );
                Ok(encoded)
            }
        }
    }
}
