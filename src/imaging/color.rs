//! Color normalization: every image leaves here as RGB or RGBA.
//!
//! With sRGB conversion enabled, an embedded ICC profile is applied through
//! `moxcms` (profile → built-in sRGB, 8-bit RGB in and out). Anything that
//! goes wrong on that path (unparseable profile, a gray or CMYK profile on
//! RGB data, transform errors) falls back to a plain channel conversion.
//! Normalization never fails.

use super::backend::DecodedImage;
use image::{ColorType, DynamicImage, RgbImage};
use moxcms::{ColorProfile, Layout, TransformOptions};

/// Normalize an image's color representation.
///
/// | `convert_to_srgb` | ICC profile | Result |
/// |---|---|---|
/// | true | present | profile → sRGB transform, RGB (plain RGB if the transform fails) |
/// | true | absent | plain RGB |
/// | false | any | unchanged if RGB8/RGBA8, else RGBA8 when it has alpha, RGB8 otherwise |
///
/// The input is left untouched; a new image is returned.
pub fn normalize(image: &DecodedImage, convert_to_srgb: bool) -> DecodedImage {
    if !convert_to_srgb {
        return match image.color() {
            ColorType::Rgb8 | ColorType::Rgba8 => image.clone(),
            color if color.has_alpha() => image.with_pixels(DynamicImage::ImageRgba8(image.pixels.to_rgba8())),
            _ => image.with_pixels(DynamicImage::ImageRgb8(image.pixels.to_rgb8())),
        };
    }

    let Some(icc) = image.icc_profile.as_deref() else {
        return image.with_pixels(DynamicImage::ImageRgb8(image.pixels.to_rgb8()));
    };

    match icc_to_srgb(&image.pixels, icc) {
        Ok(rgb) => {
            tracing::debug!("{}: converted embedded profile to sRGB", image.source_name);
            let mut out = image.with_pixels(DynamicImage::ImageRgb8(rgb));
            // Pixels are sRGB now; the old profile no longer describes them.
            out.icc_profile = None;
            out
        }
        Err(reason) => {
            tracing::warn!(
                "{}: ICC conversion failed ({}), using plain RGB conversion",
                image.source_name,
                reason
            );
            image.with_pixels(DynamicImage::ImageRgb8(image.pixels.to_rgb8()))
        }
    }
}

/// Apply an embedded ICC profile, producing 8-bit sRGB.
fn icc_to_srgb(pixels: &DynamicImage, icc: &[u8]) -> Result<RgbImage, String> {
    let src_profile =
        ColorProfile::new_from_slice(icc).map_err(|e| format!("failed to parse ICC profile: {e:?}"))?;
    let srgb = ColorProfile::new_srgb();

    let transform = src_profile
        .create_transform_8bit(Layout::Rgb, &srgb, Layout::Rgb, TransformOptions::default())
        .map_err(|e| format!("failed to create transform: {e:?}"))?;

    let src = pixels.to_rgb8();
    let (width, height) = src.dimensions();
    let mut dst = vec![0u8; src.as_raw().len()];

    let row_size = width as usize * 3;
    if row_size > 0 {
        for (src_row, dst_row) in src
            .as_raw()
            .chunks_exact(row_size)
            .zip(dst.chunks_exact_mut(row_size))
        {
            transform
                .transform(src_row, dst_row)
                .map_err(|e| format!("transform failed: {e:?}"))?;
        }
    }

    RgbImage::from_raw(width, height, dst).ok_or_else(|| "transformed buffer size mismatch".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{gradient_rgb, gradient_rgba};
    use image::{GrayImage, Luma};

    #[test]
    fn no_conversion_keeps_rgb_untouched() {
        let image = DecodedImage::new(gradient_rgb(16, 8), "a.jpg");
        let out = normalize(&image, false);
        assert_eq!(out, image);
    }

    #[test]
    fn no_conversion_keeps_alpha() {
        let image = DecodedImage::new(gradient_rgba(16, 8), "a.png");
        let out = normalize(&image, false);
        assert_eq!(out.color(), ColorType::Rgba8);
        assert_eq!(out.pixels, image.pixels);
    }

    #[test]
    fn no_conversion_expands_gray_to_rgb() {
        let gray = GrayImage::from_pixel(4, 4, Luma([77]));
        let image = DecodedImage::new(DynamicImage::ImageLuma8(gray), "g.png");
        let out = normalize(&image, false);
        assert_eq!(out.color(), ColorType::Rgb8);
        assert_eq!(out.pixels.to_rgb8().get_pixel(0, 0).0, [77, 77, 77]);
    }

    #[test]
    fn no_conversion_gray_alpha_becomes_rgba() {
        let image = DecodedImage::new(DynamicImage::new_luma_a8(3, 3), "ga.png");
        assert_eq!(normalize(&image, false).color(), ColorType::Rgba8);
    }

    #[test]
    fn srgb_with_profile_converts_and_drops_profile() {
        let p3 = ColorProfile::new_display_p3().encode().unwrap();
        let mut image = DecodedImage::new(gradient_rgb(32, 16), "p3.jpg");
        image.icc_profile = Some(p3);

        let out = normalize(&image, true);
        assert_eq!(out.color(), ColorType::Rgb8);
        assert_ne!(out.pixels.to_rgb8(), image.pixels.to_rgb8());
        assert_eq!(out.icc_profile, None);
        assert_eq!(out.dimensions(), image.dimensions());
        // Input untouched
        assert!(image.icc_profile.is_some());
    }

    #[test]
    fn srgb_without_profile_drops_alpha() {
        let image = DecodedImage::new(gradient_rgba(8, 8), "a.png");
        let out = normalize(&image, true);
        assert_eq!(out.color(), ColorType::Rgb8);
        assert_eq!(out.pixels, DynamicImage::ImageRgb8(image.pixels.to_rgb8()));
    }

    #[test]
    fn invalid_profile_falls_back_to_plain_rgb() {
        let mut image = DecodedImage::new(gradient_rgba(8, 8), "a.jpg");
        image.icc_profile = Some(b"definitely not an icc profile".to_vec());

        let out = normalize(&image, true);
        assert_eq!(out.color(), ColorType::Rgb8);
        assert_eq!(out.pixels, DynamicImage::ImageRgb8(image.pixels.to_rgb8()));
        // Fallback keeps the original profile bytes; nothing was converted.
        assert!(out.icc_profile.is_some());
    }

    #[test]
    fn input_is_not_mutated() {
        let mut image = DecodedImage::new(gradient_rgba(8, 8), "a.png");
        image.icc_profile = Some(vec![1, 2, 3]);
        let before = image.clone();
        let _ = normalize(&image, true);
        let _ = normalize(&image, false);
        assert_eq!(image, before);
    }
}
