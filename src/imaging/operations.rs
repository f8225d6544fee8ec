//! High-level pixel operations.
//!
//! These functions combine the pure [`calculations`](super::calculations)
//! with the `image` crate's resampling and compositing. All of them take the
//! input by reference and return a new [`DecodedImage`].

use super::backend::DecodedImage;
use super::calculations::{
    calculate_long_edge_dimensions, calculate_watermark_dimensions, calculate_watermark_offset,
};
use super::params::WatermarkParams;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbaImage};

/// Resampling filter for every downscale in the pipeline.
pub const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

/// Resize so the longer edge equals `target_long_edge`.
///
/// Never upscales: images that already fit (or a zero target) come back as
/// an identical copy.
pub fn resize_to_long_edge(image: &DecodedImage, target_long_edge: u32) -> DecodedImage {
    let (w, h) = image.pixels.dimensions();
    match calculate_long_edge_dimensions((w, h), target_long_edge) {
        Some((new_w, new_h)) => {
            tracing::debug!("{}: resize {w}x{h} → {new_w}x{new_h}", image.source_name);
            image.with_pixels(image.pixels.resize_exact(new_w, new_h, RESAMPLE_FILTER))
        }
        None => image.clone(),
    }
}

/// Multiply every alpha value by `opacity_pct / 100`, truncating.
///
/// Values of 100 or more leave alpha untouched rather than amplifying it;
/// negative values clamp to fully transparent.
pub fn apply_opacity(watermark: &mut RgbaImage, opacity_pct: f32) {
    if opacity_pct >= 100.0 {
        return;
    }
    let factor = (opacity_pct as f64 / 100.0).max(0.0);
    for pixel in watermark.pixels_mut() {
        pixel.0[3] = (pixel.0[3] as f64 * factor).floor().clamp(0.0, 255.0) as u8;
    }
}

/// Composite a watermark onto `base`.
///
/// Both images are taken to RGBA, the watermark is scaled to
/// `scale_pct` percent of the base width (Lanczos3) and its alpha scaled by
/// the opacity, then it is drawn source-over at the position computed from
/// the anchor and margin. Parts that land off-canvas are clipped. The result
/// is always flattened to RGB.
pub fn apply_watermark(base: &DecodedImage, watermark: &DynamicImage, params: &WatermarkParams) -> DecodedImage {
    let mut canvas = base.pixels.to_rgba8();
    let (base_w, base_h) = canvas.dimensions();

    let mark = watermark.to_rgba8();
    let (wm_w, wm_h) = calculate_watermark_dimensions(base_w, mark.dimensions(), params.scale_pct);
    let mut mark = imageops::resize(&mark, wm_w, wm_h, RESAMPLE_FILTER);
    apply_opacity(&mut mark, params.opacity_pct);

    let (x, y) = calculate_watermark_offset((base_w, base_h), (wm_w, wm_h), params.position, params.margin_px);
    tracing::debug!(
        "{}: watermark {wm_w}x{wm_h} at ({x}, {y}), {}",
        base.source_name,
        params.position
    );

    imageops::overlay(&mut canvas, &mark, x, y);
    base.with_pixels(DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::WatermarkPosition;
    use crate::test_helpers::{gradient_rgb, solid_rgba};
    use image::{ColorType, Rgba};

    // =========================================================================
    // resize_to_long_edge tests
    // =========================================================================

    #[test]
    fn resize_downscales_landscape() {
        let image = DecodedImage::new(gradient_rgb(400, 300), "a.jpg");
        let out = resize_to_long_edge(&image, 200);
        assert_eq!(out.pixels.dimensions(), (200, 150));
    }

    #[test]
    fn resize_downscales_portrait() {
        let image = DecodedImage::new(gradient_rgb(300, 400), "a.jpg");
        let out = resize_to_long_edge(&image, 100);
        assert_eq!(out.pixels.dimensions(), (75, 100));
    }

    #[test]
    fn resize_never_upscales() {
        let image = DecodedImage::new(gradient_rgb(120, 80), "a.jpg");
        let out = resize_to_long_edge(&image, 2048);
        assert_eq!(out, image);
    }

    #[test]
    fn resize_zero_target_is_passthrough() {
        let image = DecodedImage::new(gradient_rgb(120, 80), "a.jpg");
        assert_eq!(resize_to_long_edge(&image, 0), image);
    }

    #[test]
    fn resize_keeps_metadata() {
        let mut image = DecodedImage::new(gradient_rgb(100, 50), "a.jpg");
        image.exif = Some(vec![7; 4]);
        let out = resize_to_long_edge(&image, 50);
        assert_eq!(out.exif, image.exif);
        assert_eq!(out.source_name, "a.jpg");
    }

    // =========================================================================
    // apply_opacity tests
    // =========================================================================

    #[test]
    fn opacity_scales_alpha() {
        let mut mark = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 200]));
        apply_opacity(&mut mark, 50.0);
        assert!(mark.pixels().all(|p| p.0[3] == 100));
    }

    #[test]
    fn opacity_truncates_fractional_alpha() {
        // 255 * 0.7 = 178.5
        let mut mark = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        apply_opacity(&mut mark, 70.0);
        assert_eq!(mark.get_pixel(0, 0).0[3], 178);
    }

    #[test]
    fn opacity_hundred_is_noop() {
        let mut mark = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 123]));
        let before = mark.clone();
        apply_opacity(&mut mark, 100.0);
        assert_eq!(mark, before);
        apply_opacity(&mut mark, 150.0);
        assert_eq!(mark, before);
    }

    #[test]
    fn opacity_zero_is_transparent() {
        let mut mark = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255]));
        apply_opacity(&mut mark, 0.0);
        assert!(mark.pixels().all(|p| p.0[3] == 0));
    }

    // =========================================================================
    // apply_watermark tests
    // =========================================================================

    fn params(position: WatermarkPosition, scale_pct: f32, opacity_pct: f32, margin_px: u32) -> WatermarkParams {
        WatermarkParams {
            position,
            scale_pct,
            opacity_pct,
            margin_px,
        }
    }

    #[test]
    fn watermark_output_is_rgb_with_base_dimensions() {
        let base = DecodedImage::new(gradient_rgb(200, 100), "a.jpg");
        let mark = solid_rgba(40, 20, [255, 0, 0, 255]);
        let out = apply_watermark(&base, &mark, &params(WatermarkPosition::BottomRight, 10.0, 100.0, 5));
        assert_eq!(out.color(), ColorType::Rgb8);
        assert_eq!(out.pixels.dimensions(), (200, 100));
    }

    #[test]
    fn watermark_lands_at_computed_offset() {
        // Base 1000x800 black, 100x80 opaque red mark at 10% → stays 100x80
        let base = DecodedImage::new(DynamicImage::new_rgb8(1000, 800), "a.jpg");
        let mark = solid_rgba(100, 80, [255, 0, 0, 255]);
        let out = apply_watermark(&base, &mark, &params(WatermarkPosition::BottomRight, 10.0, 100.0, 24));
        let rgb = out.pixels.to_rgb8();

        // Inside the mark: (876..976, 696..776)
        assert_eq!(rgb.get_pixel(876, 696).0, [255, 0, 0]);
        assert_eq!(rgb.get_pixel(975, 775).0, [255, 0, 0]);
        // Just outside
        assert_eq!(rgb.get_pixel(875, 696).0, [0, 0, 0]);
        assert_eq!(rgb.get_pixel(976, 775).0, [0, 0, 0]);
        assert_eq!(rgb.get_pixel(876, 776).0, [0, 0, 0]);
    }

    #[test]
    fn watermark_zero_opacity_leaves_base_unchanged() {
        let base = DecodedImage::new(gradient_rgb(120, 90), "a.jpg");
        let mark = solid_rgba(30, 30, [255, 255, 255, 255]);
        let out = apply_watermark(&base, &mark, &params(WatermarkPosition::Center, 25.0, 0.0, 0));
        assert_eq!(out.pixels, base.pixels);
    }

    #[test]
    fn watermark_full_opacity_matches_untouched_alpha() {
        // A half-transparent mark at 100% opacity blends exactly as its own alpha says
        let base = DecodedImage::new(DynamicImage::new_rgb8(100, 100), "a.jpg");
        let mark = solid_rgba(10, 10, [255, 255, 255, 128]);
        let out = apply_watermark(&base, &mark, &params(WatermarkPosition::TopLeft, 10.0, 100.0, 0));

        let mut expected = base.pixels.to_rgba8();
        imageops::overlay(&mut expected, &mark.to_rgba8(), 0, 0);
        assert_eq!(out.pixels.to_rgb8(), DynamicImage::ImageRgba8(expected).to_rgb8());
    }

    #[test]
    fn watermark_off_canvas_is_clipped() {
        // Mark wider than the base with a big margin: negative offset, no panic
        let base = DecodedImage::new(DynamicImage::new_rgb8(50, 50), "a.jpg");
        let mark = solid_rgba(10, 10, [0, 255, 0, 255]);
        let out = apply_watermark(&base, &mark, &params(WatermarkPosition::BottomRight, 100.0, 100.0, 200));
        assert_eq!(out.pixels.dimensions(), (50, 50));
        // Entirely off-canvas: nothing drawn
        assert!(out.pixels.to_rgb8().pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn watermark_partially_off_canvas() {
        // 60x60 mark on 50x50 base, top-left with margin 0 → covers the whole base
        let base = DecodedImage::new(DynamicImage::new_rgb8(50, 50), "a.jpg");
        let mark = solid_rgba(60, 60, [0, 0, 255, 255]);
        let out = apply_watermark(&base, &mark, &params(WatermarkPosition::Center, 120.0, 100.0, 0));
        assert_eq!(out.pixels.to_rgb8().get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(out.pixels.to_rgb8().get_pixel(49, 49).0, [0, 0, 255]);
    }

    #[test]
    fn watermark_does_not_mutate_inputs() {
        let base = DecodedImage::new(gradient_rgb(64, 64), "a.jpg");
        let mark = solid_rgba(16, 16, [255, 0, 0, 255]);
        let (base_before, mark_before) = (base.clone(), mark.clone());
        let _ = apply_watermark(&base, &mark, &params(WatermarkPosition::TopRight, 20.0, 50.0, 4));
        assert_eq!(base, base_before);
        assert_eq!(mark, mark_before);
    }
}
