//! Pure calculation functions for image dimensions and placement.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::WatermarkPosition;

/// Calculate dimensions for a long-edge resize.
///
/// Returns `None` when no resize should happen: the target is zero or the
/// image's longer edge already fits. Images are never upscaled.
///
/// # Examples
/// ```
/// # use imgprep::imaging::calculations::calculate_long_edge_dimensions;
/// // 4000x3000 landscape to a 2048 long edge → 2048x1536
/// assert_eq!(calculate_long_edge_dimensions((4000, 3000), 2048), Some((2048, 1536)));
///
/// // Already small enough → no-op
/// assert_eq!(calculate_long_edge_dimensions((800, 600), 2048), None);
/// ```
pub fn calculate_long_edge_dimensions(original: (u32, u32), target_long_edge: u32) -> Option<(u32, u32)> {
    let (w, h) = original;
    let long_side = w.max(h);

    if target_long_edge == 0 || long_side <= target_long_edge {
        return None;
    }

    let scale = target_long_edge as f64 / long_side as f64;
    let new_w = ((w as f64 * scale).round() as u32).max(1);
    let new_h = ((h as f64 * scale).round() as u32).max(1);
    Some((new_w, new_h))
}

/// Calculate the scaled watermark size for a base image width.
///
/// Width is `scale_pct` percent of the base width, truncated, at least 1px.
/// Height follows the watermark's own aspect ratio, truncated, at least 1px.
pub fn calculate_watermark_dimensions(base_width: u32, watermark: (u32, u32), scale_pct: f32) -> (u32, u32) {
    let (wm_w, wm_h) = watermark;
    let target_w = ((base_width as f64 * (scale_pct as f64 / 100.0)) as u32).max(1);
    if wm_w == 0 {
        return (target_w, wm_h.max(1));
    }
    let scale = target_w as f64 / wm_w as f64;
    let target_h = ((wm_h as f64 * scale) as u32).max(1);
    (target_w, target_h)
}

/// Calculate the top-left corner of the watermark on the base image.
///
/// No clamping: with large watermarks or margins the result can be negative
/// or push the watermark past the far edge. Compositing clips it.
///
/// # Examples
/// ```
/// # use imgprep::imaging::calculations::calculate_watermark_offset;
/// # use imgprep::imaging::WatermarkPosition;
/// let xy = calculate_watermark_offset((1000, 800), (100, 80), WatermarkPosition::BottomRight, 24);
/// assert_eq!(xy, (876, 696));
/// ```
pub fn calculate_watermark_offset(
    base: (u32, u32),
    watermark: (u32, u32),
    position: WatermarkPosition,
    margin_px: u32,
) -> (i64, i64) {
    let (base_w, base_h) = (base.0 as i64, base.1 as i64);
    let (wm_w, wm_h) = (watermark.0 as i64, watermark.1 as i64);
    let margin = margin_px as i64;

    match position {
        WatermarkPosition::TopLeft => (margin, margin),
        WatermarkPosition::TopRight => (base_w - wm_w - margin, margin),
        WatermarkPosition::BottomLeft => (margin, base_h - wm_h - margin),
        WatermarkPosition::BottomRight => (base_w - wm_w - margin, base_h - wm_h - margin),
        WatermarkPosition::Center => (
            (base_w - wm_w).div_euclid(2),
            (base_h - wm_h).div_euclid(2),
        ),
    }
}
