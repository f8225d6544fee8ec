//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Images
//! 001 shoot/IMG_0001.jpg
//!     6000x4000 Rgb8, ICC profile, EXIF
//! 002 shoot/IMG_0002.jpg
//!     4000x6000 Rgb8
//!
//! Skipped
//!     notes.jpg (decode): Failed to decode notes.jpg: ...
//! ```
//!
//! ## Export
//!
//! ```text
//! Processing 2 images
//! 001 shoot/IMG_0001.jpg
//!     6000x4000 → 2048x1365
//!     Output: IMG_0001_web.jpg (412.3 KB)
//! 002 shoot/IMG_0002.jpg
//!     Skipped (encode): JPEG encode failed: ...
//!
//! Exported 1 image, 1 skipped
//!     ./IMG_0001_web.jpg (image/jpeg, 412.3 KB)
//! ```
//!
//! ## Preview
//!
//! ```text
//! Original: shoot/IMG_0001.jpg (6000x4000)
//!     Approx original re-encoded size: 8734.2 KB
//! Preview output: IMG_0001_web.jpg (2048x1365)
//!     Estimated output size: 412.3 KB
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure, with no I/O.

use crate::archive::Delivery;
use crate::imaging::Dimensions;
use crate::input::LoadedInputs;
use crate::pipeline::{BatchEvent, Preview};
use crate::types::Skipped;
use std::path::Path;

/// Shown when a batch has nothing to work on.
pub const NO_IMAGES_MESSAGE: &str = "No images to process.";

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn format_dimensions(d: Dimensions) -> String {
    format!("{}x{}", d.width, d.height)
}

/// Byte count as kilobytes with one decimal.
pub fn format_size(bytes: usize) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn skipped_line(skipped: &Skipped) -> String {
    format!("    {} ({}): {}", skipped.name, skipped.stage, skipped.reason)
}

// ============================================================================
// check
// ============================================================================

/// Format the decodable images and the skip list.
pub fn format_check(loaded: &LoadedInputs) -> Vec<String> {
    let mut lines = vec!["Images".to_string()];
    if loaded.images.is_empty() {
        lines.push(format!("    {NO_IMAGES_MESSAGE}"));
    }

    for (i, image) in loaded.images.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), image.source_name));
        let mut detail = format!("    {} {:?}", format_dimensions(image.dimensions()), image.color());
        if image.icc_profile.is_some() {
            detail.push_str(", ICC profile");
        }
        if image.exif.is_some() {
            detail.push_str(", EXIF");
        }
        lines.push(detail);
    }

    if !loaded.skipped.is_empty() {
        lines.push(String::new());
        lines.push("Skipped".to_string());
        lines.extend(loaded.skipped.iter().map(skipped_line));
    }
    lines
}

/// Print check output to stdout.
pub fn print_check(loaded: &LoadedInputs) {
    for line in format_check(loaded) {
        println!("{}", line);
    }
}

// ============================================================================
// export
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => vec![format!("Processing {}", plural(*total, "image"))],
        BatchEvent::ImageEncoded {
            index,
            source_name,
            filename,
            original,
            output,
            bytes,
        } => vec![
            format!("{} {}", format_index(*index), source_name),
            format!(
                "    {} \u{2192} {}",
                format_dimensions(*original),
                format_dimensions(*output)
            ),
            format!("    Output: {} ({})", filename, format_size(*bytes)),
        ],
        BatchEvent::ImageSkipped { index, skipped } => vec![
            format!("{} {}", format_index(*index), skipped.name),
            format!("    Skipped ({}): {}", skipped.stage, skipped.reason),
        ],
    }
}

/// Format the export summary once the delivery is written.
pub fn format_export(exported: usize, skipped: usize, delivery: &Delivery, written_to: &Path) -> Vec<String> {
    let mut summary = format!("Exported {}", plural(exported, "image"));
    if skipped > 0 {
        summary.push_str(&format!(", {skipped} skipped"));
    }

    let file = delivery.file();
    vec![
        String::new(),
        summary,
        format!(
            "    {} ({}, {})",
            written_to.display(),
            file.mime_type,
            format_size(file.bytes.len())
        ),
    ]
}

/// Print export summary to stdout.
pub fn print_export(exported: usize, skipped: usize, delivery: &Delivery, written_to: &Path) {
    for line in format_export(exported, skipped, delivery, written_to) {
        println!("{}", line);
    }
}

// ============================================================================
// preview
// ============================================================================

/// Format preview dimensions and size estimates.
pub fn format_preview(preview: &Preview, written_to: Option<&Path>) -> Vec<String> {
    let mut lines = vec![format!(
        "Original: {} ({})",
        preview.source_name,
        format_dimensions(preview.original)
    )];
    if let Some(size) = preview.original_size.filter(|&s| s > 0) {
        lines.push(format!("    Approx original re-encoded size: {}", format_size(size)));
    }

    lines.push(format!(
        "Preview output: {} ({})",
        preview.output.filename,
        format_dimensions(preview.processed.dimensions())
    ));
    lines.push(format!(
        "    Estimated output size: {}",
        format_size(preview.output.bytes.len())
    ));
    if let Some(path) = written_to {
        lines.push(format!("    Written: {}", path.display()));
    }
    lines
}

/// Print preview output to stdout.
pub fn print_preview(preview: &Preview, written_to: Option<&Path>) {
    for line in format_preview(preview, written_to) {
        println!("{}", line);
    }
}
