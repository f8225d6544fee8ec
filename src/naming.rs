//! Output filename derivation.
//!
//! Every exported file is named `{base}{suffix}.{ext}`:
//! - `base` is the input name with any `/`- or `\`-delimited path prefix
//!   removed and the last `.extension` dropped
//! - `suffix` comes from the config (`_web` by default)
//! - `ext` is the lowercase extension of the output format
//!
//! Examples with suffix `_web` and JPEG output:
//! - `IMG_0001.JPG` → `IMG_0001_web.jpg`
//! - `trip/day1/beach.png` → `beach_web.jpg`
//! - `C:\photos\scan.tiff` → `scan_web.jpg`
//! - `archive.tar.gz` → `archive.tar_web.jpg`
//! - `.jpg` → `_web.jpg`

use crate::imaging::OutputFormat;

/// Input name without directories and without its last extension.
///
/// Everything from the last dot is dropped, even a leading one, so `.jpg`
/// has an empty base.
pub fn base_name(name: &str) -> &str {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match file.rfind('.') {
        Some(pos) => &file[..pos],
        None => file,
    }
}

/// Build the output filename for an input name.
pub fn output_filename(name: &str, suffix: &str, format: OutputFormat) -> String {
    format!("{}{}.{}", base_name(name), suffix, format.extension())
}
