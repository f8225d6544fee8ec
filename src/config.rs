//! Export configuration.
//!
//! Handles loading, validating, and merging `imgprep.toml`. Settings are
//! layered, each layer overriding the one before it:
//!
//! ```text
//! stock defaults
//!   ← config file (--config FILE, else ./imgprep.toml if present)
//!     ← command-line flags (--quality 90, --format webp, ...)
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! preset = "web"            # custom | web | instagram-post | instagram-portrait | instagram-story
//!
//! [output]
//! # long_edge = 2048        # Overrides the preset's long edge (256-12000)
//! format = "jpeg"           # jpeg | webp | png
//! quality = 85              # 40-100, JPEG and WebP only
//! progressive = true        # JPEG only
//! optimize = true           # JPEG only
//! suffix = "_web"           # Appended to every output file name
//!
//! [color]
//! convert_to_srgb = true
//! keep_metadata = false     # Carry EXIF into JPEG/WebP output
//!
//! [watermark]
//! # path = "logo.png"       # No watermark unless set
//! position = "bottom-right" # top-left | top-right | bottom-left | bottom-right | center
//! scale_pct = 12            # Watermark width as % of image width (1-40)
//! opacity_pct = 70          # 0-100
//! margin_px = 24            # 0-200
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse; override just the values you want:
//!
//! ```toml
//! preset = "instagram-portrait"
//!
//! [output]
//! quality = 92
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{EncodeParams, OutputFormat, Quality, WatermarkParams, WatermarkPosition};
use crate::pipeline::{PipelineParams, Watermark};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file picked up from the working directory when `--config` is absent.
pub const CONFIG_FILE_NAME: &str = "imgprep.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Named long-edge targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// Use `output.long_edge` (2048 if unset).
    Custom,
    #[default]
    Web,
    InstagramPost,
    InstagramPortrait,
    InstagramStory,
}

impl Preset {
    pub fn long_edge(self) -> u32 {
        match self {
            Preset::Custom | Preset::Web => 2048,
            Preset::InstagramPost => 1080,
            Preset::InstagramPortrait => 1350,
            Preset::InstagramStory => 1920,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Preset::Custom => "custom",
            Preset::Web => "web",
            Preset::InstagramPost => "instagram-post",
            Preset::InstagramPortrait => "instagram-portrait",
            Preset::InstagramStory => "instagram-story",
        }
    }
}

/// Export configuration loaded from `imgprep.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Long-edge preset; `output.long_edge` wins when set.
    pub preset: Preset,
    /// Size, format, and encoder settings.
    pub output: OutputConfig,
    /// Color management and metadata.
    pub color: ColorConfig,
    /// Optional watermark overlay.
    pub watermark: WatermarkConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_edge: Option<u32>,
    pub format: OutputFormat,
    pub quality: u32,
    pub progressive: bool,
    pub optimize: bool,
    pub suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            long_edge: None,
            format: OutputFormat::Jpeg,
            quality: 85,
            progressive: true,
            optimize: true,
            suffix: "_web".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    pub convert_to_srgb: bool,
    pub keep_metadata: bool,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            convert_to_srgb: true,
            keep_metadata: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    /// PNG overlay. No watermark is applied when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub position: WatermarkPosition,
    pub scale_pct: u32,
    pub opacity_pct: u32,
    pub margin_px: u32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            path: None,
            position: WatermarkPosition::BottomRight,
            scale_pct: 12,
            opacity_pct: 70,
            margin_px: 24,
        }
    }
}

fn check_range(key: &str, value: u32, min: u32, max: u32) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "{key} must be {min}-{max}, got {value}"
        )))
    }
}

impl ExportConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(long_edge) = self.output.long_edge {
            check_range("output.long_edge", long_edge, 256, 12000)?;
        }
        check_range("output.quality", self.output.quality, 40, 100)?;
        check_range("watermark.scale_pct", self.watermark.scale_pct, 1, 40)?;
        check_range("watermark.opacity_pct", self.watermark.opacity_pct, 0, 100)?;
        check_range("watermark.margin_px", self.watermark.margin_px, 0, 200)?;
        if self.output.suffix.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "output.suffix must not contain path separators".into(),
            ));
        }
        Ok(())
    }

    /// Long edge after applying the preset and any explicit override.
    pub fn effective_long_edge(&self) -> u32 {
        self.output.long_edge.unwrap_or_else(|| self.preset.long_edge())
    }

    pub fn encode_params(&self) -> EncodeParams {
        EncodeParams {
            format: self.output.format,
            quality: Quality::new(self.output.quality),
            progressive: self.output.progressive,
            optimize: self.output.optimize,
            keep_metadata: self.color.keep_metadata,
        }
    }

    pub fn watermark_params(&self) -> WatermarkParams {
        WatermarkParams {
            position: self.watermark.position,
            scale_pct: self.watermark.scale_pct as f32,
            opacity_pct: self.watermark.opacity_pct as f32,
            margin_px: self.watermark.margin_px,
        }
    }

    /// Build pipeline parameters. `watermark` is the already-decoded overlay
    /// for `watermark.path`, if it loaded.
    pub fn pipeline_params(&self, watermark: Option<DynamicImage>) -> PipelineParams {
        PipelineParams {
            target_long_edge: self.effective_long_edge(),
            encode: self.encode_params(),
            convert_to_srgb: self.color.convert_to_srgb,
            watermark: watermark.map(|image| Watermark {
                image,
                params: self.watermark_params(),
            }),
            suffix: self.output.suffix.clone(),
        }
    }
}

// =============================================================================
// Command-line overrides
// =============================================================================

/// Flags that override config values for a single run.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct Overrides {
    /// Long-edge preset
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,
    /// Target long edge in pixels (overrides the preset)
    #[arg(long)]
    pub long_edge: Option<u32>,
    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
    /// Encoder quality (40-100)
    #[arg(long)]
    pub quality: Option<u32>,
    /// Progressive JPEG scans
    #[arg(long, overrides_with = "no_progressive")]
    pub progressive: bool,
    #[arg(long, overrides_with = "progressive")]
    pub no_progressive: bool,
    /// Optimized JPEG Huffman tables
    #[arg(long, overrides_with = "no_optimize")]
    pub optimize: bool,
    #[arg(long, overrides_with = "optimize")]
    pub no_optimize: bool,
    /// Convert embedded color profiles to sRGB
    #[arg(long, overrides_with = "no_srgb")]
    pub srgb: bool,
    #[arg(long, overrides_with = "srgb")]
    pub no_srgb: bool,
    /// Keep EXIF metadata in the output
    #[arg(long, overrides_with = "no_keep_metadata")]
    pub keep_metadata: bool,
    #[arg(long, overrides_with = "keep_metadata")]
    pub no_keep_metadata: bool,
    /// Watermark PNG
    #[arg(long)]
    pub watermark: Option<PathBuf>,
    /// Watermark anchor
    #[arg(long, value_parser = ["top-left", "top-right", "bottom-left", "bottom-right", "center"])]
    pub position: Option<String>,
    /// Watermark width as % of image width (1-40)
    #[arg(long)]
    pub wm_scale: Option<u32>,
    /// Watermark opacity % (0-100)
    #[arg(long)]
    pub wm_opacity: Option<u32>,
    /// Watermark margin in pixels (0-200)
    #[arg(long)]
    pub wm_margin: Option<u32>,
    /// Output filename suffix
    #[arg(long)]
    pub suffix: Option<String>,
}

fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn insert_int(table: &mut toml::Table, key: &str, value: Option<u32>) {
    if let Some(v) = value {
        table.insert(key.into(), toml::Value::Integer(i64::from(v)));
    }
}

fn insert_bool(table: &mut toml::Table, key: &str, value: Option<bool>) {
    if let Some(v) = value {
        table.insert(key.into(), toml::Value::Boolean(v));
    }
}

fn insert_str(table: &mut toml::Table, key: &str, value: Option<String>) {
    if let Some(v) = value {
        table.insert(key.into(), toml::Value::String(v));
    }
}

impl Overrides {
    /// Sparse TOML table holding only the flags that were given.
    pub fn to_toml(&self) -> toml::Value {
        let mut root = toml::Table::new();
        insert_str(&mut root, "preset", self.preset.map(|p| p.as_str().to_string()));

        let mut output = toml::Table::new();
        insert_int(&mut output, "long_edge", self.long_edge);
        insert_str(&mut output, "format", self.format.map(|f| f.to_string().to_lowercase()));
        insert_int(&mut output, "quality", self.quality);
        insert_bool(&mut output, "progressive", flag_pair(self.progressive, self.no_progressive));
        insert_bool(&mut output, "optimize", flag_pair(self.optimize, self.no_optimize));
        insert_str(&mut output, "suffix", self.suffix.clone());

        let mut color = toml::Table::new();
        insert_bool(&mut color, "convert_to_srgb", flag_pair(self.srgb, self.no_srgb));
        insert_bool(
            &mut color,
            "keep_metadata",
            flag_pair(self.keep_metadata, self.no_keep_metadata),
        );

        let mut watermark = toml::Table::new();
        insert_str(
            &mut watermark,
            "path",
            self.watermark.as_ref().map(|p| p.to_string_lossy().into_owned()),
        );
        insert_str(&mut watermark, "position", self.position.clone());
        insert_int(&mut watermark, "scale_pct", self.wm_scale);
        insert_int(&mut watermark, "opacity_pct", self.wm_opacity);
        insert_int(&mut watermark, "margin_px", self.wm_margin);

        for (key, table) in [("output", output), ("color", color), ("watermark", watermark)] {
            if !table.is_empty() {
                root.insert(key.into(), toml::Value::Table(table));
            }
        }
        toml::Value::Table(root)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ExportConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge overlays in order onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<ExportConfig, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_toml);
    let config: ExportConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective config for a run.
///
/// An explicit `config_path` must exist. Without one, `imgprep.toml` in
/// `cwd` is used when present. `overrides` is applied last.
pub fn load_config(
    config_path: Option<&Path>,
    cwd: &Path,
    overrides: &Overrides,
) -> Result<ExportConfig, ConfigError> {
    let file_layer = match config_path {
        Some(path) => Some(toml::from_str(&fs::read_to_string(path)?)?),
        None => load_raw_config(&cwd.join(CONFIG_FILE_NAME))?,
    };
    if let Some(path) = config_path {
        tracing::debug!("config: {}", path.display());
    }

    let layers = file_layer.into_iter().chain(std::iter::once(overrides.to_toml()));
    resolve_config(stock_defaults_value()?, layers)
}

/// Returns a fully-commented stock `imgprep.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgprep Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# imgprep reads ./imgprep.toml, or the file given with --config.
# Command-line flags override anything set here.
# Unknown keys will cause an error.

# Long-edge preset:
#   custom             -> output.long_edge (2048 if unset)
#   web                -> 2048
#   instagram-post     -> 1080
#   instagram-portrait -> 1350
#   instagram-story    -> 1920
preset = "web"

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Target long edge in pixels (256-12000). Overrides the preset when set.
# Images are never upscaled.
# long_edge = 2048

# jpeg | webp | png (png is lossless and ignores the settings below).
format = "jpeg"

# Encoder quality (40 = smallest, 100 = best).
quality = 85

# Progressive JPEG scans.
progressive = true

# Optimized JPEG Huffman tables (smaller files, slower encode).
optimize = true

# Appended to each output name: IMG_0001.jpg -> IMG_0001_web.jpg
suffix = "_web"

# ---------------------------------------------------------------------------
# Color and metadata
# ---------------------------------------------------------------------------
[color]
# Convert embedded ICC profiles to sRGB. Output is always RGB when on.
convert_to_srgb = true

# Copy EXIF metadata into JPEG/WebP output (orientation is reset to normal).
keep_metadata = false

# ---------------------------------------------------------------------------
# Watermark
# ---------------------------------------------------------------------------
[watermark]
# PNG overlay. No watermark is applied unless a path is set.
# path = "logo.png"

# top-left | top-right | bottom-left | bottom-right | center
position = "bottom-right"

# Watermark width as a percentage of the image width (1-40).
scale_pct = 12

# Watermark opacity in percent (0-100).
opacity_pct = 70

# Distance from the anchored edges in pixels (0-200).
margin_px = 24
"##
}
