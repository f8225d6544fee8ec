//! # imgprep
//!
//! Batch image preparation for the web and social media. Point it at photos,
//! folders, or ZIP archives and get back display-ready files: color-managed,
//! downscaled, optionally watermarked, and re-encoded. One image comes back
//! as a single file; several come back as one timestamped ZIP.
//!
//! # Architecture: Per-Image Pipeline
//!
//! ```text
//! inputs ─► input ─► [DecodedImage] ─► pipeline ─► [EncodedOutput] ─► archive ─► Delivery
//!          (files,     (oriented,      normalize     (named            (single file
//!           dirs,       ICC + EXIF)    → resize      {base}{suffix}     or ZIP)
//!           ZIPs)                      → watermark   .{ext})
//!                                      → encode
//! ```
//!
//! Every stage is best-effort per image: an input that fails to decode or
//! encode is dropped into a skip list and the batch carries on. Images are
//! processed one at a time, in input order, so output order and naming are
//! deterministic.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`input`] | Reads files, directories, and ZIP archives into decoded images; collects skips |
//! | [`imaging`] | Codec backend (decode/encode) plus pure color, resize, and watermark operations |
//! | [`pipeline`] | `process_one` / `encode_one` / `process_all` orchestration, progress events, preview |
//! | [`archive`] | Single-file vs ZIP delivery with a timestamped archive name |
//! | [`naming`] | `{base}{suffix}.{ext}` output filename derivation |
//! | [`config`] | Layered `imgprep.toml` loading, validation, presets, CLI overrides |
//! | [`types`] | Shared result types (`EncodedOutput`, `Skipped`) |
//! | [`output`] | CLI output formatting |
//! | [`logging`] | `tracing` subscriber setup |
//!
//! # Design Decisions
//!
//! ## Codec Backend Behind a Trait
//!
//! Only decoding and encoding need real codecs, so only those sit behind
//! [`imaging::ImageBackend`]. Color normalization, resizing, and watermark
//! compositing are plain functions over `image` buffers. Orchestration tests
//! swap in a mock backend that records what it was asked to encode, and run
//! without touching JPEG or WebP libraries.
//!
//! ## Native Lossy Encoders
//!
//! The `image` crate's JPEG encoder has no progressive mode and its WebP
//! encoder is lossless only. JPEG goes through `mozjpeg` (progressive scans,
//! optimized Huffman tables) and WebP through `libwebp` via the `webp` crate
//! (quality plus the slowest, smallest compression method). PNG stays in
//! the `image` crate.
//!
//! ## Decode Once, Orient Once
//!
//! EXIF orientation is applied to the pixels during decode, and the
//! Orientation tag in the retained EXIF block is reset to 1 at the same
//! time. Keeping metadata therefore never causes a viewer to rotate the
//! exported file a second time.
//!
//! ## Inputs Are Never Mutated
//!
//! Every operation borrows its input and returns a new image. A decoded
//! image can be previewed, processed with different settings, and encoded
//! again without reloading.

pub mod archive;
pub mod config;
pub mod imaging;
pub mod input;
pub mod logging;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
