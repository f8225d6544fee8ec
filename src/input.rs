//! Input loading: image files, directories, and ZIP archives.
//!
//! Every input is turned into zero or more [`DecodedImage`]s. Nothing here
//! fails the run: an unreadable file, a corrupt archive, or an entry that
//! does not decode is recorded as a [`Skipped`] entry and loading moves on.
//!
//! ## Recognition rules
//!
//! | Input | Handling |
//! |---|---|
//! | `*.zip` (file or bytes) | every non-directory entry with an image extension is decoded |
//! | directory | walked recursively, sorted by path; image and `.zip` files are loaded |
//! | any other file given explicitly | decoded as a single image, whatever its extension |
//!
//! Image extensions are matched case-insensitively against [`IMAGE_EXTENSIONS`].
//! Archive entries with other extensions, and directory entries, are ignored
//! without a skip record.

use crate::imaging::{BackendError, DecodedImage, ImageBackend};
use image::DynamicImage;
use crate::types::{SkipStage, Skipped};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Extensions recognized as images (lowercase, no dot).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tif", "tiff"];

/// Largest archive entry that will be read into memory.
pub const MAX_ENTRY_BYTES: u64 = 512 << 20;

/// Upper bound on the buffer reserved up front from an entry's declared size.
const ENTRY_PREALLOC_LIMIT: u64 = 64 << 20;

#[derive(Error, Debug)]
enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("entry exceeds {limit} bytes")]
    EntryTooLarge { limit: u64 },
}

/// Everything loaded from a set of inputs, in input order.
#[derive(Debug, Default)]
pub struct LoadedInputs {
    pub images: Vec<DecodedImage>,
    pub skipped: Vec<Skipped>,
}

impl LoadedInputs {
    fn append(&mut self, mut other: LoadedInputs) {
        self.images.append(&mut other.images);
        self.skipped.append(&mut other.skipped);
    }

    fn skip(&mut self, skipped: Skipped) {
        tracing::warn!("skipping {} ({}): {}", skipped.name, skipped.stage, skipped.reason);
        self.skipped.push(skipped);
    }
}

/// Case-insensitive `.{ext}` suffix match on the whole name.
///
/// A bare `.jpg` counts: the dot is treated as the extension separator even
/// at the start of the file name.
fn has_extension(name: &str, ext: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.strip_suffix(ext).is_some_and(|rest| rest.ends_with('.'))
}

/// True when the name carries a recognized image extension.
pub fn is_image_name(name: &str) -> bool {
    IMAGE_EXTENSIONS.iter().any(|ext| has_extension(name, ext))
}

/// True when the name indicates a ZIP archive.
pub fn is_archive_name(name: &str) -> bool {
    has_extension(name, "zip")
}

/// Decode one input given as bytes plus a name hint.
///
/// Archives fan out into their image entries; anything else is decoded as a
/// single image.
pub fn read_input(backend: &impl ImageBackend, name: &str, bytes: &[u8]) -> LoadedInputs {
    if is_archive_name(name) {
        return read_archive(backend, name, bytes);
    }

    let mut loaded = LoadedInputs::default();
    match backend.decode(name, bytes) {
        Ok(image) => loaded.images.push(image),
        Err(e) => loaded.skip(Skipped::new(name, SkipStage::Decode, e)),
    }
    loaded
}

fn read_archive(backend: &impl ImageBackend, name: &str, bytes: &[u8]) -> LoadedInputs {
    let mut loaded = LoadedInputs::default();
    let mut archive = match zip::ZipArchive::new(Cursor::new(bytes)) {
        Ok(archive) => archive,
        Err(e) => {
            loaded.skip(Skipped::new(name, SkipStage::Decode, InputError::from(e)));
            return loaded;
        }
    };

    for index in 0..archive.len() {
        let (entry_name, data) = match read_entry(&mut archive, index) {
            Ok(Some(entry)) => entry,
            Ok(None) => continue,
            Err((entry_name, e)) => {
                loaded.skip(Skipped::new(entry_name, SkipStage::Decode, e));
                continue;
            }
        };
        match backend.decode(&entry_name, &data) {
            Ok(image) => loaded.images.push(image),
            Err(e) => loaded.skip(Skipped::new(entry_name, SkipStage::Decode, e)),
        }
    }

    tracing::debug!("{name}: {} image(s) from archive", loaded.images.len());
    loaded
}

/// Read one archive entry. `Ok(None)` for directories and non-image names.
fn read_entry(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    index: usize,
) -> Result<Option<(String, Vec<u8>)>, (String, InputError)> {
    let mut entry = archive
        .by_index(index)
        .map_err(|e| (format!("entry #{index}"), InputError::from(e)))?;
    let entry_name = entry.name().to_string();
    if entry.is_dir() || !is_image_name(&entry_name) {
        return Ok(None);
    }

    // The declared size comes from the archive and may be forged.
    let mut data = Vec::with_capacity(entry.size().min(ENTRY_PREALLOC_LIMIT) as usize);
    entry
        .by_ref()
        .take(MAX_ENTRY_BYTES + 1)
        .read_to_end(&mut data)
        .map_err(|e| (entry_name.clone(), InputError::from(e)))?;
    if data.len() as u64 > MAX_ENTRY_BYTES {
        return Err((entry_name, InputError::EntryTooLarge { limit: MAX_ENTRY_BYTES }));
    }
    Ok(Some((entry_name, data)))
}

fn read_file(backend: &impl ImageBackend, path: &Path) -> LoadedInputs {
    let name = path.to_string_lossy();
    match std::fs::read(path) {
        Ok(bytes) => read_input(backend, &name, &bytes),
        Err(e) => {
            let mut loaded = LoadedInputs::default();
            loaded.skip(Skipped::new(name, SkipStage::Decode, InputError::from(e)));
            loaded
        }
    }
}

/// Files under `dir` that look like images or archives, sorted by path.
fn collect_dir(dir: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.path().to_string_lossy();
        if is_image_name(&name) || is_archive_name(&name) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Load every path, in order. Directories are walked recursively.
pub fn read_paths(backend: &impl ImageBackend, paths: &[PathBuf]) -> LoadedInputs {
    let mut loaded = LoadedInputs::default();
    for path in paths {
        if !path.is_dir() {
            loaded.append(read_file(backend, path));
            continue;
        }
        match collect_dir(path) {
            Ok(files) => {
                for file in &files {
                    loaded.append(read_file(backend, file));
                }
            }
            Err(e) => loaded.skip(Skipped::new(path.to_string_lossy(), SkipStage::Decode, e)),
        }
    }
    loaded
}

/// Load the watermark overlay.
///
/// A missing or undecodable file is logged and yields `None`; the export
/// then runs without a watermark.
pub fn read_watermark(backend: &impl ImageBackend, path: &Path) -> Option<DynamicImage> {
    let name = path.to_string_lossy();
    let decoded = std::fs::read(path)
        .map_err(BackendError::Io)
        .and_then(|bytes| backend.decode(&name, &bytes));
    match decoded {
        Ok(image) => Some(image.pixels),
        Err(e) => {
            tracing::warn!("watermark {name} could not be loaded ({e}), continuing without it");
            None
        }
    }
}
