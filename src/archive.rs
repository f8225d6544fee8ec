//! Delivery packaging: one file as-is, several files as a ZIP.
//!
//! | Outputs | Delivery |
//! |---|---|
//! | 0 | nothing (`None`) |
//! | 1 | the encoded file itself, with its image MIME type |
//! | 2+ | `exports_{YYYYMMDD_HHMMSS}.zip`, deflate-compressed, `application/zip` |
//!
//! Archive entries keep batch order. Two outputs that would share a filename
//! (say `a.jpg` and `raw/a.png` both becoming `a_web.jpg`) get a numeric
//! suffix on the later one (`a_web_2.jpg`) so no entry shadows another.

use crate::types::EncodedOutput;
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

pub const ZIP_MIME_TYPE: &str = "application/zip";

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// What a batch hands back to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Single(EncodedOutput),
    Archive(EncodedOutput),
}

impl Delivery {
    pub fn file(&self) -> &EncodedOutput {
        match self {
            Delivery::Single(file) | Delivery::Archive(file) => file,
        }
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, Delivery::Archive(_))
    }
}

/// `exports_{YYYYMMDD_HHMMSS}.zip` for the given local time.
pub fn archive_name(now: NaiveDateTime) -> String {
    now.format("exports_%Y%m%d_%H%M%S.zip").to_string()
}

fn unique_filename(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{ext}")),
        None => (name, String::new()),
    };
    (2..)
        .map(|n| format!("{stem}_{n}{ext}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

/// Pack outputs into an in-memory ZIP, in order.
fn zip_outputs(outputs: &[EncodedOutput]) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut taken = HashSet::new();

    for output in outputs {
        let name = unique_filename(&output.filename, &taken);
        if name != output.filename {
            tracing::warn!("duplicate output name {}, stored as {}", output.filename, name);
        }
        writer.start_file(name.as_str(), options)?;
        writer.write_all(&output.bytes)?;
        taken.insert(name);
    }

    Ok(writer.finish()?.into_inner())
}

/// Decide how a batch is delivered.
///
/// `now` names the archive; pass `chrono::Local::now().naive_local()`.
pub fn package(outputs: Vec<EncodedOutput>, now: NaiveDateTime) -> Result<Option<Delivery>, ArchiveError> {
    if outputs.len() <= 1 {
        return Ok(outputs.into_iter().next().map(Delivery::Single));
    }

    let bytes = zip_outputs(&outputs)?;
    let filename = archive_name(now);
    tracing::debug!("{filename}: {} entries, {} bytes", outputs.len(), bytes.len());
    Ok(Some(Delivery::Archive(EncodedOutput {
        filename,
        bytes,
        mime_type: ZIP_MIME_TYPE,
    })))
}

/// Write the delivered file into `dir`, creating it if needed.
pub fn write_delivery(delivery: &Delivery, dir: &Path) -> Result<PathBuf, ArchiveError> {
    std::fs::create_dir_all(dir)?;
    let file = delivery.file();
    let path = dir.join(&file.filename);
    std::fs::write(&path, &file.bytes)?;
    Ok(path)
}
