//! Shared types passed between pipeline stages.
//!
//! Input loading and batch processing both report images they had to drop
//! as [`Skipped`] records rather than failing the whole run.

use std::fmt;

/// One encoded file, ready to be delivered on its own or packed in an archive.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedOutput {
    /// `{base}{suffix}.{ext}`, no directory component.
    pub filename: String,
    pub bytes: Vec<u8>,
    /// `image/jpeg`, `image/webp`, `image/png` or `application/zip`.
    pub mime_type: &'static str,
}

/// Pipeline stage at which an image was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipStage {
    /// Reading the file or decoding its bytes.
    Decode,
    Encode,
}

impl fmt::Display for SkipStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipStage::Decode => "decode",
            SkipStage::Encode => "encode",
        })
    }
}

/// An input that produced no output, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct Skipped {
    /// File path or archive entry name.
    pub name: String,
    pub stage: SkipStage,
    pub reason: String,
}

impl Skipped {
    pub fn new(name: impl Into<String>, stage: SkipStage, reason: impl ToString) -> Self {
        Self {
            name: name.into(),
            stage,
            reason: reason.to_string(),
        }
    }
}
