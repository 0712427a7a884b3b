//! File classification and blob naming for uploaded notes.

use serde::{Deserialize, Serialize};

use crate::constants::NOTES_PREFIX;

/// Category of an uploaded document, derived from its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Ppt,
    Image,
}

impl FileType {
    /// Classify by extension (case-insensitive). Unrecognised or missing
    /// extensions count as `Pdf`.
    pub fn from_file_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".ppt") || lower.ends_with(".pptx") {
            Self::Ppt
        } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") || lower.ends_with(".png")
        {
            Self::Image
        } else {
            Self::Pdf
        }
    }

    /// Credits awarded for uploading a file of this type.
    pub fn credits(self) -> i64 {
        match self {
            Self::Pdf => 3,
            Self::Ppt => 2,
            Self::Image => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Ppt => "ppt",
            Self::Image => "image",
        }
    }
}

/// Replace every character outside `[A-Za-z0-9.-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Blob store key for a note uploaded at `epoch_millis`.
pub fn note_blob_path(epoch_millis: i64, original_name: &str) -> String {
    format!(
        "{NOTES_PREFIX}/{epoch_millis}-{}",
        sanitize_file_name(original_name)
    )
}
