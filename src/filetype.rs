//! Document type detection from MIME types and file extensions.

use crate::error::MarkitdownError;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Document kinds recognised by markitdown.
///
/// Only [`FileType::Html`] and [`FileType::Pdf`] have converters; the others
/// are detected so callers get a precise "unsupported" error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Html,
    Pdf,
    Epub,
    Doc,
    Markdown,
    Text,
}

impl FileType {
    /// Map a `Content-Type` value. Parameters such as `charset` are ignored.
    pub fn from_mime(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "text/html" | "application/xhtml+xml" => Some(Self::Html),
            "application/pdf" => Some(Self::Pdf),
            "application/epub+zip" => Some(Self::Epub),
            "application/msword"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Doc)
            }
            "text/markdown" => Some(Self::Markdown),
            "text/plain" => Some(Self::Text),
            _ => None,
        }
    }

    /// Map a file extension, with or without the leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "html" | "htm" => Some(Self::Html),
            "pdf" => Some(Self::Pdf),
            "epub" => Some(Self::Epub),
            "doc" | "docx" => Some(Self::Doc),
            "md" | "markdown" => Some(Self::Markdown),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }

    /// Detect the type of a local file from its extension.
    pub fn from_path(path: &Path) -> Result<Self, MarkitdownError> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| MarkitdownError::UnsupportedFileType {
                detail: format!("'{}'", path.display()),
            })
    }

    /// `true` for types a converter exists for.
    pub fn has_converter(self) -> bool {
        matches!(self, Self::Html | Self::Pdf)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Epub => "epub",
            Self::Doc => "doc",
            Self::Markdown => "md",
            Self::Text => "txt",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
