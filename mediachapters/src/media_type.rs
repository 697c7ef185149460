//! Container family selection from MIME types and file extensions.

use serde::Serialize;
use std::fmt;

/// Container family a buffer is parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// ISO Base Media File Format (MP4, M4A, M4B, MOV).
    IsoBmff,
    /// Matroska and WebM.
    Matroska,
}

impl MediaType {
    /// Select the container family for a MIME type.
    ///
    /// Parameters such as `; codecs=...` are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "video/mp4" | "video/mpeg" | "video/x-m4v" | "audio/mp4" => Some(Self::IsoBmff),
            "video/webm" | "audio/webm" | "video/x-matroska" | "audio/x-matroska" => {
                Some(Self::Matroska)
            }
            _ => None,
        }
    }

    /// Select the container family for a file extension, without the dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" | "m4v" | "m4a" | "m4b" | "mov" => Some(Self::IsoBmff),
            "mkv" | "mka" | "webm" => Some(Self::Matroska),
            _ => None,
        }
    }

    /// Short lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IsoBmff => "isobmff",
            Self::Matroska => "matroska",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IsoBmff => write!(f, "ISOBMFF"),
            Self::Matroska => write!(f, "Matroska"),
        }
    }
}
