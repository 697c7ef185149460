//! One-call chapter extraction that always reports quirks.

use crate::media_type::MediaType;
use mediachapters_core::{ChapterInfo, ChapterParser, Error, ParseConfig};
use mediachapters_mkv::MatroskaParser;
use mediachapters_mp4::Mp4Parser;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Build the parser for a container family.
pub fn parser_for<'a>(
    media_type: MediaType,
    data: &'a [u8],
    config: ParseConfig,
) -> Box<dyn ChapterParser + 'a> {
    match media_type {
        MediaType::IsoBmff => Box::new(Mp4Parser::new(data)),
        MediaType::Matroska => Box::new(MatroskaParser::with_config(data, config)),
    }
}

/// A finished extraction.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    /// Container family the buffer was parsed as.
    pub media_type: MediaType,
    /// The chapters, or `None` if the file has none.
    pub info: Option<ChapterInfo>,
    /// Diagnostics recorded while parsing.
    pub quirks: Vec<String>,
}

impl Extraction {
    /// Number of chapters found.
    pub fn chapter_count(&self) -> usize {
        self.info.as_ref().map_or(0, ChapterInfo::len)
    }
}

/// A failed extraction, with the diagnostics recorded before the failure.
#[derive(Debug, Error)]
#[error("{media_type} chapter extraction failed: {error}")]
pub struct ExtractionFailure {
    /// Container family the buffer was parsed as.
    pub media_type: MediaType,
    /// What went wrong.
    #[source]
    pub error: Error,
    /// Diagnostics recorded before the failure.
    pub quirks: Vec<String>,
}

/// Extract chapters from a buffer that starts at file offset 0.
///
/// The buffer may be a prefix of the file.
pub fn extract(
    media_type: MediaType,
    data: &[u8],
    config: ParseConfig,
) -> Result<Extraction, ExtractionFailure> {
    let mut parser = parser_for(media_type, data, config);
    let result = parser.parse_chapters();
    let quirks = parser.quirks().to_vec();

    match result {
        Ok(info) => {
            debug!(
                format = parser.format_name(),
                chapters = info.as_ref().map_or(0, ChapterInfo::len),
                quirks = quirks.len(),
                "Extraction finished"
            );
            Ok(Extraction {
                media_type,
                info,
                quirks,
            })
        }
        Err(error) => {
            debug!(format = parser.format_name(), error = %error, "Extraction failed");
            Err(ExtractionFailure {
                media_type,
                error,
                quirks,
            })
        }
    }
}
