//! # mediachapters
//!
//! Chapter markers from Matroska/WebM and MP4-family files, read from an
//! in-memory buffer that may hold only the first few megabytes of the file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mediachapters::{extract, to_webvtt, MediaType, ParseConfig};
//!
//! let data = std::fs::read("movie.mkv").unwrap();
//! let media_type = MediaType::from_extension("mkv").unwrap();
//!
//! match extract(media_type, &data, ParseConfig::default()) {
//!     Ok(extraction) => {
//!         if let Some(info) = &extraction.info {
//!             print!("{}", to_webvtt(&info.cues("eng"), info.duration, &extraction.quirks));
//!         }
//!     }
//!     Err(failure) => eprintln!("{failure} [{}]", failure.quirks.join(", ")),
//! }
//! ```
//!
//! ## Architecture
//!
//! - `mediachapters-core`: byte cursor, errors, quirks, chapter model
//! - `mediachapters-mkv`: schema-driven EBML decoder and Matroska chapters
//! - `mediachapters-mp4`: ISOBMFF box walker and MP4 chapters
//!
//! This crate picks the parser for a media type and returns the quirks
//! whether or not extraction succeeds.

mod extract;
mod media_type;

pub use extract::{extract, parser_for, Extraction, ExtractionFailure};
pub use media_type::MediaType;

pub use mediachapters_core::{
    chapter::format_timestamp, preferred_title, to_webvtt, Chapter, ChapterCue, ChapterInfo,
    ChapterParser, ContainerError, CursorError, Error, ParseConfig, Quirks, Result, Title,
    DEFAULT_MAX_DEPTH,
};
pub use mediachapters_mkv::{MatroskaParser, MkvError};
pub use mediachapters_mp4::{verify_filetype, Mp4Error, Mp4Parser, DEFAULT_REQUIRED_BRAND};
