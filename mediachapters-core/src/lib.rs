//! # mediachapters-core
//!
//! Shared building blocks for the mediachapters container parsers.
//!
//! This crate provides:
//! - A bounds-checked big-endian byte cursor with EBML VINT decoding
//! - Error types shared by the Matroska and ISOBMFF parsers
//! - The quirk set used to report non-fatal observations
//! - The unified chapter model and the [`ChapterParser`] trait
//! - WebVTT rendering of chapter cues

pub mod error;
pub mod cursor;
pub mod vint;
pub mod quirks;
pub mod chapter;
pub mod traits;
pub mod webvtt;

pub use error::{ContainerError, CursorError, Error, Result};
pub use cursor::{ByteCursor, VINT_OVERSIZED};
pub use quirks::Quirks;
pub use chapter::{preferred_title, Chapter, ChapterCue, ChapterInfo, Title};
pub use traits::{ChapterParser, ParseConfig, DEFAULT_MAX_DEPTH};
pub use webvtt::to_webvtt;
