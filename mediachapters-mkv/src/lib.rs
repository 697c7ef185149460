//! # mediachapters-mkv
//!
//! Matroska and WebM chapter extraction.
//!
//! The crate has two layers:
//! - A generic, schema-driven EBML decoder ([`schema`]) that turns one master
//!   element into a keyed [`Record`], enforcing cardinality and tolerating
//!   truncated trailing data.
//! - The Matroska schemas and the extractor ([`MatroskaParser`]) that picks
//!   an edition and normalizes its chapters.
//!
//! ## Example
//!
//! ```no_run
//! use mediachapters_mkv::MatroskaParser;
//!
//! let data = std::fs::read("video.mkv").unwrap();
//! let mut parser = MatroskaParser::new(&data);
//!
//! match parser.parse() {
//!     Ok(Some(info)) => {
//!         for chapter in &info.chapters {
//!             println!("{chapter}");
//!         }
//!     }
//!     Ok(None) => println!("no chapters"),
//!     Err(e) => eprintln!("{e} ({})", parser.quirks()),
//! }
//! ```
//!
//! ## Element Structure
//!
//! ```text
//! EBML Header
//! Segment
//! ├── SeekHead
//! │   └── Seek (SeekID, SeekPosition)
//! ├── Info (TimestampScale, Duration)
//! └── Chapters
//!     └── EditionEntry
//!         └── ChapterAtom (TimeStart, TimeEnd)
//!             └── ChapterDisplay (ChapString, ChapLanguage)
//! ```

pub mod ebml;
pub mod elements;
pub mod error;
pub mod matroska;
pub mod schema;

pub use error::{MkvError, Result};
pub use matroska::{EbmlHeader, MatroskaParser};
pub use schema::{Cardinality, Decode, EbmlDecoder, Field, Record, Schema, Value};
