//! # mediachapters-mp4
//!
//! MP4/ISOBMFF chapter extraction.
//!
//! Chapters are read from the Nero chapter list box (`chpl`) when present,
//! and otherwise reconstructed from a QuickTime-style text track: the sample
//! tables give each title's byte offset and start time, and every sample
//! holds one length-prefixed title.
//!
//! ## Example
//!
//! ```no_run
//! use mediachapters_mp4::Mp4Parser;
//!
//! let data = std::fs::read("audiobook.m4b").unwrap();
//! let mut parser = Mp4Parser::new(&data);
//!
//! if let Ok(Some(info)) = parser.parse() {
//!     for chapter in &info.chapters {
//!         println!("{chapter}");
//!     }
//! }
//! println!("quirks: {}", parser.quirks());
//! ```
//!
//! ## Box Structure
//!
//! ```text
//! ftyp
//! moov
//! ├── mvhd
//! ├── udta
//! │   └── chpl
//! └── trak
//!     └── mdia
//!         ├── mdhd
//!         ├── hdlr (text)
//!         └── minf
//!             ├── gmhd
//!             └── stbl (stts, stsc, stsz, stco)
//! ```

pub mod atoms;
pub mod boxes;
pub mod chapters;
pub mod error;

#[cfg(test)]
mod test_util;

pub use atoms::{verify_filetype, FtypAtom, MvhdAtom, DEFAULT_REQUIRED_BRAND};
pub use boxes::{BoxHeader, BoxTree, Boxes, FullBoxHeader};
pub use chapters::Mp4Parser;
pub use error::{Mp4Error, Result};
