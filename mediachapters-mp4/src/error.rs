//! ISOBMFF-specific error types.

use mediachapters_core::error::{ContainerError, CursorError};
use thiserror::Error;

/// MP4/ISOBMFF error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Mp4Error {
    /// Ran out of data or seeked outside the buffer.
    #[error(transparent)]
    Cursor(#[from] CursorError),

    /// 64-bit box sizes are not supported.
    #[error("Unsupported 64-bit box size at offset {offset}")]
    LargeSize {
        /// Offset of the box.
        offset: usize,
    },

    /// A declared box size smaller than its own header.
    #[error("Invalid box size {size} at offset {offset}")]
    InvalidBoxSize {
        /// Offset of the box.
        offset: usize,
        /// Declared size.
        size: u32,
    },

    /// A required box is absent.
    #[error("Missing box {name} in {parent}")]
    MissingBox {
        /// Tag of the missing box.
        name: String,
        /// Parent box and offset, such as `moov@32`.
        parent: String,
    },

    /// A box that may appear once appeared twice.
    #[error("Duplicate box {name} in {parent}")]
    DuplicateBox {
        /// Tag of the repeated box.
        name: String,
        /// Parent box and offset.
        parent: String,
    },

    /// A full box version this crate does not read.
    #[error("Unsupported {name} version {version}")]
    UnsupportedVersion {
        /// Box tag.
        name: &'static str,
        /// Version found.
        version: u8,
    },

    /// A timescale of zero.
    #[error("Invalid timescale 0 in {0}")]
    ZeroTimescale(&'static str),

    /// A track whose handler is not a text handler.
    #[error("Incorrect handler type {0:?}")]
    HandlerType(String),

    /// A sample-to-chunk table other than one chunk holding every sample.
    #[error("Complex samples are not supported ({entries} stsc entries)")]
    ComplexSamples {
        /// Number of entries in the sample-to-chunk table.
        entries: usize,
    },

    /// A chunk offset table without entries.
    #[error("Chunk offset table is empty")]
    NoChunkOffset,

    /// The file does not start with an ftyp box.
    #[error("Non ftyp header ({0:?})")]
    NotFtyp(String),

    /// The ftyp box lacks a required compatible brand.
    #[error("Unsupported ISOBMF: brand {0:?} not listed")]
    MissingBrand(String),
}

impl Mp4Error {
    /// True for bounds-class errors, which iteration contexts recover from.
    pub fn is_bounds(&self) -> bool {
        matches!(self, Mp4Error::Cursor(_))
    }
}

/// Result type for MP4 operations.
pub type Result<T> = std::result::Result<T, Mp4Error>;

/// Convert Mp4Error to mediachapters_core::Error.
impl From<Mp4Error> for mediachapters_core::Error {
    fn from(err: Mp4Error) -> Self {
        match err {
            Mp4Error::Cursor(e) => mediachapters_core::Error::Cursor(e),
            Mp4Error::MissingBox { name, parent } => mediachapters_core::Error::Container(
                ContainerError::MissingElement(format!("{name} in {parent}")),
            ),
            Mp4Error::DuplicateBox { name, parent } => mediachapters_core::Error::Container(
                ContainerError::DuplicateElement(format!("{name} in {parent}")),
            ),
            Mp4Error::UnsupportedVersion { name, version } => {
                mediachapters_core::Error::Container(ContainerError::UnsupportedVersion {
                    element: name.to_string(),
                    version: u32::from(version),
                })
            }
            Mp4Error::LargeSize { .. }
            | Mp4Error::ComplexSamples { .. }
            | Mp4Error::NotFtyp(_)
            | Mp4Error::MissingBrand(_) => mediachapters_core::Error::Unsupported(err.to_string()),
            _ => mediachapters_core::Error::Container(ContainerError::InvalidStructure(
                err.to_string(),
            )),
        }
    }
}
