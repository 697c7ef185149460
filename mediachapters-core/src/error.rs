//! Error types for the mediachapters parsers.
//!
//! Errors fall into two families:
//!
//! - [`CursorError`]: the reader ran past the end of the buffer, was asked to
//!   seek out of range, or met a variable-length integer it cannot represent.
//!   These always carry the byte offset where they happened and can be
//!   recovered from inside sibling iteration.
//! - [`ContainerError`]: the input is malformed or uses a feature that is not
//!   supported. These are always fatal to the current extraction.

use thiserror::Error;

/// Bounds and position errors raised by [`ByteCursor`](crate::ByteCursor).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    /// A read needed more bytes than the buffer holds.
    #[error("End of buffer reached at offset {offset}: need {needed} bytes, have {available}")]
    EndOfBuffer {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A seek target outside of `0..len`.
    #[error("Seek to {target} out of range at offset {offset}")]
    SeekOutOfRange { offset: usize, target: i64 },

    /// A VINT whose first byte has no marker bit.
    #[error("VINT too big at offset {offset}")]
    VintTooBig { offset: usize },

    /// A VINT wider than the reader accepts for this value.
    #[error("Can't read vint({width}) at offset {offset}")]
    VintWidth { offset: usize, width: usize },

    /// An 8-byte VINT whose value does not fit in 32 bits.
    #[error("Can't cast U64({value}) to U32 at offset {offset}")]
    CastOverflow { offset: usize, value: u64 },
}

impl CursorError {
    /// Byte offset at which the error occurred.
    pub fn offset(&self) -> usize {
        match self {
            CursorError::EndOfBuffer { offset, .. }
            | CursorError::SeekOutOfRange { offset, .. }
            | CursorError::VintTooBig { offset }
            | CursorError::VintWidth { offset, .. }
            | CursorError::CastOverflow { offset, .. } => *offset,
        }
    }
}

/// Structural errors shared by the container parsers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContainerError {
    /// Invalid or corrupted container structure.
    #[error("Invalid container structure: {0}")]
    InvalidStructure(String),

    /// Missing required element or box.
    #[error("Missing required element: {0}")]
    MissingElement(String),

    /// An element or box that may appear once appeared twice.
    #[error("Duplicate element: {0}")]
    DuplicateElement(String),

    /// Element or box version this library does not read.
    #[error("Unsupported {element} version {version}")]
    UnsupportedVersion { element: String, version: u32 },

    /// Recursion limit exceeded during parsing.
    #[error("Recursion limit exceeded at depth {depth}")]
    RecursionLimit { depth: u32 },

    /// Generic container error message.
    #[error("{0}")]
    Other(String),
}

impl From<String> for ContainerError {
    fn from(s: String) -> Self {
        ContainerError::Other(s)
    }
}

impl From<&str> for ContainerError {
    fn from(s: &str) -> Self {
        ContainerError::Other(s.to_string())
    }
}

/// Main error type of the mediachapters crates.
#[derive(Error, Debug)]
pub enum Error {
    /// Ran out of data or addressed outside the buffer.
    #[error("Stream error: {0}")]
    Cursor(#[from] CursorError),

    /// Malformed container.
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// Well-formed input using an unsupported format or feature.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// I/O errors from the file-access layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the failure means "not enough data" rather than "bad data".
    pub fn is_out_of_data(&self) -> bool {
        matches!(self, Error::Cursor(_))
    }

    /// Offset of a bounds error, if this is one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Cursor(e) => Some(e.offset()),
            _ => None,
        }
    }
}

/// Result type for mediachapters operations.
pub type Result<T> = std::result::Result<T, Error>;
