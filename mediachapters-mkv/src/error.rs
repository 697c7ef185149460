//! Matroska-specific error types.
//!
//! Bounds errors from the cursor pass through unchanged as
//! [`MkvError::Cursor`]; everything else is structural and fatal.

use mediachapters_core::error::{ContainerError, CursorError};
use thiserror::Error;

/// Matroska/EBML error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MkvError {
    /// Ran out of data or hit an unreadable VINT.
    #[error(transparent)]
    Cursor(#[from] CursorError),

    /// The buffer does not start with the EBML magic.
    #[error("File isn't EBML (got: {magic:08x})")]
    NotEbml {
        /// The first four bytes of the buffer.
        magic: u32,
    },

    /// The EBML doctype is not one this crate reads.
    #[error("File isn't Matroska/WebM (doctype {0:?})")]
    UnsupportedDocType(String),

    /// Element IDs narrower or wider than four bytes.
    #[error("Unsupported max ID length {0}")]
    UnsupportedIdLength(u64),

    /// The element after the EBML header is not a Segment.
    #[error("Not a segment (got ID 0x{id:X})")]
    NotASegment {
        /// The element ID found instead.
        id: u32,
    },

    /// An element the schema does not know, with unknown elements disallowed.
    #[error("Unknown element ID 0x{id:X} in {schema} at offset {offset}")]
    UnknownElement {
        /// Schema being decoded.
        schema: &'static str,
        /// The unknown element ID.
        id: u32,
        /// Offset of the element's size field.
        offset: usize,
    },

    /// A non-repeatable element appeared twice.
    #[error("Duplicate record {key} in {schema}")]
    DuplicateRecord {
        /// Schema being decoded.
        schema: &'static str,
        /// Output key of the repeated element.
        key: &'static str,
    },

    /// A required element was absent.
    #[error("Missing required {key} in {schema}")]
    MissingRequired {
        /// Schema being decoded.
        schema: &'static str,
        /// Output key of the missing element.
        key: &'static str,
    },

    /// An unsigned integer element wider than eight bytes.
    #[error("Unsupported integer size {size} at offset {offset}")]
    InvalidIntegerSize {
        /// Offset of the payload.
        offset: usize,
        /// Declared payload size.
        size: u64,
    },

    /// A float element that is not 0, 4 or 8 bytes long.
    #[error("Invalid float size {size} at offset {offset}")]
    InvalidFloatSize {
        /// Offset of the payload.
        offset: usize,
        /// Declared payload size.
        size: u64,
    },

    /// Master elements nested deeper than the configured limit.
    #[error("Recursion limit exceeded at depth {depth}")]
    RecursionLimit {
        /// The depth at which recursion was limited.
        depth: u32,
    },
}

impl MkvError {
    /// True for bounds-class errors, which iteration contexts recover from.
    pub fn is_bounds(&self) -> bool {
        matches!(self, MkvError::Cursor(_))
    }
}

/// Result type for Matroska operations.
pub type Result<T> = std::result::Result<T, MkvError>;

/// Convert MkvError to mediachapters_core::Error.
impl From<MkvError> for mediachapters_core::Error {
    fn from(err: MkvError) -> Self {
        match err {
            MkvError::Cursor(e) => mediachapters_core::Error::Cursor(e),
            MkvError::UnsupportedDocType(_) | MkvError::UnsupportedIdLength(_) => {
                mediachapters_core::Error::Unsupported(err.to_string())
            }
            MkvError::MissingRequired { schema, key } => mediachapters_core::Error::Container(
                ContainerError::MissingElement(format!("{schema}.{key}")),
            ),
            MkvError::DuplicateRecord { schema, key } => mediachapters_core::Error::Container(
                ContainerError::DuplicateElement(format!("{schema}.{key}")),
            ),
            MkvError::RecursionLimit { depth } => {
                mediachapters_core::Error::Container(ContainerError::RecursionLimit { depth })
            }
            _ => mediachapters_core::Error::Container(ContainerError::InvalidStructure(
                err.to_string(),
            )),
        }
    }
}
