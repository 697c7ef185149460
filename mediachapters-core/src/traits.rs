//! The interface every container chapter parser implements.

use crate::chapter::ChapterInfo;
use crate::error::Result;
use crate::quirks::Quirks;

/// Default nesting limit for container elements.
pub const DEFAULT_MAX_DEPTH: u32 = 64;

/// Parser configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Maximum nesting depth of container elements before parsing fails.
    pub max_depth: u32,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParseConfig {
    /// Set the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Chapter extraction over one in-memory buffer.
///
/// Implementations borrow a buffer that starts at file offset 0. The buffer
/// may be cut short anywhere after the container header; parsers go as far as
/// the data allows.
pub trait ChapterParser {
    /// Short name of the container format.
    fn format_name(&self) -> &str;

    /// Validate the container, find its chapter data and decode it.
    ///
    /// Returns `Ok(None)` when the file simply has no usable chapters.
    fn parse_chapters(&mut self) -> Result<Option<ChapterInfo>>;

    /// Diagnostics recorded so far, available after success or failure.
    fn quirks(&self) -> &Quirks;
}
