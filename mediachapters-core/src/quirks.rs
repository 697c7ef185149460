//! Non-fatal diagnostics gathered while parsing.

use indexmap::IndexSet;
use std::fmt;

/// An insertion-ordered, de-duplicated set of short diagnostic strings.
///
/// Quirks never influence control flow. They describe what the parser saw
/// (versions, truncation, unusual flags) so a failed or surprising result can
/// be explained to whoever requested it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Quirks {
    entries: IndexSet<String>,
}

impl Quirks {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a quirk. Returns `false` if it was already present.
    pub fn add(&mut self, quirk: impl Into<String>) -> bool {
        self.entries.insert(quirk.into())
    }

    /// Check whether a quirk has been recorded.
    pub fn contains(&self, quirk: &str) -> bool {
        self.entries.contains(quirk)
    }

    /// Number of distinct quirks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Copy out as a vector, in insertion order.
    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}

impl fmt::Display for Quirks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, quirk) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(quirk)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Quirks {
    type Item = &'a String;
    type IntoIter = indexmap::set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
