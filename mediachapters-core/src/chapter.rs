//! Container-independent chapter model.

use serde::Serialize;
use std::fmt;

/// Language used for titles that carry no language tag.
pub const UNKNOWN_LANGUAGE: &str = "unk";

/// Title used when a chapter has none.
pub const FALLBACK_TITLE: &str = "Chapter";

/// A localized chapter title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Title {
    /// Language code, `"unk"` when the container gave none.
    pub lang: String,
    /// The title text.
    pub text: String,
}

impl Title {
    /// Create a title in the given language.
    pub fn new(lang: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            text: text.into(),
        }
    }

    /// Create a title without a language tag.
    pub fn untagged(text: impl Into<String>) -> Self {
        Self::new(UNKNOWN_LANGUAGE, text)
    }
}

/// A single chapter marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chapter {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds, if the container stores one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
    /// Titles, possibly in several languages.
    pub titles: Vec<Title>,
}

impl Chapter {
    /// Create a chapter starting at `start` seconds.
    pub fn new(start: f64, titles: Vec<Title>) -> Self {
        Self {
            start,
            end: None,
            titles,
        }
    }

    /// Set the end time.
    pub fn with_end(mut self, end: f64) -> Self {
        self.end = Some(end);
        self
    }

    /// Title in `lang`, else the first title, else `"Chapter"`.
    pub fn title_in(&self, lang: &str) -> &str {
        preferred_title(&self.titles, lang)
    }
}

impl fmt::Display for Chapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            format_timestamp(self.start),
            preferred_title(&self.titles, "eng")
        )
    }
}

/// Chapters of one file together with its total duration.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ChapterInfo {
    /// Chapters in file order.
    pub chapters: Vec<Chapter>,
    /// File duration in seconds.
    pub duration: f64,
}

impl ChapterInfo {
    /// Create chapter info.
    pub fn new(chapters: Vec<Chapter>, duration: f64) -> Self {
        Self { chapters, duration }
    }

    /// Number of chapters.
    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    /// True if there are no chapters.
    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// Flatten into cues, picking each chapter's title in `lang`.
    pub fn cues(&self, lang: &str) -> Vec<ChapterCue> {
        self.chapters
            .iter()
            .map(|c| ChapterCue {
                start: c.start,
                end: c.end,
                title: c.title_in(lang).to_string(),
            })
            .collect()
    }
}

/// A chapter reduced to one title, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterCue {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
    /// Title text.
    pub title: String,
}

/// Pick the title in `lang`, falling back to the first one, then to `"Chapter"`.
pub fn preferred_title<'a>(titles: &'a [Title], lang: &str) -> &'a str {
    titles
        .iter()
        .find(|t| t.lang == lang)
        .or_else(|| titles.first())
        .map(|t| t.text.as_str())
        .unwrap_or(FALLBACK_TITLE)
}

/// Format seconds as `HH:MM:SS.mmm`.
pub fn format_timestamp(time: f64) -> String {
    let total_ms = (time.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let secs = total_ms / 1000;

    format!(
        "{:02}:{:02}:{:02}.{:03}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        ms
    )
}
