//! Matroska/WebM chapter extraction.
//!
//! The layout is fixed: EBML magic, EBML header, then the Segment, whose
//! SeekHead, Info and Chapters children are decoded through the schemas
//! below. Everything else in the Segment is skipped.

use crate::ebml::{read_element_id, MAX_ID_LENGTH};
use crate::elements::*;
use crate::error::{MkvError, Result};
use crate::schema::{Cardinality, Decode, EbmlDecoder, Field, Record, Schema};
use mediachapters_core::chapter::UNKNOWN_LANGUAGE;
use mediachapters_core::{
    ByteCursor, Chapter, ChapterInfo, ChapterParser, ParseConfig, Quirks, Title,
};
use tracing::debug;

const NANOSECONDS: f64 = 1_000_000_000.0;

/// Default TimestampScale: one tick per millisecond.
pub const DEFAULT_TIMESTAMP_SCALE: u64 = 1_000_000;

use Cardinality::{Multiple, Optional, OptionalMultiple, Required};

// =============================================================================
// Schemas
// =============================================================================

pub static EBML_HEADER_SCHEMA: Schema = Schema {
    name: "EBML",
    fields: &[
        Field::new(EBML_VERSION, "version", Decode::Uint { default: 1 }, Required),
        Field::new(EBML_READ_VERSION, "readVersion", Decode::Uint { default: 1 }, Required),
        Field::new(EBML_MAX_ID_LENGTH, "maxIdLength", Decode::Uint { default: 4 }, Required),
        Field::new(EBML_MAX_SIZE_LENGTH, "maxSizeLength", Decode::Uint { default: 8 }, Required),
        Field::new(DOC_TYPE, "docType", Decode::String, Required),
        Field::new(DOC_TYPE_VERSION, "docTypeVersion", Decode::Uint { default: 1 }, Required),
        Field::new(DOC_TYPE_READ_VERSION, "docTypeReadVersion", Decode::Uint { default: 1 }, Optional),
        Field::new(DOC_TYPE_EXTENSION, "docTypeExtensions", Decode::Ignore, OptionalMultiple),
    ],
    allow_unknown: true,
};

pub static SEEK_SCHEMA: Schema = Schema {
    name: "Seek",
    fields: &[
        Field::new(SEEK_ID, "id", Decode::UINT, Required),
        Field::new(SEEK_POSITION, "pos", Decode::UINT, Required),
    ],
    allow_unknown: true,
};

pub static SEEK_HEAD_SCHEMA: Schema = Schema {
    name: "SeekHead",
    fields: &[Field::new(SEEK, "seeks", Decode::Master(&SEEK_SCHEMA), Multiple)],
    allow_unknown: true,
};

pub static INFO_SCHEMA: Schema = Schema {
    name: "Info",
    fields: &[
        Field::new(DURATION, "duration", Decode::FLOAT, Required),
        Field::new(
            TIMESTAMP_SCALE,
            "timestampScale",
            Decode::Uint {
                default: DEFAULT_TIMESTAMP_SCALE,
            },
            Optional,
        ),
    ],
    allow_unknown: true,
};

pub static CHAPTER_DISPLAY_SCHEMA: Schema = Schema {
    name: "ChapterDisplay",
    fields: &[
        Field::new(CHAP_STRING, "string", Decode::String, Required),
        Field::new(CHAP_LANGUAGE, "languages", Decode::String, OptionalMultiple),
        Field::new(CHAP_LANGUAGE_BCP47, "languagesBcp47", Decode::String, OptionalMultiple),
        Field::new(CHAP_COUNTRY, "countries", Decode::String, OptionalMultiple),
    ],
    allow_unknown: true,
};

pub static CHAPTER_ATOM_SCHEMA: Schema = Schema {
    name: "ChapterAtom",
    fields: &[
        Field::new(CHAPTER_UID, "uid", Decode::UINT, Optional),
        Field::new(CHAPTER_STRING_UID, "stringUid", Decode::String, Optional),
        Field::new(CHAPTER_TIME_START, "start", Decode::UINT, Optional),
        Field::new(CHAPTER_TIME_END, "end", Decode::UINT, Optional),
        Field::new(CHAPTER_FLAG_HIDDEN, "hidden", Decode::BOOL, Optional),
        Field::new(CHAPTER_FLAG_ENABLED, "enabled", Decode::Bool { default: true }, Optional),
        Field::new(CHAPTER_SKIP_TYPE, "skipType", Decode::UINT, Optional),
        Field::new(CHAPTER_PHYSICAL_EQUIV, "physicalEquivalent", Decode::UINT, Optional),
        Field::new(CHAPTER_TRACK, "tracks", Decode::Ignore, OptionalMultiple),
        Field::new(CHAPTER_PROCESS, "processes", Decode::Ignore, OptionalMultiple),
        Field::new(
            CHAPTER_DISPLAY,
            "display",
            Decode::Master(&CHAPTER_DISPLAY_SCHEMA),
            OptionalMultiple,
        ),
    ],
    allow_unknown: true,
};

pub static EDITION_DISPLAY_SCHEMA: Schema = Schema {
    name: "EditionDisplay",
    fields: &[
        Field::new(EDITION_STRING, "string", Decode::String, Optional),
        Field::new(EDITION_LANGUAGE_IETF, "languages", Decode::String, OptionalMultiple),
    ],
    allow_unknown: true,
};

pub static EDITION_SCHEMA: Schema = Schema {
    name: "EditionEntry",
    fields: &[
        Field::new(EDITION_UID, "uid", Decode::UINT, Optional),
        Field::new(EDITION_FLAG_HIDDEN, "hidden", Decode::BOOL, Optional),
        Field::new(EDITION_FLAG_DEFAULT, "default", Decode::BOOL, Optional),
        Field::new(EDITION_FLAG_ORDERED, "ordered", Decode::BOOL, Optional),
        Field::new(
            EDITION_DISPLAY,
            "display",
            Decode::Master(&EDITION_DISPLAY_SCHEMA),
            OptionalMultiple,
        ),
        Field::new(
            CHAPTER_ATOM,
            "chapters",
            Decode::Master(&CHAPTER_ATOM_SCHEMA),
            OptionalMultiple,
        ),
    ],
    allow_unknown: true,
};

pub static CHAPTERS_SCHEMA: Schema = Schema {
    name: "Chapters",
    fields: &[Field::new(EDITION_ENTRY, "editions", Decode::Master(&EDITION_SCHEMA), Multiple)],
    allow_unknown: true,
};

pub static SEGMENT_SCHEMA: Schema = Schema {
    name: "Segment",
    fields: &[
        Field::new(SEEK_HEAD, "seekheads", Decode::Master(&SEEK_HEAD_SCHEMA), OptionalMultiple),
        Field::new(CHAPTERS, "chapters", Decode::Master(&CHAPTERS_SCHEMA), Optional),
        Field::new(INFO, "info", Decode::Master(&INFO_SCHEMA), Required),
    ],
    allow_unknown: true,
};

// =============================================================================
// Header
// =============================================================================

/// EBML document header information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EbmlHeader {
    /// EBML version.
    pub version: u64,
    /// EBML read version.
    pub read_version: u64,
    /// Maximum ID length.
    pub max_id_length: u64,
    /// Maximum size length.
    pub max_size_length: u64,
    /// Document type ("matroska" or "webm").
    pub doc_type: String,
    /// Document type version.
    pub doc_type_version: u64,
    /// Document type read version, if present.
    pub doc_type_read_version: Option<u64>,
}

impl EbmlHeader {
    fn from_record(record: &Record) -> Self {
        Self {
            version: record.uint("version").unwrap_or(1),
            read_version: record.uint("readVersion").unwrap_or(1),
            max_id_length: record.uint("maxIdLength").unwrap_or(4),
            max_size_length: record.uint("maxSizeLength").unwrap_or(8),
            doc_type: record.string("docType").unwrap_or_default().to_string(),
            doc_type_version: record.uint("docTypeVersion").unwrap_or(1),
            doc_type_read_version: record.uint("docTypeReadVersion"),
        }
    }

    /// Check if this is a WebM file.
    pub fn is_webm(&self) -> bool {
        self.doc_type == "webm"
    }

    /// Check if this is a Matroska file.
    pub fn is_matroska(&self) -> bool {
        self.doc_type == "matroska"
    }
}

/// Convert a Segment tick count to seconds.
pub fn timestamp_to_seconds(ticks: f64, timestamp_scale: u64) -> f64 {
    ticks * timestamp_scale as f64 / NANOSECONDS
}

// =============================================================================
// Parser
// =============================================================================

/// Chapter extraction over a Matroska/WebM buffer.
#[derive(Debug)]
pub struct MatroskaParser<'a> {
    data: &'a [u8],
    decoder: EbmlDecoder,
    quirks: Quirks,
}

impl<'a> MatroskaParser<'a> {
    /// Create a parser with the default configuration.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_config(data, ParseConfig::default())
    }

    /// Create a parser with a custom configuration.
    pub fn with_config(data: &'a [u8], config: ParseConfig) -> Self {
        Self {
            data,
            decoder: EbmlDecoder::new(config),
            quirks: Quirks::new(),
        }
    }

    /// Diagnostics recorded so far.
    pub fn quirks(&self) -> &Quirks {
        &self.quirks
    }

    /// Read the magic number and EBML header, recording them as quirks.
    pub fn read_header(&mut self, cursor: &mut ByteCursor<'_>) -> Result<EbmlHeader> {
        let magic = cursor.read_u32()?;
        if magic != EBML {
            return Err(MkvError::NotEbml { magic });
        }

        let record = self.decoder.decode_master(cursor, &EBML_HEADER_SCHEMA)?;
        let header = EbmlHeader::from_record(&record);

        self.quirks.add(format!(
            "ebml:v{},read=v{}",
            header.version, header.read_version
        ));
        self.quirks.add(format!(
            "{}:v{},read=v{}",
            header.doc_type,
            header.doc_type_version,
            header
                .doc_type_read_version
                .map_or_else(|| "?".to_string(), |v| v.to_string())
        ));
        self.quirks.add(format!(
            "maxLengths:id={},size={}",
            header.max_id_length, header.max_size_length
        ));

        if !header.is_matroska() && !header.is_webm() {
            return Err(MkvError::UnsupportedDocType(header.doc_type));
        }
        if header.max_id_length != MAX_ID_LENGTH as u64 {
            return Err(MkvError::UnsupportedIdLength(header.max_id_length));
        }

        Ok(header)
    }

    /// Decode the file and return the chapters of its selected edition.
    pub fn parse(&mut self) -> Result<Option<ChapterInfo>> {
        let mut cursor = ByteCursor::new(self.data);
        self.read_header(&mut cursor)?;

        let id = read_element_id(&mut cursor)?;
        if id != SEGMENT {
            return Err(MkvError::NotASegment { id });
        }

        let segment = self.decoder.decode_master(&mut cursor, &SEGMENT_SCHEMA)?;

        for seek in segment
            .records("seekheads")
            .flat_map(|head| head.records("seeks"))
        {
            self.quirks.add(format!(
                "seekhead:{}@{}",
                seek_target_name(seek.uint("id").unwrap_or_default()),
                seek.uint("pos").unwrap_or_default()
            ));
        }

        let (duration, timestamp_scale) = match segment.record("info") {
            Some(info) => (
                info.float("duration").unwrap_or_default(),
                info.uint("timestampScale").unwrap_or(DEFAULT_TIMESTAMP_SCALE),
            ),
            None => (0.0, DEFAULT_TIMESTAMP_SCALE),
        };
        self.quirks.add(format!("timestampScale:{timestamp_scale}"));
        let duration = timestamp_to_seconds(duration, timestamp_scale);

        let Some(chapters) = segment.record("chapters") else {
            return Ok(None);
        };

        let editions: Vec<&Record> = chapters.records("editions").collect();
        self.quirks.add(format!("nEditions:{}", editions.len()));

        let Some(edition) = select_edition(&editions) else {
            debug!("Every edition is hidden");
            return Ok(None);
        };

        let chapters: Vec<Chapter> = edition.records("chapters").map(convert_chapter).collect();
        debug!(
            chapters = chapters.len(),
            duration, "Decoded Matroska chapters"
        );

        Ok(Some(ChapterInfo::new(chapters, duration)))
    }
}

impl ChapterParser for MatroskaParser<'_> {
    fn format_name(&self) -> &str {
        "matroska"
    }

    fn parse_chapters(&mut self) -> mediachapters_core::Result<Option<ChapterInfo>> {
        self.parse().map_err(Into::into)
    }

    fn quirks(&self) -> &Quirks {
        &self.quirks
    }
}

/// Drop hidden editions, then prefer the default one, else the first.
fn select_edition<'r>(editions: &[&'r Record]) -> Option<&'r Record> {
    let visible: Vec<&Record> = editions
        .iter()
        .copied()
        .filter(|e| !e.boolean("hidden").unwrap_or(false))
        .collect();

    visible
        .iter()
        .copied()
        .find(|e| e.boolean("default").unwrap_or(false))
        .or_else(|| visible.first().copied())
}

fn convert_chapter(atom: &Record) -> Chapter {
    let start = atom.uint("start").unwrap_or(0) as f64 / NANOSECONDS;
    let end = atom.uint("end").map(|end| end as f64 / NANOSECONDS);

    let titles = atom.records("display").flat_map(display_titles).collect();

    Chapter { start, end, titles }
}

/// One title per language tag, or one untagged title.
fn display_titles(display: &Record) -> Vec<Title> {
    let text = display.string("string").unwrap_or_default();

    let mut languages: Vec<&str> = display.strings("languages").collect();
    if languages.is_empty() {
        languages = display.strings("languagesBcp47").collect();
    }
    if languages.is_empty() {
        languages.push(UNKNOWN_LANGUAGE);
    }

    languages
        .into_iter()
        .map(|lang| Title::new(lang, text))
        .collect()
}
