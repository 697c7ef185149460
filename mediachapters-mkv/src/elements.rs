//! Matroska element IDs used for chapter discovery.
//!
//! IDs are written with their VINT marker bits, as they appear in the file.

// =============================================================================
// EBML Header Elements
// =============================================================================

/// EBML Header element.
pub const EBML: u32 = 0x1A45DFA3;
/// EBML Version.
pub const EBML_VERSION: u32 = 0x4286;
/// EBML Read Version.
pub const EBML_READ_VERSION: u32 = 0x42F7;
/// EBML Max ID Length.
pub const EBML_MAX_ID_LENGTH: u32 = 0x42F2;
/// EBML Max Size Length.
pub const EBML_MAX_SIZE_LENGTH: u32 = 0x42F3;
/// EBML Doc Type.
pub const DOC_TYPE: u32 = 0x4282;
/// EBML Doc Type Version.
pub const DOC_TYPE_VERSION: u32 = 0x4287;
/// EBML Doc Type Read Version.
pub const DOC_TYPE_READ_VERSION: u32 = 0x4285;
/// EBML Doc Type Extension.
pub const DOC_TYPE_EXTENSION: u32 = 0x4281;

// =============================================================================
// Segment Elements
// =============================================================================

/// Segment (the root container for all Matroska data).
pub const SEGMENT: u32 = 0x18538067;

/// SeekHead (index of top-level elements).
pub const SEEK_HEAD: u32 = 0x114D9B74;
/// Seek entry.
pub const SEEK: u32 = 0x4DBB;
/// Seek ID.
pub const SEEK_ID: u32 = 0x53AB;
/// Seek Position.
pub const SEEK_POSITION: u32 = 0x53AC;

/// Segment Info.
pub const INFO: u32 = 0x1549A966;
/// Timestamp Scale (nanoseconds per tick, default 1000000 = 1ms).
pub const TIMESTAMP_SCALE: u32 = 0x2AD7B1;
/// Duration (in ticks).
pub const DURATION: u32 = 0x4489;

/// Tracks.
pub const TRACKS: u32 = 0x1654AE6B;
/// Cluster.
pub const CLUSTER: u32 = 0x1F43B675;
/// Cues.
pub const CUES: u32 = 0x1C53BB6B;
/// Attachments.
pub const ATTACHMENTS: u32 = 0x1941A469;
/// Tags.
pub const TAGS: u32 = 0x1254C367;

// =============================================================================
// Chapters
// =============================================================================

/// Chapters.
pub const CHAPTERS: u32 = 0x1043A770;
/// Edition Entry.
pub const EDITION_ENTRY: u32 = 0x45B9;
/// Edition UID.
pub const EDITION_UID: u32 = 0x45BC;
/// Edition Flag Hidden.
pub const EDITION_FLAG_HIDDEN: u32 = 0x45BD;
/// Edition Flag Default.
pub const EDITION_FLAG_DEFAULT: u32 = 0x45DB;
/// Edition Flag Ordered.
pub const EDITION_FLAG_ORDERED: u32 = 0x45DD;
/// Edition Display.
pub const EDITION_DISPLAY: u32 = 0x4520;
/// Edition String.
pub const EDITION_STRING: u32 = 0x4521;
/// Edition Language (IETF).
pub const EDITION_LANGUAGE_IETF: u32 = 0x45E4;

/// Chapter Atom.
pub const CHAPTER_ATOM: u32 = 0xB6;
/// Chapter UID.
pub const CHAPTER_UID: u32 = 0x73C4;
/// Chapter String UID.
pub const CHAPTER_STRING_UID: u32 = 0x5654;
/// Chapter Time Start (nanoseconds).
pub const CHAPTER_TIME_START: u32 = 0x91;
/// Chapter Time End (nanoseconds).
pub const CHAPTER_TIME_END: u32 = 0x92;
/// Chapter Flag Hidden.
pub const CHAPTER_FLAG_HIDDEN: u32 = 0x98;
/// Chapter Flag Enabled.
pub const CHAPTER_FLAG_ENABLED: u32 = 0x4598;
/// Chapter Skip Type.
pub const CHAPTER_SKIP_TYPE: u32 = 0x4588;
/// Chapter Physical Equivalent.
pub const CHAPTER_PHYSICAL_EQUIV: u32 = 0x63C3;
/// Chapter Track.
pub const CHAPTER_TRACK: u32 = 0x8F;
/// Chapter Process.
pub const CHAPTER_PROCESS: u32 = 0x6944;

/// Chapter Display.
pub const CHAPTER_DISPLAY: u32 = 0x80;
/// Chapter String.
pub const CHAP_STRING: u32 = 0x85;
/// Chapter Language.
pub const CHAP_LANGUAGE: u32 = 0x437C;
/// Chapter Language (BCP 47).
pub const CHAP_LANGUAGE_BCP47: u32 = 0x437D;
/// Chapter Country.
pub const CHAP_COUNTRY: u32 = 0x437E;

/// Readable name of a top-level element referenced by a SeekHead entry.
///
/// Unrecognized IDs are rendered as `unk-<hex>`.
pub fn seek_target_name(id: u64) -> String {
    let name = match u32::try_from(id) {
        Ok(TAGS) => "TAG",
        Ok(INFO) => "INFO",
        Ok(CUES) => "CUES",
        Ok(TRACKS) => "TRACKS",
        Ok(CLUSTER) => "CLUSTER",
        Ok(CHAPTERS) => "CHAPTERS",
        Ok(ATTACHMENTS) => "ATTACHMENTS",
        _ => return format!("unk-{id:x}"),
    };
    name.to_string()
}
