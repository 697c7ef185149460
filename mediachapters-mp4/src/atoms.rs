//! Payload parsers for the boxes chapter extraction reads.

use crate::boxes::{BoxHeader, Boxes};
use crate::error::{Mp4Error, Result};
use mediachapters_core::ByteCursor;
use tracing::warn;

/// Brand a file must list when the caller asks for brand verification.
pub const DEFAULT_REQUIRED_BRAND: &str = "iso2";

/// Nero chapter timestamps are in units of 100 ns.
pub const CHPL_TICKS_PER_SECOND: u64 = 10_000_000;

/// File type box (ftyp).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtypAtom {
    /// Major brand.
    pub major_brand: [u8; 4],
    /// Minor version.
    pub minor_version: u32,
    /// Compatible brands.
    pub compatible_brands: Vec<[u8; 4]>,
}

impl FtypAtom {
    /// Parse an ftyp box. Brands are read up to the end of the available data.
    pub fn parse(data: &[u8], header: &BoxHeader) -> Result<Self> {
        let mut cursor = header.cursor(data)?;
        let major_brand = cursor.read_fourcc()?;
        let minor_version = cursor.read_u32()?;

        let mut compatible_brands = Vec::new();
        while cursor.remaining() >= 4 {
            compatible_brands.push(cursor.read_fourcc()?);
        }

        Ok(Self {
            major_brand,
            minor_version,
            compatible_brands,
        })
    }

    /// Read the ftyp box that must open the buffer.
    pub fn read(data: &[u8]) -> Result<Self> {
        let header = match Boxes::new(data, 0, data.len()).next() {
            Some(header) => header?,
            None => return Err(Mp4Error::NotFtyp(String::new())),
        };
        if !header.is(b"ftyp") {
            return Err(Mp4Error::NotFtyp(header.name_str()));
        }
        Self::parse(data, &header)
    }

    /// Check if a brand is among the compatible brands.
    pub fn has_brand(&self, brand: &str) -> bool {
        self.compatible_brands.iter().any(|b| b == brand.as_bytes())
    }

    /// Major brand as text.
    pub fn major_brand_str(&self) -> String {
        String::from_utf8_lossy(&self.major_brand).into_owned()
    }

    /// Compatible brands as text.
    pub fn brand_names(&self) -> Vec<String> {
        self.compatible_brands
            .iter()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .collect()
    }
}

/// Read the leading ftyp box and require `brand` among its compatible brands.
pub fn verify_filetype(data: &[u8], brand: &str) -> Result<FtypAtom> {
    let ftyp = FtypAtom::read(data)?;
    if !ftyp.has_brand(brand) {
        return Err(Mp4Error::MissingBrand(brand.to_string()));
    }
    Ok(ftyp)
}

/// Movie header box (mvhd).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MvhdAtom {
    /// Version.
    pub version: u8,
    /// Timescale (units per second).
    pub timescale: u32,
    /// Duration in timescale units.
    pub duration: u64,
    /// Preferred playback rate.
    pub rate: f64,
}

impl MvhdAtom {
    /// Parse an mvhd box. Versions 0 and 1 are supported.
    pub fn parse(data: &[u8], header: &BoxHeader) -> Result<Self> {
        let full = header.full(data)?;
        let mut cursor = full.cursor(data)?;

        let (timescale, duration) = match full.version {
            0 => {
                cursor.skip(8)?;
                (cursor.read_u32()?, u64::from(cursor.read_u32()?))
            }
            1 => {
                cursor.skip(16)?;
                (cursor.read_u32()?, cursor.read_u64()?)
            }
            version => {
                return Err(Mp4Error::UnsupportedVersion {
                    name: "mvhd",
                    version,
                })
            }
        };
        let rate = cursor.read_fixed32()?;

        Ok(Self {
            version: full.version,
            timescale,
            duration,
            rate,
        })
    }

    /// Duration in seconds.
    pub fn duration_seconds(&self) -> Result<f64> {
        if self.timescale == 0 {
            return Err(Mp4Error::ZeroTimescale("mvhd"));
        }
        Ok(self.duration as f64 / f64::from(self.timescale))
    }
}

/// Media header box (mdhd).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MdhdAtom {
    /// Version.
    pub version: u8,
    /// Timescale of the track's media.
    pub timescale: u32,
    /// Duration in timescale units.
    pub duration: u64,
}

impl MdhdAtom {
    /// Parse an mdhd box.
    pub fn parse(data: &[u8], header: &BoxHeader) -> Result<Self> {
        let full = header.full(data)?;
        let mut cursor = full.cursor(data)?;

        let (timescale, duration) = match full.version {
            0 => {
                cursor.skip(8)?;
                (cursor.read_u32()?, u64::from(cursor.read_u32()?))
            }
            1 => {
                cursor.skip(16)?;
                (cursor.read_u32()?, cursor.read_u64()?)
            }
            version => {
                return Err(Mp4Error::UnsupportedVersion {
                    name: "mdhd",
                    version,
                })
            }
        };

        Ok(Self {
            version: full.version,
            timescale,
            duration,
        })
    }
}

/// Handler reference box (hdlr).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HdlrAtom {
    /// Handler type.
    pub handler_type: [u8; 4],
}

impl HdlrAtom {
    /// Parse an hdlr box.
    pub fn parse(data: &[u8], header: &BoxHeader) -> Result<Self> {
        let mut cursor = header.cursor(data)?;
        let version = cursor.read_u8()?;
        if version != 0 {
            return Err(Mp4Error::UnsupportedVersion {
                name: "hdlr",
                version,
            });
        }
        // flags, pre_defined
        cursor.skip(7)?;
        let handler_type = cursor.read_fourcc()?;

        Ok(Self { handler_type })
    }

    /// Check if this is a text handler, as used by chapter tracks.
    pub fn is_text(&self) -> bool {
        &self.handler_type == b"text"
    }
}

/// One entry of a Nero chapter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChplEntry {
    /// Start time in 100 ns units.
    pub timestamp: u64,
    /// Chapter title.
    pub title: String,
}

impl ChplEntry {
    /// Start time in seconds, truncated to whole milliseconds.
    pub fn seconds(&self) -> f64 {
        (self.timestamp / (CHPL_TICKS_PER_SECOND / 1000)) as f64 / 1000.0
    }
}

/// Nero chapter list box (chpl), found under `moov/udta`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChplAtom {
    /// Version.
    pub version: u8,
    /// Chapters in file order.
    pub entries: Vec<ChplEntry>,
}

impl ChplAtom {
    /// Parse a chpl box.
    pub fn parse(data: &[u8], header: &BoxHeader) -> Result<Self> {
        let full = header.full(data)?;
        let mut cursor = full.cursor(data)?;

        if full.version == 0 {
            warn!("chpl version 0, timescale is probably wrong");
        } else {
            // reserved
            cursor.skip(4)?;
        }

        let count = cursor.read_u8()?;
        let mut entries = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let timestamp = cursor.read_u64()?;
            let title = cursor.read_str_u8()?;
            entries.push(ChplEntry { timestamp, title });
        }

        Ok(Self {
            version: full.version,
            entries,
        })
    }
}

/// Sample size box (stsz).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleSizes {
    /// Size shared by every sample, or 0 when sizes are listed.
    pub default_size: u32,
    /// Declared sample count.
    pub sample_count: u32,
    /// Per-sample sizes when `default_size` is 0.
    pub sizes: Vec<u32>,
}

impl SampleSizes {
    /// Size of sample `index`, if known.
    pub fn size_of(&self, index: usize) -> Option<u32> {
        if self.default_size != 0 {
            Some(self.default_size)
        } else {
            self.sizes.get(index).copied()
        }
    }
}

/// The four sample tables of a chapter track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleTables {
    /// Time to sample: (sample_count, sample_delta).
    pub stts: Vec<(u32, u32)>,
    /// Sample to chunk: (first_chunk, samples_per_chunk, description_index).
    pub stsc: Vec<(u32, u32, u32)>,
    /// Sample sizes.
    pub stsz: SampleSizes,
    /// Chunk offsets.
    pub stco: Vec<u32>,
}

impl SampleTables {
    /// Parse the tables from their box headers.
    pub fn parse(
        data: &[u8],
        stts: &BoxHeader,
        stsc: &BoxHeader,
        stsz: &BoxHeader,
        stco: &BoxHeader,
    ) -> Result<Self> {
        Ok(Self {
            stts: Self::parse_stts(data, stts)?,
            stsc: Self::parse_stsc(data, stsc)?,
            stsz: Self::parse_stsz(data, stsz)?,
            stco: Self::parse_stco(data, stco)?,
        })
    }

    /// Parse a time-to-sample box.
    pub fn parse_stts(data: &[u8], header: &BoxHeader) -> Result<Vec<(u32, u32)>> {
        let mut cursor = header.full(data)?.cursor(data)?;
        let count = cursor.read_u32()?;
        let mut entries = Vec::with_capacity(capacity(&cursor, count, 8));
        for _ in 0..count {
            entries.push((cursor.read_u32()?, cursor.read_u32()?));
        }
        Ok(entries)
    }

    /// Parse a sample-to-chunk box.
    pub fn parse_stsc(data: &[u8], header: &BoxHeader) -> Result<Vec<(u32, u32, u32)>> {
        let mut cursor = header.full(data)?.cursor(data)?;
        let count = cursor.read_u32()?;
        let mut entries = Vec::with_capacity(capacity(&cursor, count, 12));
        for _ in 0..count {
            entries.push((cursor.read_u32()?, cursor.read_u32()?, cursor.read_u32()?));
        }
        Ok(entries)
    }

    /// Parse a sample size box.
    pub fn parse_stsz(data: &[u8], header: &BoxHeader) -> Result<SampleSizes> {
        let mut cursor = header.full(data)?.cursor(data)?;
        let default_size = cursor.read_u32()?;
        let sample_count = cursor.read_u32()?;

        let mut sizes = Vec::new();
        if default_size == 0 {
            sizes.reserve(capacity(&cursor, sample_count, 4));
            for _ in 0..sample_count {
                sizes.push(cursor.read_u32()?);
            }
        }

        Ok(SampleSizes {
            default_size,
            sample_count,
            sizes,
        })
    }

    /// Parse a chunk offset box.
    pub fn parse_stco(data: &[u8], header: &BoxHeader) -> Result<Vec<u32>> {
        let mut cursor = header.full(data)?.cursor(data)?;
        let count = cursor.read_u32()?;
        let mut offsets = Vec::with_capacity(capacity(&cursor, count, 4));
        for _ in 0..count {
            offsets.push(cursor.read_u32()?);
        }
        Ok(offsets)
    }
}

// Entry counts come from the file; never reserve more than the data can hold.
fn capacity(cursor: &ByteCursor<'_>, count: u32, entry_size: usize) -> usize {
    (count as usize).min(cursor.remaining() / entry_size)
}
