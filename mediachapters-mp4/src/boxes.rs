//! ISOBMFF box headers and box-tree traversal.
//!
//! Box sequences are walked lazily with [`Boxes`]. A sequence that runs out of
//! data simply ends and remembers where it stopped, so a caller working on a
//! partial download gets every box header that was fully present.

use crate::error::{Mp4Error, Result};
use mediachapters_core::{ByteCursor, Quirks};
use std::iter::FusedIterator;
use tracing::trace;

/// Box header size without the 64-bit size extension.
pub const BOX_HEADER_SIZE: usize = 8;

/// Box header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoxHeader {
    /// Offset of the box in the buffer.
    pub at: usize,
    /// Declared box size, header included.
    pub size: usize,
    /// Box type.
    pub name: [u8; 4],
    /// Offset of the box payload.
    pub data_offset: usize,
    /// Bytes of the box actually present in the buffer, at most `size`.
    pub size_available: usize,
}

impl BoxHeader {
    /// Parse the box header at `at`.
    ///
    /// A size of 0 extends the box to the end of the buffer. A size of 1
    /// announces a 64-bit size, which is not supported.
    pub fn parse(data: &[u8], at: usize) -> Result<Self> {
        let mut cursor = ByteCursor::at(data, at)?;
        let declared = cursor.read_u32()?;
        let name = cursor.read_fourcc()?;

        let size = match declared {
            0 => data.len() - at,
            1 => return Err(Mp4Error::LargeSize { offset: at }),
            s if (s as usize) < BOX_HEADER_SIZE => {
                return Err(Mp4Error::InvalidBoxSize {
                    offset: at,
                    size: s,
                })
            }
            s => s as usize,
        };

        Ok(Self {
            at,
            size,
            name,
            data_offset: at + BOX_HEADER_SIZE,
            size_available: size.min(data.len() - at),
        })
    }

    /// Check the box type.
    pub fn is(&self, name: &[u8; 4]) -> bool {
        &self.name == name
    }

    /// Box type as text.
    pub fn name_str(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }

    /// `name@offset`, for messages.
    pub fn label(&self) -> String {
        format!("{}@{}", self.name_str(), self.at)
    }

    /// True if the buffer ends before the box does.
    pub fn is_truncated(&self) -> bool {
        self.size_available < self.size
    }

    /// Offset just past the available part of the box.
    pub fn available_end(&self) -> usize {
        self.at + self.size_available
    }

    /// A cursor over the available part of the box, at its payload.
    pub fn cursor<'a>(&self, data: &'a [u8]) -> Result<ByteCursor<'a>> {
        let end = self.available_end().min(data.len());
        Ok(ByteCursor::at(&data[..end], self.data_offset)?)
    }

    /// Read the version and flags that follow the header of a full box.
    pub fn full(&self, data: &[u8]) -> Result<FullBoxHeader> {
        let mut cursor = self.cursor(data)?;
        let word = cursor.read_u32()?;

        Ok(FullBoxHeader {
            header: BoxHeader {
                data_offset: self.data_offset + 4,
                ..*self
            },
            version: (word >> 24) as u8,
            flags: word & 0x00FF_FFFF,
        })
    }
}

/// Full box header: a box header followed by a version and 24 bits of flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullBoxHeader {
    /// The box header, with `data_offset` past the version and flags.
    pub header: BoxHeader,
    /// Box version.
    pub version: u8,
    /// Box flags.
    pub flags: u32,
}

impl FullBoxHeader {
    /// Parse the full box header at `at`.
    pub fn parse(data: &[u8], at: usize) -> Result<Self> {
        BoxHeader::parse(data, at)?.full(data)
    }

    /// A cursor over the available part of the box, at its payload.
    pub fn cursor<'a>(&self, data: &'a [u8]) -> Result<ByteCursor<'a>> {
        self.header.cursor(data)
    }
}

/// Lazy sequence of sibling boxes between two offsets.
///
/// Structural errors are yielded once and end the sequence. Running out of
/// data ends it silently; [`stopped_at`](Self::stopped_at) reports where.
#[derive(Debug, Clone)]
pub struct Boxes<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
    done: bool,
    stopped_at: Option<usize>,
    uuid_seen: bool,
}

impl<'a> Boxes<'a> {
    /// Walk the boxes in `start..end`.
    pub fn new(data: &'a [u8], start: usize, end: usize) -> Self {
        Self {
            data,
            pos: start,
            end,
            done: false,
            stopped_at: None,
            uuid_seen: false,
        }
    }

    /// Offset of the header that could not be read, if the walk ran out of data.
    pub fn stopped_at(&self) -> Option<usize> {
        self.stopped_at
    }

    /// True once a `uuid` box has been yielded.
    pub fn uuid_seen(&self) -> bool {
        self.uuid_seen
    }
}

impl Iterator for Boxes<'_> {
    type Item = Result<BoxHeader>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.end {
            return None;
        }

        match BoxHeader::parse(self.data, self.pos) {
            Ok(header) => {
                if header.is(b"uuid") {
                    trace!(at = header.at, "UUID box found");
                    self.uuid_seen = true;
                }
                self.pos = header.at.saturating_add(header.size);
                Some(Ok(header))
            }
            Err(e) if e.is_bounds() => {
                trace!(at = self.pos, error = %e, "Box walk stopped");
                self.done = true;
                self.stopped_at = Some(self.pos);
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for Boxes<'_> {}

/// Box traversal over one buffer, collecting walk diagnostics as quirks.
#[derive(Debug)]
pub struct BoxTree<'a> {
    data: &'a [u8],
    quirks: Quirks,
}

impl<'a> BoxTree<'a> {
    /// Create a tree over a buffer that starts at file offset 0.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            quirks: Quirks::new(),
        }
    }

    /// The underlying buffer.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Diagnostics recorded so far.
    pub fn quirks(&self) -> &Quirks {
        &self.quirks
    }

    /// Record a diagnostic.
    pub fn add_quirk(&mut self, quirk: impl Into<String>) {
        self.quirks.add(quirk);
    }

    /// Boxes between two offsets.
    pub fn boxes(&self, start: usize, end: usize) -> Boxes<'a> {
        Boxes::new(self.data, start, end)
    }

    /// Top-level boxes of the buffer.
    pub fn top_level(&self) -> Boxes<'a> {
        self.boxes(0, self.data.len())
    }

    /// Children of `parent`, limited to the bytes that are present.
    pub fn boxes_in(&self, parent: &BoxHeader) -> Boxes<'a> {
        self.boxes(parent.data_offset, parent.available_end())
    }

    /// Record what a finished walk over `scope` observed.
    pub fn finish(&mut self, boxes: &Boxes<'_>, scope: &str) {
        if boxes.uuid_seen() {
            self.quirks.add("uuid");
        }
        if let Some(at) = boxes.stopped_at() {
            self.quirks.add(format!("truncated:{scope}@{at}"));
        }
    }

    /// Every child of `parent`.
    pub fn children(&mut self, parent: &BoxHeader) -> Result<Vec<BoxHeader>> {
        let mut boxes = self.boxes_in(parent);
        let children = boxes.by_ref().collect::<Result<Vec<_>>>()?;
        self.finish(&boxes, &parent.name_str());
        Ok(children)
    }

    /// The first child of `parent` named `name`.
    pub fn find_in(&mut self, parent: &BoxHeader, name: &[u8; 4]) -> Result<Option<BoxHeader>> {
        let mut boxes = self.boxes_in(parent);
        let mut found = None;
        for header in boxes.by_ref() {
            let header = header?;
            if header.is(name) {
                found = Some(header);
                break;
            }
        }
        self.finish(&boxes, &parent.name_str());
        Ok(found)
    }

    /// Exactly one child of `parent` for each of `names`, in the same order.
    ///
    /// Fails if any requested box appears twice or not at all.
    pub fn assert_boxes_in<const N: usize>(
        &mut self,
        parent: &BoxHeader,
        names: [&[u8; 4]; N],
    ) -> Result<[BoxHeader; N]> {
        let mut found: [Option<BoxHeader>; N] = [None; N];
        let mut boxes = self.boxes_in(parent);

        for header in boxes.by_ref() {
            let header = header?;
            let Some(i) = names.iter().position(|n| header.is(n)) else {
                continue;
            };
            if found[i].is_some() {
                return Err(Mp4Error::DuplicateBox {
                    name: header.name_str(),
                    parent: parent.label(),
                });
            }
            found[i] = Some(header);
        }
        self.finish(&boxes, &parent.name_str());

        let mut result = [BoxHeader::default(); N];
        for (i, slot) in found.iter().enumerate() {
            match slot {
                Some(header) => result[i] = *header,
                None => {
                    return Err(Mp4Error::MissingBox {
                        name: String::from_utf8_lossy(names[i]).into_owned(),
                        parent: parent.label(),
                    })
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{boxed, full_box};

    #[test]
    fn test_parse_box_header() {
        let data = boxed(b"free", &[0u8; 4]);
        let header = BoxHeader::parse(&data, 0).unwrap();
        assert_eq!(header.size, 12);
        assert_eq!(header.name_str(), "free");
        assert_eq!(header.data_offset, 8);
        assert_eq!(header.size_available, 12);
        assert!(!header.is_truncated());
    }

    #[test]
    fn test_box_size_special_values() {
        let mut data = vec![0, 0, 0, 0];
        data.extend_from_slice(b"mdat");
        data.extend_from_slice(&[1, 2, 3]);
        assert_eq!(BoxHeader::parse(&data, 0).unwrap().size, 11);

        data[3] = 1;
        assert_eq!(
            BoxHeader::parse(&data, 0).unwrap_err(),
            Mp4Error::LargeSize { offset: 0 }
        );

        data[3] = 4;
        assert!(matches!(
            BoxHeader::parse(&data, 0),
            Err(Mp4Error::InvalidBoxSize { size: 4, .. })
        ));
    }

    #[test]
    fn test_full_box_header() {
        let data = full_box(b"mvhd", 1, 0x000203, &[9, 9]);
        let full = FullBoxHeader::parse(&data, 0).unwrap();
        assert_eq!(full.version, 1);
        assert_eq!(full.flags, 0x000203);
        assert_eq!(full.header.data_offset, 12);
        assert_eq!(full.cursor(&data).unwrap().read_u16().unwrap(), 0x0909);
    }

    #[test]
    fn test_truncated_child_is_yielded_then_walk_ends() {
        let mut data = boxed(b"moov", &[boxed(b"mvhd", &[0; 8]), boxed(b"trak", &[0; 32])].concat());
        data.truncate(36);

        let tree = BoxTree::new(&data);
        let moov = tree.top_level().next().unwrap().unwrap();
        assert!(moov.is_truncated());
        assert_eq!(moov.size_available, 36);

        let children: Vec<BoxHeader> = tree.boxes_in(&moov).map(|b| b.unwrap()).collect();
        assert_eq!(children.len(), 2);
        assert!(children[1].is(b"trak"));
        assert_eq!(children[1].size, 40);
        assert_eq!(children[1].size_available, 12);
        assert!(children[1].size_available < children[1].size);
    }

    #[test]
    fn test_walk_stops_on_partial_header() {
        let mut data = [boxed(b"ftyp", &[0; 8]), boxed(b"free", &[])].concat();
        data.truncate(20);

        let mut tree = BoxTree::new(&data);
        let mut boxes = tree.top_level();
        assert!(boxes.next().unwrap().unwrap().is(b"ftyp"));
        assert!(boxes.next().is_none());
        assert_eq!(boxes.stopped_at(), Some(16));

        tree.finish(&boxes, "file");
        assert!(tree.quirks().contains("truncated:file@16"));
    }

    #[test]
    fn test_structural_error_is_yielded_once() {
        let mut data = boxed(b"free", &[]);
        data.extend_from_slice(&[0, 0, 0, 1]);
        data.extend_from_slice(b"mdat");

        let mut boxes = Boxes::new(&data, 0, data.len());
        assert!(boxes.next().unwrap().is_ok());
        assert!(matches!(boxes.next(), Some(Err(Mp4Error::LargeSize { offset: 8 }))));
        assert!(boxes.next().is_none());
    }

    #[test]
    fn test_uuid_quirk() {
        let data = boxed(b"root", &boxed(b"uuid", &[0; 16]));
        let mut tree = BoxTree::new(&data);
        let root = tree.top_level().next().unwrap().unwrap();
        assert_eq!(tree.children(&root).unwrap().len(), 1);
        assert!(tree.quirks().contains("uuid"));
    }

    #[test]
    fn test_assert_boxes_in() {
        let data = boxed(
            b"stbl",
            &[
                boxed(b"stsd", &[]),
                boxed(b"stts", &[]),
                boxed(b"stco", &[]),
            ]
            .concat(),
        );
        let mut tree = BoxTree::new(&data);
        let stbl = tree.top_level().next().unwrap().unwrap();

        let [stco, stts] = tree.assert_boxes_in(&stbl, [b"stco", b"stts"]).unwrap();
        assert!(stco.is(b"stco"));
        assert!(stts.is(b"stts"));

        assert_eq!(
            tree.assert_boxes_in(&stbl, [b"stts", b"stsz"]).unwrap_err(),
            Mp4Error::MissingBox {
                name: "stsz".into(),
                parent: "stbl@0".into()
            }
        );
    }

    #[test]
    fn test_assert_boxes_in_duplicate() {
        let data = boxed(b"minf", &[boxed(b"stbl", &[]), boxed(b"stbl", &[])].concat());
        let mut tree = BoxTree::new(&data);
        let minf = tree.top_level().next().unwrap().unwrap();
        assert!(matches!(
            tree.assert_boxes_in(&minf, [b"stbl"]),
            Err(Mp4Error::DuplicateBox { .. })
        ));
    }
}
