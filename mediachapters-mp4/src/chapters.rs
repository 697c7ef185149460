//! Chapter extraction from ISOBMFF buffers.
//!
//! Two encodings are supported. The Nero chapter list (`moov/udta/chpl`) is
//! tried first; if it is absent or broken, the first text track whose sample
//! tables describe a single chunk of title strings is used instead.

use crate::atoms::{verify_filetype, ChplAtom, FtypAtom, HdlrAtom, MdhdAtom, MvhdAtom, SampleTables};
use crate::boxes::{BoxHeader, BoxTree};
use crate::error::{Mp4Error, Result};
use mediachapters_core::{ByteCursor, Chapter, ChapterInfo, ChapterParser, Quirks, Title};
use tracing::{debug, trace};

/// Box headers of a track that passed the chapter-track checks.
#[derive(Debug, Clone, Copy)]
struct ChapterTrack {
    trak: BoxHeader,
    mdhd: Option<BoxHeader>,
    stts: BoxHeader,
    stsc: BoxHeader,
    stsz: BoxHeader,
    stco: BoxHeader,
}

/// Chapter extraction over an ISOBMFF buffer.
#[derive(Debug)]
pub struct Mp4Parser<'a> {
    tree: BoxTree<'a>,
}

impl<'a> Mp4Parser<'a> {
    /// Create a parser over a buffer that starts at file offset 0.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            tree: BoxTree::new(data),
        }
    }

    /// Diagnostics recorded so far.
    pub fn quirks(&self) -> &Quirks {
        self.tree.quirks()
    }

    /// Read the leading ftyp box and record its brands.
    pub fn read_ftyp(&mut self) -> Result<FtypAtom> {
        let ftyp = FtypAtom::read(self.tree.data())?;
        self.record_brands(&ftyp);
        Ok(ftyp)
    }

    /// Read the leading ftyp box and require `brand` among its compatible brands.
    pub fn verify_filetype(&mut self, brand: &str) -> Result<FtypAtom> {
        let ftyp = verify_filetype(self.tree.data(), brand)?;
        self.record_brands(&ftyp);
        Ok(ftyp)
    }

    fn record_brands(&mut self, ftyp: &FtypAtom) {
        self.tree.add_quirk(format!("ftyp:{}", ftyp.major_brand_str()));
        self.tree
            .add_quirk(format!("brands:{}", ftyp.brand_names().join(",")));
    }

    /// Find the movie box and return its chapters.
    pub fn parse(&mut self) -> Result<Option<ChapterInfo>> {
        let moov = self.find_moov()?;
        if moov.is_truncated() {
            self.tree.add_quirk("moov:truncated");
        }

        let mut traks = Vec::new();
        let mut mvhd = None;
        let mut udta = None;
        for child in self.tree.children(&moov)? {
            match &child.name {
                b"trak" => traks.push(child),
                b"mvhd" => mvhd = Some(child),
                b"udta" => udta = Some(child),
                _ => {}
            }
        }

        let Some(mvhd) = mvhd else {
            return Err(Mp4Error::MissingBox {
                name: "mvhd".into(),
                parent: moov.label(),
            });
        };
        let mvhd = MvhdAtom::parse(self.tree.data(), &mvhd)?;
        self.tree.add_quirk(format!("mvhd:v{}", mvhd.version));
        if mvhd.rate != 1.0 {
            self.tree.add_quirk(format!("rate:{}", mvhd.rate));
        }
        let duration = mvhd.duration_seconds()?;

        let mut legacy_error = None;
        if let Some(udta) = udta {
            self.tree.add_quirk("udta");
            match self.legacy_chapters(&udta) {
                Ok(Some(chapters)) => {
                    debug!(chapters = chapters.len(), duration, "Decoded chpl chapters");
                    return Ok(Some(ChapterInfo::new(chapters, duration)));
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(error = %e, "chpl chapters unusable, trying chapter tracks");
                    legacy_error = Some(e);
                }
            }
        }

        let mut fallback_error = None;
        for trak in &traks {
            let track = match self.chapter_track(trak) {
                Ok(track) => track,
                Err(e) => {
                    trace!(at = trak.at, error = %e, "Not a chapter track");
                    continue;
                }
            };
            self.tree.add_quirk(format!("chapter-track@{}", trak.at));

            match self.track_chapters(&track, mvhd.timescale) {
                Ok(chapters) => {
                    debug!(chapters = chapters.len(), duration, "Decoded chapter track");
                    return Ok(Some(ChapterInfo::new(chapters, duration)));
                }
                Err(e) => fallback_error = Some(e),
            }
            break;
        }

        match (legacy_error, fallback_error) {
            (Some(e), _) | (None, Some(e)) => Err(e),
            (None, None) => Ok(None),
        }
    }

    fn find_moov(&mut self) -> Result<BoxHeader> {
        let data = self.tree.data();
        let mut boxes = self.tree.top_level();
        let mut moov = None;

        for header in boxes.by_ref() {
            let header = header?;
            if header.is(b"ftyp") {
                match FtypAtom::parse(data, &header) {
                    Ok(ftyp) => self.record_brands(&ftyp),
                    Err(e) => trace!(error = %e, "Unreadable ftyp"),
                }
            } else if header.is(b"moov") {
                moov = Some(header);
                break;
            }
        }
        self.tree.finish(&boxes, "file");

        moov.ok_or_else(|| Mp4Error::MissingBox {
            name: "moov".into(),
            parent: "file".into(),
        })
    }

    fn legacy_chapters(&mut self, udta: &BoxHeader) -> Result<Option<Vec<Chapter>>> {
        let Some(chpl) = self.tree.find_in(udta, b"chpl")? else {
            return Ok(None);
        };

        let chpl = ChplAtom::parse(self.tree.data(), &chpl)?;
        self.tree.add_quirk(format!("chpl:v{}", chpl.version));

        Ok(Some(
            chpl.entries
                .into_iter()
                .map(|entry| Chapter::new(entry.seconds(), vec![Title::untagged(entry.title)]))
                .collect(),
        ))
    }

    fn chapter_track(&mut self, trak: &BoxHeader) -> Result<ChapterTrack> {
        let [mdia] = self.tree.assert_boxes_in(trak, [b"mdia"])?;
        let [minf, hdlr] = self.tree.assert_boxes_in(&mdia, [b"minf", b"hdlr"])?;

        let hdlr = HdlrAtom::parse(self.tree.data(), &hdlr)?;
        if !hdlr.is_text() {
            return Err(Mp4Error::HandlerType(
                String::from_utf8_lossy(&hdlr.handler_type).into_owned(),
            ));
        }

        let [_gmhd, stbl] = self.tree.assert_boxes_in(&minf, [b"gmhd", b"stbl"])?;
        let [stts, stsc, stsz, stco] = self
            .tree
            .assert_boxes_in(&stbl, [b"stts", b"stsc", b"stsz", b"stco"])?;
        let mdhd = self.tree.find_in(&mdia, b"mdhd")?;

        Ok(ChapterTrack {
            trak: *trak,
            mdhd,
            stts,
            stsc,
            stsz,
            stco,
        })
    }

    fn track_chapters(&mut self, track: &ChapterTrack, movie_timescale: u32) -> Result<Vec<Chapter>> {
        let data = self.tree.data();
        let tables = SampleTables::parse(data, &track.stts, &track.stsc, &track.stsz, &track.stco)?;

        let samples = match tables.stsc.as_slice() {
            [(1, samples, 1)] => *samples,
            _ => {
                return Err(Mp4Error::ComplexSamples {
                    entries: tables.stsc.len(),
                })
            }
        };

        let mut offset = *tables.stco.first().ok_or(Mp4Error::NoChunkOffset)? as usize;
        if offset >= data.len() {
            self.tree.add_quirk("stco:truncated");
        }

        let timescale = match track.mdhd.map(|h| MdhdAtom::parse(data, &h)) {
            Some(Ok(mdhd)) if mdhd.timescale != 0 => mdhd.timescale,
            Some(Err(e)) => {
                trace!(error = %e, "Unreadable mdhd, using movie timescale");
                movie_timescale
            }
            _ => movie_timescale,
        };
        let timescale = f64::from(timescale);

        let mut deltas = tables
            .stts
            .iter()
            .flat_map(|&(count, delta)| std::iter::repeat(delta).take(count as usize));
        let mut ticks: u64 = 0;
        let mut chapters = Vec::new();

        for i in 0..samples as usize {
            let title = match ByteCursor::at(data, offset).and_then(|mut c| c.read_str_u16()) {
                Ok(title) => title,
                Err(e) => {
                    trace!(sample = i, offset, error = %e, "Chapter sample out of range");
                    self.tree.add_quirk(format!("samples:truncated@{i}"));
                    if chapters.is_empty() {
                        return Err(e.into());
                    }
                    break;
                }
            };
            chapters.push(Chapter::new(ticks as f64 / timescale, vec![Title::untagged(title)]));

            let Some(size) = tables.stsz.size_of(i) else {
                self.tree.add_quirk(format!("stsz:short@{i}"));
                break;
            };
            offset = offset.saturating_add(size as usize);
            ticks += u64::from(deltas.next().unwrap_or(0));
        }

        trace!(trak = track.trak.at, samples, "Chapter track decoded");
        Ok(chapters)
    }
}

impl ChapterParser for Mp4Parser<'_> {
    fn format_name(&self) -> &str {
        "isobmff"
    }

    fn parse_chapters(&mut self) -> mediachapters_core::Result<Option<ChapterInfo>> {
        self.parse().map_err(Into::into)
    }

    fn quirks(&self) -> &Quirks {
        self.tree.quirks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{boxed, chpl, ftyp, full_box, hdlr, mdhd_v0, mvhd_v0, table};

    fn movie(children: &[Vec<u8>]) -> Vec<u8> {
        let mut data = ftyp(b"isom", &[b"isom", b"iso2"]);
        data.extend(boxed(b"moov", &children.concat()));
        data
    }

    fn chapter_trak(stsc: &[u32], stts: &[u32], stsz: &[u32], stco: &[u32]) -> Vec<u8> {
        timed_chapter_trak(&[], stsc, stts, stsz, stco)
    }

    /// Chapter track with `mdhd` (possibly empty) placed first in `mdia`.
    fn timed_chapter_trak(
        mdhd: &[u8],
        stsc: &[u32],
        stts: &[u32],
        stsz: &[u32],
        stco: &[u32],
    ) -> Vec<u8> {
        let stbl = boxed(
            b"stbl",
            &[
                table(b"stts", stts),
                table(b"stsc", stsc),
                table(b"stsz", stsz),
                table(b"stco", stco),
            ]
            .concat(),
        );
        let minf = boxed(b"minf", &[boxed(b"gmhd", &[]), stbl].concat());
        let mdia = boxed(b"mdia", &[mdhd.to_vec(), hdlr(b"text"), minf].concat());
        boxed(b"trak", &mdia)
    }

    fn text_sample(title: &str, size: usize) -> Vec<u8> {
        let mut sample = (title.len() as u16).to_be_bytes().to_vec();
        sample.extend_from_slice(title.as_bytes());
        sample.resize(size, 0);
        sample
    }

    /// Movie with one chapter track whose samples are appended after `moov`.
    fn movie_with_track(stsc: &[u32], stts: &[u32], stsz: &[u32], samples: &[u8]) -> Vec<u8> {
        movie_with_timed_track(&[], stsc, stts, stsz, samples)
    }

    fn movie_with_timed_track(
        mdhd: &[u8],
        stsc: &[u32],
        stts: &[u32],
        stsz: &[u32],
        samples: &[u8],
    ) -> Vec<u8> {
        let build = |offset: u32| {
            movie(&[
                mvhd_v0(1000, 5000),
                timed_chapter_trak(mdhd, stsc, stts, stsz, &[1, offset]),
            ])
        };
        let offset = build(0).len() as u32;
        let mut data = build(offset);
        data.extend_from_slice(samples);
        data
    }

    #[test]
    fn test_chpl_chapters() {
        let udta = boxed(b"udta", &chpl(1, &[(0, "Intro"), (300_000_000, "Part 2")]));
        let data = movie(&[mvhd_v0(1000, 5000), udta]);

        let mut parser = Mp4Parser::new(&data);
        let info = parser.parse().unwrap().unwrap();
        assert_eq!(info.duration, 5.0);
        assert_eq!(info.len(), 2);
        assert_eq!(info.chapters[1].start, 30.0);
        assert_eq!(info.chapters[1].titles[0].text, "Part 2");
        assert_eq!(info.chapters[1].titles[0].lang, "unk");
        assert_eq!(info.chapters[1].end, None);

        let quirks = parser.quirks();
        assert!(quirks.contains("ftyp:isom"));
        assert!(quirks.contains("brands:isom,iso2"));
        assert!(quirks.contains("mvhd:v0"));
        assert!(quirks.contains("udta"));
        assert!(quirks.contains("chpl:v1"));
    }

    #[test]
    fn test_chpl_v0_chapters() {
        let udta = boxed(b"udta", &chpl(0, &[(0, "Intro"), (300_000_000, "Chapter 2")]));
        let data = movie(&[mvhd_v0(1000, 5000), udta]);

        let mut parser = Mp4Parser::new(&data);
        let info = parser.parse().unwrap().unwrap();
        let chapters: Vec<(f64, &str)> = info
            .chapters
            .iter()
            .map(|c| (c.start, c.title_in("unk")))
            .collect();
        assert_eq!(chapters, vec![(0.0, "Intro"), (30.0, "Chapter 2")]);
        assert!(parser.quirks().contains("chpl:v0"));
    }

    #[test]
    fn test_no_chapters() {
        let data = movie(&[mvhd_v0(1000, 5000)]);
        assert_eq!(Mp4Parser::new(&data).parse().unwrap(), None);
    }

    #[test]
    fn test_missing_moov() {
        let data = ftyp(b"isom", &[b"iso2"]);
        assert!(matches!(
            Mp4Parser::new(&data).parse(),
            Err(Mp4Error::MissingBox { ref name, .. }) if name == "moov"
        ));
    }

    #[test]
    fn test_missing_mvhd() {
        let data = movie(&[boxed(b"udta", &[])]);
        assert!(matches!(
            Mp4Parser::new(&data).parse(),
            Err(Mp4Error::MissingBox { ref name, .. }) if name == "mvhd"
        ));
    }

    #[test]
    fn test_mvhd_version_2_fails() {
        let data = movie(&[full_box(b"mvhd", 2, 0, &[0; 100])]);
        assert!(matches!(
            Mp4Parser::new(&data).parse(),
            Err(Mp4Error::UnsupportedVersion { name: "mvhd", version: 2 })
        ));
    }

    #[test]
    fn test_chapter_track() {
        let samples = [text_sample("One", 20), text_sample("Two", 20)].concat();
        let data = movie_with_track(&[1, 1, 2, 1], &[1, 2, 1000], &[20, 2], &samples);

        let mut parser = Mp4Parser::new(&data);
        let info = parser.parse().unwrap().unwrap();
        let starts: Vec<f64> = info.chapters.iter().map(|c| c.start).collect();
        let titles: Vec<&str> = info.chapters.iter().map(|c| c.title_in("unk")).collect();
        assert_eq!(starts, vec![0.0, 1.0]);
        assert_eq!(titles, vec!["One", "Two"]);
        assert!(parser.quirks().iter().any(|q| q.starts_with("chapter-track@")));
    }

    #[test]
    fn test_chapter_track_listed_sizes_and_runs() {
        let samples = [
            text_sample("A", 4),
            text_sample("B", 10),
            text_sample("C", 3),
        ]
        .concat();
        let data = movie_with_track(
            &[1, 1, 3, 1],
            &[2, 2, 500, 1, 250],
            &[0, 3, 4, 10, 3],
            &samples,
        );

        let info = Mp4Parser::new(&data).parse().unwrap().unwrap();
        let starts: Vec<f64> = info.chapters.iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![0.0, 0.5, 1.0]);
        assert_eq!(info.chapters[2].title_in("eng"), "C");
    }

    #[test]
    fn test_complex_samples() {
        let data = movie_with_track(&[2, 1, 2, 1, 2, 1, 2, 1], &[1, 2, 1000], &[20, 2], &[]);
        assert_eq!(
            Mp4Parser::new(&data).parse().unwrap_err(),
            Mp4Error::ComplexSamples { entries: 2 }
        );
    }

    #[test]
    fn test_truncated_samples_keep_decoded_chapters() {
        let samples = [text_sample("One", 20), text_sample("Two", 20)].concat();
        let mut data = movie_with_track(&[1, 1, 2, 1], &[1, 2, 1000], &[20, 2], &samples);
        data.truncate(data.len() - 30);

        let mut parser = Mp4Parser::new(&data);
        let info = parser.parse().unwrap().unwrap();
        assert_eq!(info.len(), 1);
        assert!(parser.quirks().contains("samples:truncated@1"));
    }

    #[test]
    fn test_samples_past_end_of_buffer() {
        let samples = [text_sample("One", 20), text_sample("Two", 20)].concat();
        let mut data = movie_with_track(&[1, 1, 2, 1], &[1, 2, 1000], &[20, 2], &samples);
        data.truncate(data.len() - 40);

        let mut parser = Mp4Parser::new(&data);
        let err = parser.parse().unwrap_err();
        assert!(err.is_bounds());
        assert!(mediachapters_core::Error::from(err).is_out_of_data());

        let quirks = parser.quirks();
        assert!(quirks.contains("stco:truncated"));
        assert!(quirks.contains("samples:truncated@0"));
    }

    #[test]
    fn test_chapter_track_uses_mdhd_timescale() {
        let samples = [text_sample("One", 20), text_sample("Two", 20)].concat();
        let data = movie_with_timed_track(
            &mdhd_v0(100, 2000),
            &[1, 1, 2, 1],
            &[1, 2, 1000],
            &[20, 2],
            &samples,
        );

        let info = Mp4Parser::new(&data).parse().unwrap().unwrap();
        let starts: Vec<f64> = info.chapters.iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![0.0, 10.0]);
        assert_eq!(info.duration, 5.0);
    }

    #[test]
    fn test_zero_mdhd_timescale_falls_back_to_movie() {
        let samples = [text_sample("One", 20), text_sample("Two", 20)].concat();
        let data = movie_with_timed_track(
            &mdhd_v0(0, 0),
            &[1, 1, 2, 1],
            &[1, 2, 1000],
            &[20, 2],
            &samples,
        );

        let info = Mp4Parser::new(&data).parse().unwrap().unwrap();
        let starts: Vec<f64> = info.chapters.iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![0.0, 1.0]);
    }

    #[test]
    fn test_non_text_track_is_skipped() {
        let mut trak = chapter_trak(&[1, 1, 1, 1], &[1, 1, 1000], &[8, 1], &[1, 0]);
        let text = trak.windows(4).position(|w| w == b"text").unwrap();
        trak[text..text + 4].copy_from_slice(b"vide");
        let data = movie(&[mvhd_v0(1000, 5000), trak]);

        let mut parser = Mp4Parser::new(&data);
        assert_eq!(parser.parse().unwrap(), None);
        assert!(!parser.quirks().iter().any(|q| q.starts_with("chapter-track@")));
    }

    #[test]
    fn test_broken_chpl_error_wins_without_chapter_track() {
        let mut chpl = chpl(1, &[(0, "Intro")]);
        chpl.truncate(chpl.len() - 2);
        let udta = boxed(b"udta", &chpl);
        let data = movie(&[mvhd_v0(1000, 5000), udta]);

        let err = Mp4Parser::new(&data).parse().unwrap_err();
        assert!(err.is_bounds());
    }

    #[test]
    fn test_chapter_track_supersedes_broken_chpl() {
        let broken = full_box(b"chpl", 1, 0, &[]);
        let sample = text_sample("Only", 8);
        let build = |offset: u32| {
            movie(&[
                mvhd_v0(1000, 5000),
                boxed(b"udta", &broken),
                chapter_trak(&[1, 1, 1, 1], &[1, 1, 1000], &[8, 1], &[1, offset]),
            ])
        };
        let offset = build(0).len() as u32;
        let mut data = build(offset);
        data.extend_from_slice(&sample);

        let info = Mp4Parser::new(&data).parse().unwrap().unwrap();
        assert_eq!(info.chapters[0].title_in("unk"), "Only");
    }

    #[test]
    fn test_truncated_moov_quirk() {
        let udta = boxed(b"udta", &chpl(1, &[(0, "Intro")]));
        let mut data = movie(&[mvhd_v0(1000, 5000), udta, boxed(b"trak", &[0; 64])]);
        data.truncate(data.len() - 40);

        let mut parser = Mp4Parser::new(&data);
        assert_eq!(parser.parse().unwrap().unwrap().len(), 1);
        assert!(parser.quirks().contains("moov:truncated"));
    }

    #[test]
    fn test_chapter_parser_trait() {
        let data = movie(&[mvhd_v0(1000, 5000)]);
        let mut parser = Mp4Parser::new(&data);
        assert_eq!(parser.format_name(), "isobmff");
        assert_eq!(parser.parse_chapters().unwrap(), None);
        assert!(ChapterParser::quirks(&parser).contains("mvhd:v0"));
    }
}
