#![no_main]

//! Fuzz target for Matroska chapter extraction.
//!
//! Feeds arbitrary bytes to the VINT readers, the schema decoder and the full
//! extractor. None of them may panic or loop without consuming input.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mediachapters::{extract, MediaType, ParseConfig};
use mediachapters_core::ByteCursor;
use mediachapters_mkv::ebml::{encode_element, encode_uint_element, read_element_id, read_element_size};
use mediachapters_mkv::elements::*;
use mediachapters_mkv::matroska::{CHAPTERS_SCHEMA, CHAPTER_ATOM_SCHEMA, SEGMENT_SCHEMA};
use mediachapters_mkv::EbmlDecoder;

#[derive(Arbitrary, Debug)]
struct MkvInput {
    data: Vec<u8>,
    operation: MkvOperation,
}

#[derive(Arbitrary, Debug)]
enum MkvOperation {
    /// Read a VINT
    ReadVint,
    /// Read an element ID then its size
    ReadElementHeader,
    /// Decode the input as the body of a master element
    DecodeMaster { schema: u8 },
    /// Run the extractor on the raw input
    Extract { max_depth: u8 },
    /// Run the extractor with a valid EBML header in front of the input
    ExtractWithHeader,
}

fn ebml_header() -> Vec<u8> {
    encode_element(
        EBML,
        &[
            encode_uint_element(EBML_VERSION, 1),
            encode_uint_element(EBML_READ_VERSION, 1),
            encode_uint_element(EBML_MAX_ID_LENGTH, 4),
            encode_uint_element(EBML_MAX_SIZE_LENGTH, 8),
            encode_element(DOC_TYPE, b"matroska"),
            encode_uint_element(DOC_TYPE_VERSION, 4),
        ]
        .concat(),
    )
}

fuzz_target!(|input: MkvInput| {
    if input.data.len() > 64 * 1024 {
        return;
    }

    match input.operation {
        MkvOperation::ReadVint => {
            let mut cursor = ByteCursor::new(&input.data);
            let _ = cursor.read_vint();
        }

        MkvOperation::ReadElementHeader => {
            let mut cursor = ByteCursor::new(&input.data);
            if read_element_id(&mut cursor).is_ok() {
                let _ = read_element_size(&mut cursor);
            }
        }

        MkvOperation::DecodeMaster { schema } => {
            let schema = match schema % 3 {
                0 => &SEGMENT_SCHEMA,
                1 => &CHAPTERS_SCHEMA,
                _ => &CHAPTER_ATOM_SCHEMA,
            };
            let mut cursor = ByteCursor::new(&input.data);
            let _ = EbmlDecoder::default().decode_master(&mut cursor, schema);
        }

        MkvOperation::Extract { max_depth } => {
            let config = ParseConfig::default().with_max_depth(u32::from(max_depth));
            let _ = extract(MediaType::Matroska, &input.data, config);
        }

        MkvOperation::ExtractWithHeader => {
            let mut data = ebml_header();
            data.extend_from_slice(&SEGMENT.to_be_bytes());
            data.extend_from_slice(&input.data);
            if let Ok(extraction) = extract(MediaType::Matroska, &data, ParseConfig::default()) {
                if let Some(info) = extraction.info {
                    let _ = info.cues("eng");
                }
            }
        }
    }
});
