#![no_main]

//! Fuzz target for ISOBMFF chapter extraction.
//!
//! Covers the box walker, the ftyp brand check and the full extractor, both
//! on raw input and with the input wrapped in a `moov` box.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mediachapters::{extract, verify_filetype, MediaType, ParseConfig};
use mediachapters_mp4::BoxTree;

#[derive(Arbitrary, Debug)]
struct Mp4Input {
    data: Vec<u8>,
    operation: Mp4Operation,
}

#[derive(Arbitrary, Debug)]
enum Mp4Operation {
    /// Walk top-level boxes and one level of children
    WalkBoxes,
    /// Check the ftyp brands
    VerifyFiletype { brand: [u8; 4] },
    /// Run the extractor on the raw input
    Extract,
    /// Run the extractor with the input as the payload of a moov box
    ExtractInMoov,
}

fuzz_target!(|input: Mp4Input| {
    if input.data.len() > 64 * 1024 {
        return;
    }

    match input.operation {
        Mp4Operation::WalkBoxes => {
            let mut tree = BoxTree::new(&input.data);
            let top: Vec<_> = tree.top_level().filter_map(Result::ok).collect();
            for parent in &top {
                let _ = tree.children(parent);
            }
        }

        Mp4Operation::VerifyFiletype { brand } => {
            let brand = String::from_utf8_lossy(&brand).into_owned();
            let _ = verify_filetype(&input.data, &brand);
        }

        Mp4Operation::Extract => {
            let _ = extract(MediaType::IsoBmff, &input.data, ParseConfig::default());
        }

        Mp4Operation::ExtractInMoov => {
            let mut data = ((input.data.len() + 8) as u32).to_be_bytes().to_vec();
            data.extend_from_slice(b"moov");
            data.extend_from_slice(&input.data);
            let _ = extract(MediaType::IsoBmff, &data, ParseConfig::default());
        }
    }
});
