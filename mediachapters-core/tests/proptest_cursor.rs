//! Property-based tests for the byte cursor.
//!
//! Verifies VINT encode/decode agreement, truncation behaviour and that
//! fixed-width reads never run past the buffer.

use mediachapters_core::vint::{encode_vint, encode_vint_width};
use mediachapters_core::{ByteCursor, CursorError};
use proptest::prelude::*;

// =============================================================================
// VINT
// =============================================================================

proptest! {
    /// Minimal-width VINTs up to seven bytes decode to the encoded value.
    #[test]
    fn vint_roundtrip(value in 0u64..0x01FF_FFFF_FFFF_FF) {
        let encoded = encode_vint(value);
        let mut cursor = ByteCursor::new(&encoded);

        prop_assert_eq!(cursor.vint_width().unwrap(), encoded.len());
        prop_assert_eq!(cursor.read_vint().unwrap(), value);
        prop_assert!(cursor.is_eof());
    }

    /// Eight-byte VINTs that fit in 32 bits decode; the width is accepted.
    #[test]
    fn vint_roundtrip_eight_bytes(value in any::<u32>()) {
        let encoded = encode_vint_width(u64::from(value), 8).unwrap();
        let mut cursor = ByteCursor::new(&encoded);

        prop_assert_eq!(cursor.read_vint().unwrap(), u64::from(value));
    }

    /// Eight-byte VINTs above 32 bits overflow, but size reads saturate.
    #[test]
    fn vint_eight_bytes_overflow(value in (1u64 << 32)..(1u64 << 56)) {
        let encoded = encode_vint_width(value, 8).unwrap();

        let mut cursor = ByteCursor::new(&encoded);
        let is_overflow = matches!(cursor.read_vint(), Err(CursorError::CastOverflow { .. }));
        prop_assert!(is_overflow);

        let mut cursor = ByteCursor::new(&encoded);
        prop_assert_eq!(cursor.read_vint_size().unwrap(), 0xFFFF_FFFF);
    }

    /// Any strict prefix of an encoded VINT fails with a bounds error.
    #[test]
    fn vint_truncated(value in 0x7Fu64..0x01FF_FFFF_FFFF_FF, cut in 0usize..8) {
        let encoded = encode_vint(value);
        let cut = cut % encoded.len();
        let mut cursor = ByteCursor::new(&encoded[..cut]);

        let is_eob = matches!(cursor.read_vint(), Err(CursorError::EndOfBuffer { .. }));
        prop_assert!(is_eob);
        prop_assert_eq!(cursor.position(), 0);
    }

    /// Signed VINTs sign-extend from their value bits.
    #[test]
    fn vint_i32_roundtrip(width in 1usize..=4, raw in any::<i32>()) {
        let bits = 7 * width as u32;
        let half = 1i64 << (bits - 1);
        let value = i64::from(raw).rem_euclid(2 * half) - half;

        let unsigned = (value & ((1i64 << bits) - 1)) as u64;
        let encoded = encode_vint_width(unsigned, width).unwrap();
        let mut cursor = ByteCursor::new(&encoded);

        prop_assert_eq!(i64::from(cursor.read_vint_i32().unwrap()), value);
    }
}

// =============================================================================
// Fixed-width reads
// =============================================================================

proptest! {
    /// A read either succeeds and advances by its width, or fails in place.
    #[test]
    fn fixed_reads_stay_in_bounds(
        data in proptest::collection::vec(any::<u8>(), 0..64),
        ops in proptest::collection::vec(0u8..6, 1..32),
    ) {
        let mut cursor = ByteCursor::new(&data);

        for op in ops {
            let before = cursor.position();
            let (width, ok) = match op {
                0 => (1, cursor.read_u8().is_ok()),
                1 => (2, cursor.read_u16().is_ok()),
                2 => (3, cursor.read_u24().is_ok()),
                3 => (4, cursor.read_u32().is_ok()),
                4 => (8, cursor.read_u64().is_ok()),
                _ => (4, cursor.read_fourcc().is_ok()),
            };

            prop_assert!(cursor.position() <= data.len());
            if ok {
                prop_assert_eq!(cursor.position(), before + width);
            } else {
                prop_assert_eq!(cursor.position(), before);
                prop_assert!(data.len() - before < width);
            }
        }
    }

    /// Length-prefixed strings never read past the buffer.
    #[test]
    fn prefixed_strings_stay_in_bounds(data in proptest::collection::vec(any::<u8>(), 0..300)) {
        let mut cursor = ByteCursor::new(&data);
        while cursor.read_str_u16().is_ok() {}
        prop_assert!(cursor.position() <= data.len());
    }
}
