//! EBML variable-length integer encoding.
//!
//! Decoding lives on [`ByteCursor`](crate::ByteCursor); the encoder here is the
//! inverse used to build element headers in fixtures and tools.

/// Maximum VINT length in bytes.
pub const MAX_VINT_LENGTH: usize = 8;

/// Calculate the minimum number of bytes needed to encode a value as a VINT.
///
/// A value whose bits would all be ones at a given width is pushed to the next
/// width, since all-ones is reserved for "unknown size".
pub fn vint_length(value: u64) -> usize {
    if value < 0x7F {
        1
    } else if value < 0x3FFF {
        2
    } else if value < 0x1FFFFF {
        3
    } else if value < 0x0FFFFFFF {
        4
    } else if value < 0x07FFFFFFFF {
        5
    } else if value < 0x03FFFFFFFFFF {
        6
    } else if value < 0x01FFFFFFFFFFFF {
        7
    } else {
        8
    }
}

/// Encode a value as a minimal-width VINT.
///
/// Values wider than 56 bits are truncated to 56 bits.
pub fn encode_vint(value: u64) -> Vec<u8> {
    let length = vint_length(value);
    let mut bytes = value.to_be_bytes()[MAX_VINT_LENGTH - length..].to_vec();

    if length == MAX_VINT_LENGTH {
        bytes[0] = 0;
    }
    bytes[0] |= 0x80 >> (length - 1);

    bytes
}

/// Encode a value as a VINT of exactly `length` bytes.
///
/// Returns `None` if the value does not fit in `length * 7` bits.
pub fn encode_vint_width(value: u64, length: usize) -> Option<Vec<u8>> {
    if !(1..=MAX_VINT_LENGTH).contains(&length) || value >> (7 * length) != 0 {
        return None;
    }
    let mut bytes = value.to_be_bytes()[MAX_VINT_LENGTH - length..].to_vec();
    bytes[0] |= 0x80 >> (length - 1);
    Some(bytes)
}
