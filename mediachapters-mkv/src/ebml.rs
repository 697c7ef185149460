//! EBML (Extensible Binary Meta Language) element primitives.
//!
//! EBML is the binary format underlying Matroska/WebM. Every element is an ID
//! VINT, a size VINT and a payload. The readers here decode one element's
//! size and payload from a [`ByteCursor`] positioned just after its ID.

use crate::error::{MkvError, Result};
use mediachapters_core::vint::encode_vint;
use mediachapters_core::{ByteCursor, CursorError};

/// Maximum element ID length in bytes.
pub const MAX_ID_LENGTH: usize = 4;

/// Read an element ID, keeping its VINT marker bits.
///
/// IDs wider than [`MAX_ID_LENGTH`] fail with [`CursorError::VintWidth`].
pub fn read_element_id(cursor: &mut ByteCursor<'_>) -> std::result::Result<u32, CursorError> {
    let width = cursor.vint_width()?;
    if width > MAX_ID_LENGTH {
        return Err(CursorError::VintWidth {
            offset: cursor.position(),
            width,
        });
    }
    Ok(cursor.read_uint(width)? as u32)
}

/// Read an element size that may be unknown or larger than any buffer.
pub fn read_element_size(cursor: &mut ByteCursor<'_>) -> std::result::Result<u64, CursorError> {
    cursor.read_vint_size()
}

/// Read an unsigned integer element. An empty payload yields `default`.
pub fn read_uint(cursor: &mut ByteCursor<'_>, default: u64) -> Result<u64> {
    let size = cursor.read_vint()?;
    match size {
        0 => Ok(default),
        1..=8 => Ok(cursor.read_uint(size as usize)?),
        _ => Err(MkvError::InvalidIntegerSize {
            offset: cursor.position(),
            size,
        }),
    }
}

/// Read a float element (0, 4 or 8 bytes). An empty payload yields `default`.
pub fn read_float(cursor: &mut ByteCursor<'_>, default: f64) -> Result<f64> {
    let size = cursor.read_vint()?;
    match size {
        0 => Ok(default),
        4 => Ok(f64::from(cursor.read_f32()?)),
        8 => Ok(cursor.read_f64()?),
        _ => Err(MkvError::InvalidFloatSize {
            offset: cursor.position(),
            size,
        }),
    }
}

/// Read a UTF-8 string element.
///
/// Invalid sequences are replaced. The string ends at the first NUL byte, if
/// any.
pub fn read_string(cursor: &mut ByteCursor<'_>) -> Result<String> {
    let size = cursor.read_vint()?;
    let data = cursor.read_bytes(usize::try_from(size).unwrap_or(usize::MAX))?;
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    Ok(String::from_utf8_lossy(&data[..end]).into_owned())
}

/// Skip an element's payload.
pub fn skip_element(cursor: &mut ByteCursor<'_>) -> Result<()> {
    let size = read_element_size(cursor)?;
    cursor.skip(i64::try_from(size).unwrap_or(i64::MAX))?;
    Ok(())
}

/// Offset just past the element whose size field starts at `size_offset`.
///
/// Returns `None` when the size itself cannot be read.
pub fn element_end(data: &[u8], size_offset: usize) -> Option<usize> {
    let mut cursor = ByteCursor::at(data, size_offset).ok()?;
    let size = read_element_size(&mut cursor).ok()?;
    Some(
        cursor
            .position()
            .saturating_add(usize::try_from(size).unwrap_or(usize::MAX)),
    )
}

/// Encode an element ID, dropping leading zero bytes.
pub fn encode_element_id(id: u32) -> Vec<u8> {
    let bytes = id.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(3);
    bytes[start..].to_vec()
}

/// Encode a complete element with a minimal-width size.
pub fn encode_element(id: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = encode_element_id(id);
    out.extend_from_slice(&encode_vint(payload.len() as u64));
    out.extend_from_slice(payload);
    out
}

/// Encode an unsigned integer element using the fewest payload bytes.
pub fn encode_uint_element(id: u32, value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(7);
    encode_element(id, &bytes[start..])
}
