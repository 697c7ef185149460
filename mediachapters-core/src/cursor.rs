//! Bounds-checked reading over an in-memory byte buffer.
//!
//! [`ByteCursor`] is the single primitive both container parsers are built on.
//! Every read checks that the buffer still covers the requested width and fails
//! with a [`CursorError`] carrying the current offset instead of panicking or
//! wrapping, which is what lets callers parse partial downloads.

use crate::error::CursorError;
use byteorder::{BigEndian, ByteOrder};

/// Size returned by [`ByteCursor::read_vint_size`] when an 8-byte VINT does
/// not fit in 32 bits. Larger than any buffer the parsers see, so a parent
/// element given this size simply runs until the buffer ends.
pub const VINT_OVERSIZED: u64 = 0xFFFF_FFFF;

/// A forward-seekable reader over an immutable byte slice.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Create a cursor positioned at `pos`.
    pub fn at(data: &'a [u8], pos: usize) -> Result<Self, CursorError> {
        let mut cursor = Self::new(data);
        cursor.seek(pos)?;
        Ok(cursor)
    }

    /// The underlying buffer.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total buffer length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left between the position and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// True once every byte has been consumed.
    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Move to an absolute offset. Valid targets are `0..len`.
    pub fn seek(&mut self, pos: usize) -> Result<(), CursorError> {
        if pos >= self.data.len() {
            return Err(CursorError::SeekOutOfRange {
                offset: self.pos,
                target: i64::try_from(pos).unwrap_or(i64::MAX),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Move relative to the current offset.
    pub fn skip(&mut self, delta: i64) -> Result<(), CursorError> {
        let target = (self.pos as i64).saturating_add(delta);
        if target < 0 {
            return Err(CursorError::SeekOutOfRange {
                offset: self.pos,
                target,
            });
        }
        self.seek(target as usize)
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CursorError> {
        let available = self.remaining();
        if n > available {
            return Err(CursorError::EndOfBuffer {
                offset: self.pos,
                needed: n,
                available,
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8, CursorError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(CursorError::EndOfBuffer {
                offset: self.pos,
                needed: 1,
                available: 0,
            })
    }

    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CursorError> {
        Ok(BigEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u24(&mut self) -> Result<u32, CursorError> {
        Ok(BigEndian::read_u24(self.read_bytes(3)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, CursorError> {
        Ok(BigEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32, CursorError> {
        Ok(BigEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64, CursorError> {
        Ok(BigEndian::read_u64(self.read_bytes(8)?))
    }

    pub fn read_f32(&mut self) -> Result<f32, CursorError> {
        Ok(BigEndian::read_f32(self.read_bytes(4)?))
    }

    pub fn read_f64(&mut self) -> Result<f64, CursorError> {
        Ok(BigEndian::read_f64(self.read_bytes(8)?))
    }

    /// Read a signed 16.16 fixed-point number.
    pub fn read_fixed32(&mut self) -> Result<f64, CursorError> {
        Ok(f64::from(self.read_i32()?) / 65536.0)
    }

    /// Read an `n`-byte big-endian unsigned integer, `n` in `0..=8`.
    pub fn read_uint(&mut self, n: usize) -> Result<u64, CursorError> {
        if n > 8 {
            return Err(CursorError::VintWidth {
                offset: self.pos,
                width: n,
            });
        }
        if n == 0 {
            return Ok(0);
        }
        Ok(BigEndian::read_uint(self.read_bytes(n)?, n))
    }

    /// Read a four-character code.
    pub fn read_fourcc(&mut self) -> Result<[u8; 4], CursorError> {
        let bytes = self.read_bytes(4)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// Read `n` bytes as UTF-8, replacing invalid sequences.
    pub fn read_str(&mut self, n: usize) -> Result<String, CursorError> {
        Ok(String::from_utf8_lossy(self.read_bytes(n)?).into_owned())
    }

    /// Read a string prefixed by its length as a `u8`.
    pub fn read_str_u8(&mut self) -> Result<String, CursorError> {
        let n = self.read_u8()?;
        self.read_str(usize::from(n))
    }

    /// Read a string prefixed by its length as a big-endian `u16`.
    pub fn read_str_u16(&mut self) -> Result<String, CursorError> {
        let n = self.read_u16()?;
        self.read_str(usize::from(n))
    }

    // =========================================================================
    // EBML variable-length integers
    // =========================================================================

    /// Width in bytes of the VINT starting at the current offset.
    ///
    /// The position of the first set bit of the leading byte gives the width:
    /// `1xxxxxxx` is one byte, `01xxxxxx` two, down to `00000001` for eight.
    pub fn vint_width(&self) -> Result<usize, CursorError> {
        let first = self.peek_u8()?;
        if first == 0 {
            return Err(CursorError::VintTooBig { offset: self.pos });
        }
        Ok(first.leading_zeros() as usize + 1)
    }

    /// Read an unsigned VINT with the marker bit masked off.
    ///
    /// Widths 1 to 7 decode to their full value. An 8-byte VINT carries 56
    /// significant bits and must fit in 32 of them, otherwise this fails with
    /// [`CursorError::CastOverflow`].
    pub fn read_vint(&mut self) -> Result<u64, CursorError> {
        let width = self.vint_width()?;
        let bytes = self.read_bytes(width)?;

        let mask = (0xFFu16 >> width) as u8;
        let value = bytes[1..]
            .iter()
            .fold(u64::from(bytes[0] & mask), |acc, &b| (acc << 8) | u64::from(b));

        if width == 8 && value > u64::from(u32::MAX) {
            return Err(CursorError::CastOverflow {
                offset: self.pos,
                value,
            });
        }

        Ok(value)
    }

    /// Read an unsigned VINT used as an element size.
    ///
    /// Same as [`read_vint`](Self::read_vint), except that an 8-byte value
    /// too large for 32 bits yields [`VINT_OVERSIZED`]. This covers the EBML
    /// "unknown size" marker as well.
    pub fn read_vint_size(&mut self) -> Result<u64, CursorError> {
        match self.read_vint() {
            Err(CursorError::CastOverflow { .. }) => Ok(VINT_OVERSIZED),
            other => other,
        }
    }

    /// Read a signed VINT of width 1 to 4, sign-extended from its value bits.
    pub fn read_vint_i32(&mut self) -> Result<i32, CursorError> {
        let width = self.vint_width()?;
        if width > 4 {
            return Err(CursorError::VintWidth {
                offset: self.pos,
                width,
            });
        }
        let value = self.read_vint()? as u32;
        let shift = 32 - 7 * width as u32;
        Ok(((value << shift) as i32) >> shift)
    }
}
