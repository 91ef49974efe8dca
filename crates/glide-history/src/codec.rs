//! Variable-length integer codec.
//!
//! Signed integers are zig-zag mapped to unsigned, then written 7 bits per
//! byte, least-significant group first, with the high bit set on every byte
//! except the last. Small deltas therefore cost a single byte.

use crate::error::DecodeError;

/// Longest possible encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

const CONTINUATION: u8 = 0x80;
const PAYLOAD: u8 = 0x7f;

/// Map a signed integer onto the unsigned line: 0, -1, 1, -2, 2, ...
#[inline]
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
#[inline]
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Append `value` to `out` as a varint.
pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= u64::from(CONTINUATION) {
        out.push((value as u8 & PAYLOAD) | CONTINUATION);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Read one varint from `buf` starting at `*pos`, advancing `*pos` past it.
///
/// # Errors
///
/// [`DecodeError::Truncated`] if the buffer ends before a terminating byte,
/// [`DecodeError::Overflow`] if the payload does not fit in 64 bits.
pub fn read_varint(buf: &[u8], pos: &mut usize) -> Result<u64, DecodeError> {
    let offset = *pos;
    let mut result = 0u64;
    let mut shift = 0u32;
    loop {
        if shift > 63 {
            return Err(DecodeError::Overflow { offset });
        }
        let Some(&byte) = buf.get(*pos) else {
            return Err(DecodeError::Truncated { offset });
        };
        *pos += 1;

        let bits = u64::from(byte & PAYLOAD);
        // The tenth byte may only contribute the top bit.
        if shift == 63 && bits > 1 {
            return Err(DecodeError::Overflow { offset });
        }
        result |= bits << shift;

        if byte & CONTINUATION == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

/// Append a signed integer (zig-zag + varint).
#[inline]
pub fn write_signed(out: &mut Vec<u8>, value: i64) {
    write_varint(out, zigzag_encode(value));
}

/// Read a signed integer written by [`write_signed`].
///
/// # Errors
///
/// Same as [`read_varint`].
#[inline]
pub fn read_signed(buf: &[u8], pos: &mut usize) -> Result<i64, DecodeError> {
    read_varint(buf, pos).map(zigzag_decode)
}

/// Number of bytes [`write_varint`] emits for `value`.
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}
