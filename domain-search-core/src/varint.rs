//! Base-128 variable-length integers.
//!
//! Seven bits per byte, least-significant group first, with the high bit of
//! each byte set when more groups follow. Values are carried as `u64`.

use bytes::BufMut;

use crate::error::DecodeError;

/// Longest encoding of a 64-bit value.
pub const MAX_VARINT_LEN: usize = 10;

/// Encode `value` as a varint.
pub fn encode_varint(mut value: u64, buf: &mut impl BufMut) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Number of bytes [`encode_varint`] writes for `value`.
pub fn encoded_len_varint(value: u64) -> usize {
    // log2(value) / 7 + 1, with value | 1 so zero takes one byte
    ((((value | 1).leading_zeros() ^ 63) * 9 + 73) / 64) as usize
}

/// Decode a varint starting at `offset`.
///
/// Returns the value and the offset of the first byte after it. Fails when
/// the buffer ends before a byte with a clear high bit, or when the groups
/// would not fit in 64 bits.
pub fn decode_varint(buf: &[u8], offset: usize) -> Result<(u64, usize), DecodeError> {
    let mut value: u64 = 0;
    let mut position = offset;

    for index in 0..MAX_VARINT_LEN {
        let Some(&byte) = buf.get(position) else {
            return Err(DecodeError::MalformedVarint { offset });
        };
        position += 1;

        let group = u64::from(byte & 0x7F);
        // The tenth byte only has room for the top bit of a u64.
        if index == MAX_VARINT_LEN - 1 && group > 1 {
            return Err(DecodeError::MalformedVarint { offset });
        }
        value |= group << (index * 7);

        if byte & 0x80 == 0 {
            return Ok((value, position));
        }
    }

    Err(DecodeError::MalformedVarint { offset })
}
