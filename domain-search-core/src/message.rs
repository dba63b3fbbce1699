//! Field-level protobuf reading and writing.
//!
//! Messages are hand-mapped: each entity implements [`DecodeMessage`] with a
//! `match` on `(field_number, wire_type)` and falls through to
//! [`WireReader::skip`] for anything it does not recognize. Encoding goes
//! through the `encode_*_field` helpers, which omit absent values.

use bytes::BufMut;

use crate::error::DecodeError;
use crate::tag::{Tag, WireType, encode_tag};
use crate::varint::{decode_varint, encode_varint};

/// A cursor over an encoded message.
#[derive(Clone, Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset into the message.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn has_remaining(&self) -> bool {
        self.pos < self.buf.len()
    }

    /// Read the next field tag.
    pub fn read_tag(&mut self) -> Result<Tag, DecodeError> {
        let offset = self.pos;
        let raw = self.read_varint()?;
        Tag::from_raw(raw, offset)
    }

    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let (value, next) = decode_varint(self.buf, self.pos)?;
        self.pos = next;
        Ok(value)
    }

    /// Read a varint as a bool (any non-zero value is `true`).
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.read_varint()? != 0)
    }

    /// Read a little-endian 32-bit float.
    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        let bytes = self.take_array::<4>()?;
        Ok(f32::from_le_bytes(bytes))
    }

    /// Read a little-endian 64-bit float.
    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        let bytes = self.take_array::<8>()?;
        Ok(f64::from_le_bytes(bytes))
    }

    /// Read a length-delimited value as raw bytes.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let length = self.read_varint()?;
        let length = usize::try_from(length).unwrap_or(usize::MAX);
        self.take(length)
    }

    /// Read a length-delimited value as a string.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let bytes = self.read_bytes()?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a length-delimited value as a nested message.
    pub fn read_message<M: DecodeMessage>(&mut self) -> Result<M, DecodeError> {
        let bytes = self.read_bytes()?;
        M::decode(bytes)
    }

    /// Advance past a value of the given wire type without materializing it.
    pub fn skip(&mut self, wire_type: WireType) -> Result<(), DecodeError> {
        match wire_type {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::Fixed64 => {
                self.take(8)?;
            }
            WireType::LengthDelimited => {
                self.read_bytes()?;
            }
            WireType::Fixed32 => {
                self.take(4)?;
            }
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(DecodeError::MalformedMessage {
                offset: self.pos,
                needed: len,
                remaining,
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }
}

/// A message that can be decoded field by field.
pub trait DecodeMessage: Default {
    /// Merge one field into `self`.
    ///
    /// Implementations must consume exactly the field's value, and should
    /// hand unrecognized tags to [`WireReader::skip`].
    fn merge_field(&mut self, tag: Tag, reader: &mut WireReader<'_>) -> Result<(), DecodeError>;

    /// Decode a message from its encoded bytes. An empty buffer yields the
    /// default value.
    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut message = Self::default();
        let mut reader = WireReader::new(buf);
        while reader.has_remaining() {
            let tag = reader.read_tag()?;
            message.merge_field(tag, &mut reader)?;
        }
        Ok(message)
    }
}

/// A message that can be encoded.
pub trait EncodeMessage {
    /// Append the message's fields to `buf`.
    fn encode_raw(&self, buf: &mut impl BufMut);

    fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_raw(&mut buf);
        buf
    }
}

/// Encode a string field; empty strings are omitted.
pub fn encode_string_field(field_number: u32, value: &str, buf: &mut impl BufMut) {
    encode_bytes_field(field_number, value.as_bytes(), buf);
}

/// Encode a length-delimited field; empty payloads are omitted.
///
/// Used for both `bytes` and nested messages: a nested message that encodes
/// to nothing leaves no trace in its parent.
pub fn encode_bytes_field(field_number: u32, value: &[u8], buf: &mut impl BufMut) {
    if value.is_empty() {
        return;
    }
    encode_tag(field_number, WireType::LengthDelimited, buf);
    encode_varint(value.len() as u64, buf);
    buf.put_slice(value);
}

/// Encode a nested message field; a message with no set fields is omitted.
pub fn encode_message_field<M: EncodeMessage>(field_number: u32, message: &M, buf: &mut impl BufMut) {
    let nested = message.encode_to_vec();
    encode_bytes_field(field_number, &nested, buf);
}

/// Encode a varint field.
pub fn encode_varint_field(field_number: u32, value: u64, buf: &mut impl BufMut) {
    encode_tag(field_number, WireType::Varint, buf);
    encode_varint(value, buf);
}
