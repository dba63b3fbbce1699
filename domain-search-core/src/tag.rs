//! Field tags: a field number and a wire type packed into one varint.

use bytes::BufMut;

use crate::error::DecodeError;
use crate::varint::encode_varint;

/// How a field's value is framed on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// int32, int64, uint32, uint64, bool, enum.
    Varint = 0,
    /// fixed64, sfixed64, double.
    Fixed64 = 1,
    /// string, bytes, embedded messages, packed repeated fields.
    LengthDelimited = 2,
    /// fixed32, sfixed32, float.
    Fixed32 = 5,
}

impl WireType {
    /// Parse the low three bits of a tag.
    pub fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(WireType::Varint),
            1 => Some(WireType::Fixed64),
            2 => Some(WireType::LengthDelimited),
            5 => Some(WireType::Fixed32),
            _ => None,
        }
    }
}

/// A decoded field tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tag {
    pub field_number: u32,
    pub wire_type: WireType,
}

impl Tag {
    pub fn new(field_number: u32, wire_type: WireType) -> Self {
        Self {
            field_number,
            wire_type,
        }
    }

    /// Build a tag from a raw varint value read at `offset`.
    pub fn from_raw(value: u64, offset: usize) -> Result<Self, DecodeError> {
        let (field_number, wire_type) = decode_tag(value);
        let wire_type = WireType::from_raw(wire_type)
            .ok_or(DecodeError::UnsupportedWireType { wire_type, offset })?;
        Ok(Self::new(field_number, wire_type))
    }
}

/// Encode a field tag.
pub fn encode_tag(field_number: u32, wire_type: WireType, buf: &mut impl BufMut) {
    encode_varint((u64::from(field_number) << 3) | wire_type as u64, buf);
}

/// Split a raw tag value into `(field_number, wire_type)`.
///
/// Field numbers above `u32::MAX` are truncated.
pub fn decode_tag(value: u64) -> (u32, u8) {
    ((value >> 3) as u32, (value & 0x7) as u8)
}
