//! Response decoding.
//!
//! Each streamed data frame holds one [`SearchPricesResponse`]. Fields may
//! arrive in any order and may repeat; a repeated scalar keeps its last
//! value and a repeated list field appends.

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use bytes::Bytes;
use domain_search_core::{Code, DecodeError, DecodeMessage, Tag, WireReader, WireType};
use serde::{Serialize, Serializer};

/// One record of the price stream.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SearchPricesResponse {
    /// The price or the per-record error. When both appear on the wire, the
    /// later field wins.
    pub response: Option<PriceResponse>,
}

/// Payload of a [`SearchPricesResponse`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PriceResponse {
    Price(PricePayload),
    Error(Status),
}

impl SearchPricesResponse {
    pub fn price(&self) -> Option<&PricePayload> {
        match &self.response {
            Some(PriceResponse::Price(price)) => Some(price),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Status> {
        match &self.response {
            Some(PriceResponse::Error(status)) => Some(status),
            _ => None,
        }
    }
}

impl DecodeMessage for SearchPricesResponse {
    fn merge_field(&mut self, tag: Tag, reader: &mut WireReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number, tag.wire_type) {
            (1, WireType::LengthDelimited) => {
                self.response = Some(PriceResponse::Price(reader.read_message()?));
            }
            (2, WireType::LengthDelimited) => {
                self.response = Some(PriceResponse::Error(reader.read_message()?));
            }
            _ => reader.skip(tag.wire_type)?,
        }
        Ok(())
    }
}

/// Price quote for one domain.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePayload {
    pub promotion: bool,
    pub cost: f32,
    pub currency: String,
    pub domain: String,
    pub labels: Vec<String>,
    pub availability: bool,
    pub similarity_score: f64,
    pub renewal_cost: f32,
}

impl DecodeMessage for PricePayload {
    fn merge_field(&mut self, tag: Tag, reader: &mut WireReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number, tag.wire_type) {
            (1, WireType::Varint) => self.promotion = reader.read_bool()?,
            (2, WireType::Fixed32) => self.cost = reader.read_f32()?,
            (3, WireType::LengthDelimited) => self.currency = reader.read_string()?,
            (4, WireType::LengthDelimited) => self.domain = reader.read_string()?,
            (5, WireType::LengthDelimited) => self.labels.push(reader.read_string()?),
            (6, WireType::Varint) => self.availability = reader.read_bool()?,
            (7, WireType::Fixed64) => self.similarity_score = reader.read_f64()?,
            (8, WireType::Fixed32) => self.renewal_cost = reader.read_f32()?,
            _ => reader.skip(tag.wire_type)?,
        }
        Ok(())
    }
}

/// `google.rpc.Status` carried inside a record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Status {
    pub code: u32,
    pub message: String,
    /// Packed `google.protobuf.Any` values, kept undecoded.
    #[serde(serialize_with = "serialize_details")]
    pub details: Vec<Bytes>,
}

impl Status {
    pub fn grpc_code(&self) -> Code {
        Code::from_u32(self.code)
    }
}

impl DecodeMessage for Status {
    fn merge_field(&mut self, tag: Tag, reader: &mut WireReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number, tag.wire_type) {
            // A negative int32 code does not fit; it maps to `Code::Unknown`.
            (1, WireType::Varint) => {
                self.code = u32::try_from(reader.read_varint()?).unwrap_or(u32::MAX);
            }
            (2, WireType::LengthDelimited) => self.message = reader.read_string()?,
            (3, WireType::LengthDelimited) => {
                self.details.push(Bytes::copy_from_slice(reader.read_bytes()?));
            }
            _ => reader.skip(tag.wire_type)?,
        }
        Ok(())
    }
}

fn serialize_details<S: Serializer>(details: &[Bytes], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(details.iter().map(|detail| STANDARD_NO_PAD.encode(detail)))
}
