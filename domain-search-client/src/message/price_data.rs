//! Upstream price-service shapes.
//!
//! The price service answers with a map of [`ProductPrice`] keyed by price
//! kind. [`PriceData::normalize`] folds that map into the flat
//! [`PricePayload`] streamed to clients.

use std::collections::BTreeMap;

use domain_search_core::{DecodeError, DecodeMessage, Tag, WireReader, WireType};
use serde::Serialize;

use super::response::PricePayload;

/// Key of the registration price in the requested currency.
pub const REGISTRATION_PRICE_KEY: &str = "REQUESTED_CURRENCY";
/// Key of the renewal price in the requested currency.
pub const RENEWAL_PRICE_KEY: &str = "RENEWAL_REQUESTED_CURRENCY";

/// Largest magnitude, in milliseconds, a rendered timestamp may have.
const MAX_TIMESTAMP_MILLIS: i64 = 8_640_000_000_000_000;

/// An amount of money.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub currency_code: String,
    pub units: i64,
    pub nanos: i32,
    /// Decimal rendering of the amount, preferred over `units`/`nanos`.
    pub value: String,
}

impl Money {
    /// The amount as a float: `value` when it parses, else `units + nanos`.
    pub fn amount(&self) -> f32 {
        if !self.value.is_empty() {
            if let Ok(parsed) = self.value.trim().parse::<f32>() {
                return parsed;
            }
        }
        self.units as f32 + self.nanos as f32 / 1e9
    }
}

impl DecodeMessage for Money {
    fn merge_field(&mut self, tag: Tag, reader: &mut WireReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number, tag.wire_type) {
            (1, WireType::LengthDelimited) => self.currency_code = reader.read_string()?,
            (2, WireType::Varint) => self.units = reader.read_varint()? as i64,
            (3, WireType::Varint) => self.nanos = reader.read_varint()? as i32,
            (4, WireType::LengthDelimited) => self.value = reader.read_string()?,
            _ => reader.skip(tag.wire_type)?,
        }
        Ok(())
    }
}

/// The validity window of a promotion, as RFC 3339 strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PromotionPeriod {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl DecodeMessage for PromotionPeriod {
    fn merge_field(&mut self, tag: Tag, reader: &mut WireReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number, tag.wire_type) {
            (1, WireType::LengthDelimited) => {
                self.from = reader.read_message::<TimestampFields>()?.render();
            }
            (2, WireType::LengthDelimited) => {
                self.to = reader.read_message::<TimestampFields>()?.render();
            }
            _ => reader.skip(tag.wire_type)?,
        }
        Ok(())
    }
}

/// `google.protobuf.Timestamp` as it appears on the wire.
#[derive(Debug, Default)]
struct TimestampFields {
    seconds: i64,
    nanos: i64,
}

impl TimestampFields {
    /// Render with exactly three fractional digits, like
    /// `2023-11-14T22:13:20.000Z`. `None` when out of range.
    fn render(&self) -> Option<String> {
        let rounded = (self.nanos as f64 / 1e6 + 0.5).floor() as i64;
        let millis = self.seconds.checked_mul(1000)?.checked_add(rounded)?;
        if millis.checked_abs()? > MAX_TIMESTAMP_MILLIS {
            return None;
        }

        let whole_seconds = prost_types::Timestamp {
            seconds: millis.div_euclid(1000),
            nanos: 0,
        }
        .to_string();
        let stem = whole_seconds.strip_suffix('Z')?;
        Some(format!("{}.{:03}Z", stem, millis.rem_euclid(1000)))
    }
}

impl DecodeMessage for TimestampFields {
    fn merge_field(&mut self, tag: Tag, reader: &mut WireReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number, tag.wire_type) {
            (1, WireType::Varint) => self.seconds = reader.read_varint()? as i64,
            (2, WireType::Varint) => self.nanos = reader.read_varint()? as i64,
            _ => reader.skip(tag.wire_type)?,
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Promotion {
    pub period: Option<PromotionPeriod>,
}

impl DecodeMessage for Promotion {
    fn merge_field(&mut self, tag: Tag, reader: &mut WireReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number, tag.wire_type) {
            (1, WireType::LengthDelimited) => self.period = Some(reader.read_message()?),
            _ => reader.skip(tag.wire_type)?,
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProductPrice {
    pub price: Option<Money>,
    pub promotion: Option<Promotion>,
    pub labels: Vec<String>,
}

impl DecodeMessage for ProductPrice {
    fn merge_field(&mut self, tag: Tag, reader: &mut WireReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number, tag.wire_type) {
            (1, WireType::LengthDelimited) => self.price = Some(reader.read_message()?),
            (2, WireType::LengthDelimited) => self.promotion = Some(reader.read_message()?),
            (3, WireType::LengthDelimited) => self.labels.push(reader.read_string()?),
            _ => reader.skip(tag.wire_type)?,
        }
        Ok(())
    }
}

/// One `map<string, ProductPrice>` entry.
#[derive(Debug, Default)]
struct PriceEntry {
    key: String,
    value: Option<ProductPrice>,
}

impl DecodeMessage for PriceEntry {
    fn merge_field(&mut self, tag: Tag, reader: &mut WireReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number, tag.wire_type) {
            (1, WireType::LengthDelimited) => self.key = reader.read_string()?,
            (2, WireType::LengthDelimited) => self.value = Some(reader.read_message()?),
            _ => reader.skip(tag.wire_type)?,
        }
        Ok(())
    }
}

/// Prices of one product keyed by price kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PriceData {
    pub prices: BTreeMap<String, ProductPrice>,
}

impl DecodeMessage for PriceData {
    fn merge_field(&mut self, tag: Tag, reader: &mut WireReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number, tag.wire_type) {
            (1, WireType::LengthDelimited) => {
                let entry: PriceEntry = reader.read_message()?;
                if let Some(value) = entry.value {
                    self.prices.insert(entry.key, value);
                }
            }
            _ => reader.skip(tag.wire_type)?,
        }
        Ok(())
    }
}

impl PriceData {
    /// Pick the price stored under `key`, else the first price by key order.
    pub fn pick(&self, key: &str) -> Option<&ProductPrice> {
        self.prices.get(key).or_else(|| self.prices.values().next())
    }

    /// Fold the upstream prices into a streamed record for `domain`.
    ///
    /// Returns `None` when there are no prices at all.
    pub fn normalize(&self, domain: &str) -> Option<PricePayload> {
        if self.prices.is_empty() {
            return None;
        }
        let registration = self.pick(REGISTRATION_PRICE_KEY);
        let renewal = self.pick(RENEWAL_PRICE_KEY);

        Some(PricePayload {
            domain: domain.to_string(),
            availability: true,
            currency: money(registration)
                .map(|m| m.currency_code.clone())
                .unwrap_or_default(),
            cost: money(registration).map(Money::amount).unwrap_or(0.0),
            promotion: registration.is_some_and(|p| p.promotion.is_some()),
            labels: registration.map(|p| p.labels.clone()).unwrap_or_default(),
            renewal_cost: money(renewal).map(Money::amount).unwrap_or(0.0),
            similarity_score: 0.0,
        })
    }
}

fn money(price: Option<&ProductPrice>) -> Option<&Money> {
    price.and_then(|p| p.price.as_ref())
}
