//! Request encoding.
//!
//! Every field is written only when it carries a value. An absent optional
//! field and an empty string are indistinguishable on the wire, and a nested
//! message with nothing set is dropped from its parent entirely.

use bytes::BufMut;
use domain_search_core::{
    EncodeMessage, encode_message_field, encode_string_field, encode_varint_field,
};

/// Product searched by [`SearchPricesRequest::for_domain`].
pub const DOMAIN_PRODUCT: &str = "domain";
/// Currency requested by [`SearchPricesRequest::for_domain`].
pub const DEFAULT_CURRENCY: &str = "USD";

/// The `CheckPriceAgent` request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchPricesRequest {
    pub product: String,
    pub query: String,
    pub currency_code: String,
    pub filter: Option<PriceFilter>,
}

impl SearchPricesRequest {
    /// Build the standard request for a domain typed by a user.
    ///
    /// `"www.Example.com"` searches for `example` restricted to the `com`
    /// TLD, and `"example.co.uk"` for `example` under `co.uk`. Returns `None`
    /// for a blank query.
    pub fn for_domain(query: &str) -> Option<Self> {
        let clean = query.trim().to_ascii_lowercase();
        if clean.is_empty() {
            return None;
        }
        let (label, tld) = split_domain(&clean);

        Some(Self {
            product: DOMAIN_PRODUCT.to_string(),
            query: label.to_string(),
            currency_code: DEFAULT_CURRENCY.to_string(),
            filter: Some(PriceFilter {
                domain: Some(DomainPriceFilter {
                    included_tld_names: Some(tld.to_string()),
                    ..Default::default()
                }),
            }),
        })
    }
}

/// Split a domain into the label left of its public suffix and the suffix.
///
/// Falls back to the last dot when the suffix list has no answer. A bare
/// name without dots is a label with no suffix.
fn split_domain(domain: &str) -> (&str, &str) {
    if !domain.contains('.') {
        return (domain, "");
    }
    let suffix = match psl::suffix_str(domain) {
        Some(suffix) if !suffix.is_empty() => suffix,
        _ => return split_last_dot(domain),
    };

    let remainder = domain
        .strip_suffix(suffix)
        .unwrap_or_default()
        .trim_end_matches('.');
    let label = remainder.rsplit('.').next().unwrap_or(remainder);
    (label, suffix)
}

fn split_last_dot(domain: &str) -> (&str, &str) {
    match domain.rfind('.') {
        Some(idx) if idx > 0 && idx < domain.len() - 1 => {
            let head = &domain[..idx];
            let label = head.rsplit('.').next().unwrap_or(head);
            (label, &domain[idx + 1..])
        }
        _ => (domain, ""),
    }
}

impl EncodeMessage for SearchPricesRequest {
    fn encode_raw(&self, buf: &mut impl BufMut) {
        encode_string_field(1, &self.product, buf);
        encode_string_field(2, &self.query, buf);
        encode_string_field(3, &self.currency_code, buf);
        if let Some(filter) = &self.filter {
            encode_message_field(4, filter, buf);
        }
    }
}

/// Product-specific filter. Only the domain product is supported.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PriceFilter {
    pub domain: Option<DomainPriceFilter>,
}

impl EncodeMessage for PriceFilter {
    fn encode_raw(&self, buf: &mut impl BufMut) {
        if let Some(domain) = &self.domain {
            encode_message_field(1, domain, buf);
        }
    }
}

/// Domain search filter.
///
/// `included_tld_names` and `excluded_tld_names` are alternatives on the
/// wire; see [`DomainPriceFilter::tld_filter`] for how a filter carrying both
/// is resolved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DomainPriceFilter {
    /// Registration period; zero is treated as unset.
    pub quantity: Option<u32>,
    pub included_tld_names: Option<String>,
    pub excluded_tld_names: Option<String>,
}

/// The TLD restriction that is actually sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TldFilter<'a> {
    Included(&'a str),
    Excluded(&'a str),
}

impl DomainPriceFilter {
    /// The TLD restriction to encode. A non-empty included list wins over
    /// the excluded list.
    pub fn tld_filter(&self) -> Option<TldFilter<'_>> {
        if let Some(included) = non_empty(&self.included_tld_names) {
            Some(TldFilter::Included(included))
        } else {
            non_empty(&self.excluded_tld_names).map(TldFilter::Excluded)
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl EncodeMessage for DomainPriceFilter {
    fn encode_raw(&self, buf: &mut impl BufMut) {
        if let Some(quantity) = self.quantity.filter(|q| *q > 0) {
            encode_message_field(1, &UInt32Value(quantity), buf);
        }
        match self.tld_filter() {
            Some(TldFilter::Included(names)) => encode_string_field(3, names, buf),
            Some(TldFilter::Excluded(names)) => encode_string_field(2, names, buf),
            None => {}
        }
    }
}

/// `google.protobuf.UInt32Value`.
struct UInt32Value(u32);

impl EncodeMessage for UInt32Value {
    fn encode_raw(&self, buf: &mut impl BufMut) {
        encode_varint_field(1, u64::from(self.0), buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[derive(Clone, PartialEq, prost::Message)]
    struct WireRequest {
        #[prost(string, tag = "1")]
        product: String,
        #[prost(string, tag = "2")]
        query: String,
        #[prost(string, tag = "3")]
        currency_code: String,
        #[prost(message, optional, tag = "4")]
        filter: Option<WirePriceFilter>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    struct WirePriceFilter {
        #[prost(message, optional, tag = "1")]
        domain: Option<WireDomainFilter>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    struct WireDomainFilter {
        #[prost(message, optional, tag = "1")]
        quantity: Option<WireUInt32>,
        #[prost(string, optional, tag = "2")]
        excluded_tld_names: Option<String>,
        #[prost(string, optional, tag = "3")]
        included_tld_names: Option<String>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    struct WireUInt32 {
        #[prost(uint32, tag = "1")]
        value: u32,
    }

    fn decode(request: &SearchPricesRequest) -> WireRequest {
        WireRequest::decode(request.encode_to_vec().as_slice()).unwrap()
    }

    #[test]
    fn test_empty_request_encodes_to_nothing() {
        assert!(SearchPricesRequest::default().encode_to_vec().is_empty());
    }

    #[test]
    fn test_scalar_fields() {
        let request = SearchPricesRequest {
            product: "domain".into(),
            query: "example".into(),
            currency_code: "USD".into(),
            filter: None,
        };
        let bytes = request.encode_to_vec();
        assert_eq!(&bytes[..8], &[0x0A, 0x06, b'd', b'o', b'm', b'a', b'i', b'n']);

        let wire = decode(&request);
        assert_eq!(wire.product, "domain");
        assert_eq!(wire.query, "example");
        assert_eq!(wire.currency_code, "USD");
        assert!(wire.filter.is_none());
    }

    #[test]
    fn test_utf8_query() {
        let request = SearchPricesRequest {
            query: "bücher".into(),
            ..Default::default()
        };
        let bytes = request.encode_to_vec();
        // Length prefix counts bytes, not chars.
        assert_eq!(bytes[1], 7);
        assert_eq!(decode(&request).query, "bücher");
    }

    #[test]
    fn test_included_tld_takes_precedence() {
        let request = SearchPricesRequest {
            query: "example".into(),
            filter: Some(PriceFilter {
                domain: Some(DomainPriceFilter {
                    quantity: Some(2),
                    included_tld_names: Some("com".into()),
                    excluded_tld_names: Some("net".into()),
                }),
            }),
            ..Default::default()
        };

        let domain = decode(&request).filter.unwrap().domain.unwrap();
        assert_eq!(domain.included_tld_names.as_deref(), Some("com"));
        assert_eq!(domain.excluded_tld_names, None);
        assert_eq!(domain.quantity, Some(WireUInt32 { value: 2 }));
    }

    #[test]
    fn test_excluded_tld_when_no_included() {
        let filter = DomainPriceFilter {
            included_tld_names: Some(String::new()),
            excluded_tld_names: Some("net".into()),
            ..Default::default()
        };
        assert_eq!(filter.tld_filter(), Some(TldFilter::Excluded("net")));

        let request = SearchPricesRequest {
            filter: Some(PriceFilter {
                domain: Some(filter),
            }),
            ..Default::default()
        };
        let domain = decode(&request).filter.unwrap().domain.unwrap();
        assert_eq!(domain.excluded_tld_names.as_deref(), Some("net"));
        assert_eq!(domain.included_tld_names, None);
    }

    #[test]
    fn test_empty_filter_is_omitted() {
        let request = SearchPricesRequest {
            query: "example".into(),
            filter: Some(PriceFilter {
                domain: Some(DomainPriceFilter {
                    quantity: Some(0),
                    ..Default::default()
                }),
            }),
            ..Default::default()
        };
        let without_filter = SearchPricesRequest {
            query: "example".into(),
            ..Default::default()
        };
        assert_eq!(request.encode_to_vec(), without_filter.encode_to_vec());
        assert!(decode(&request).filter.is_none());
    }

    #[test]
    fn test_for_domain() {
        let request = SearchPricesRequest::for_domain("  Example.COM ").unwrap();
        assert_eq!(request.product, "domain");
        assert_eq!(request.query, "example");
        assert_eq!(request.currency_code, "USD");
        let domain = request.filter.unwrap().domain.unwrap();
        assert_eq!(domain.tld_filter(), Some(TldFilter::Included("com")));
    }

    #[test]
    fn test_for_domain_nested_labels() {
        let request = SearchPricesRequest::for_domain("www.example.org").unwrap();
        assert_eq!(request.query, "example");
        let domain = request.filter.unwrap().domain.unwrap();
        assert_eq!(domain.tld_filter(), Some(TldFilter::Included("org")));
    }

    #[test]
    fn test_for_domain_multi_label_suffix() {
        let request = SearchPricesRequest::for_domain("example.co.uk").unwrap();
        assert_eq!(request.query, "example");
        let domain = request.filter.unwrap().domain.unwrap();
        assert_eq!(domain.tld_filter(), Some(TldFilter::Included("co.uk")));

        let request = SearchPricesRequest::for_domain("shop.example.com.au").unwrap();
        assert_eq!(request.query, "example");
        let domain = request.filter.unwrap().domain.unwrap();
        assert_eq!(domain.tld_filter(), Some(TldFilter::Included("com.au")));
    }

    #[test]
    fn test_split_last_dot_fallback() {
        assert_eq!(split_last_dot("www.example.test"), ("example", "test"));
        assert_eq!(split_last_dot("example."), ("example.", ""));
    }

    #[test]
    fn test_for_domain_without_tld() {
        let request = SearchPricesRequest::for_domain("example").unwrap();
        assert_eq!(request.query, "example");
        // No TLD means no filter bytes on the wire.
        assert!(decode(&request).filter.is_none());
    }

    #[test]
    fn test_for_domain_blank() {
        assert!(SearchPricesRequest::for_domain("").is_none());
        assert!(SearchPricesRequest::for_domain("   ").is_none());
    }
}
