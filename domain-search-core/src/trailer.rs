//! Trailer block parsing.
//!
//! The trailer frame carries an HTTP/1-style header block:
//!
//! ```text
//! grpc-status: 5\r\n
//! grpc-message: not found\r\n
//! ```

use std::collections::HashMap;

use http::HeaderMap;

/// Status key carried in trailers and headers.
pub const GRPC_STATUS: &str = "grpc-status";
/// Message key carried in trailers and headers.
pub const GRPC_MESSAGE: &str = "grpc-message";

/// Trailer metadata keyed by lower-cased name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Trailers {
    entries: HashMap<String, String>,
}

impl Trailers {
    /// Parse a trailer frame payload.
    ///
    /// Lines are CRLF-separated and split at the first `:`. A key repeated
    /// later in the block replaces the earlier value. Lines whose key is
    /// empty are ignored.
    pub fn parse(payload: &[u8]) -> Self {
        let text = String::from_utf8_lossy(payload);
        let mut entries = HashMap::new();

        for line in text.split("\r\n").map(str::trim).filter(|l| !l.is_empty()) {
            let (key, value) = line.split_once(':').unwrap_or((line, ""));
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            entries.insert(key.to_ascii_lowercase(), value.trim().to_string());
        }

        Self { entries }
    }

    /// Collect response headers or HTTP trailers into the same shape.
    ///
    /// Values that are not valid header text are skipped.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut entries = HashMap::new();
        for (name, value) in headers {
            if let Ok(value) = value.to_str() {
                entries.insert(name.as_str().to_string(), value.trim().to_string());
            }
        }
        Self { entries }
    }

    /// Merge `other` into `self`, with `other` taking precedence.
    pub fn extend(&mut self, other: Trailers) {
        self.entries.extend(other.entries);
    }

    /// Look up a key (case-insensitive).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The `grpc-status` value, 0 when absent or not a non-negative integer.
    pub fn grpc_status(&self) -> u32 {
        self.get(GRPC_STATUS)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    /// The `grpc-message` value, empty when absent.
    pub fn grpc_message(&self) -> &str {
        self.get(GRPC_MESSAGE).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
