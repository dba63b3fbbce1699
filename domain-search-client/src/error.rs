//! Client-side error types.
//!
//! This module provides [`ClientError`], the error type surfaced by a price
//! stream. Cancellation is not an error: a cancelled stream simply ends.

use domain_search_core::{Code, DecodeError};

/// Failure modes of a price search stream.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ClientError {
    /// The server reported a non-zero `grpc-status`.
    #[error("{message}")]
    Status { code: Code, message: String },

    /// Transport-level failure: connection refused, non-success HTTP
    /// status, missing response body, broken body stream.
    #[error("transport error: {0}")]
    Transport(String),

    /// A data frame did not hold a well-formed message.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Malformed framing: unknown frame flags, truncated trailing bytes.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    /// Build a status error from a raw `grpc-status` value.
    ///
    /// An empty message falls back to `gRPC status N`.
    pub fn from_status(status: u32, message: &str) -> Self {
        let message = if message.is_empty() {
            format!("gRPC status {status}")
        } else {
            message.to_string()
        };
        ClientError::Status {
            code: Code::from_u32(status),
            message,
        }
    }

    /// Get the error code.
    ///
    /// For non-Status variants, returns an appropriate code:
    /// - Transport: `Unavailable`
    /// - Decode: `Internal`
    /// - Protocol: `DataLoss`
    pub fn code(&self) -> Code {
        match self {
            ClientError::Status { code, .. } => *code,
            ClientError::Transport(_) => Code::Unavailable,
            ClientError::Decode(_) => Code::Internal,
            ClientError::Protocol(_) => Code::DataLoss,
        }
    }

    /// Get the error message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            ClientError::Status { message, .. } => message.clone(),
            ClientError::Transport(msg) | ClientError::Protocol(msg) => msg.clone(),
            ClientError::Decode(err) => err.to_string(),
        }
    }

    pub fn is_status(&self) -> bool {
        matches!(self, ClientError::Status { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, ClientError::Decode(_))
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, ClientError::Protocol(_))
    }
}
