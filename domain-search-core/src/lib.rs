//! Core wire types for the domain search gRPC-Web client.
//!
//! This crate provides the protocol pieces that do not depend on any
//! particular message shape:
//!
//! - [`varint`]: base-128 variable-length integers
//! - [`tag`]: field tags and wire types
//! - [`message`]: field reader/writer and the message traits
//! - [`envelope`]: gRPC-Web framing and the incremental frame parser
//! - [`trailer`]: trailer frame parsing
//! - [`error`]: status codes and decode errors

pub mod envelope;
pub mod error;
pub mod message;
pub mod tag;
pub mod trailer;
pub mod varint;

pub use envelope::*;
pub use error::*;
pub use message::*;
pub use tag::*;
pub use trailer::*;
pub use varint::*;
