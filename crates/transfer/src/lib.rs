//! The HTTP/1.1 message transfer engine
//!
//! This crate moves HTTP message bodies between a message and a byte stream. It decides how
//! a body is framed on the wire, wraps the stream in the codec enforcing that framing, and
//! lets an application thread exchange body bytes with a non-blocking reactor through
//! bounded shared buffers.
//!
//! # Features
//!
//! - Framing decisions from `Transfer-Encoding` and `Content-Length` (RFC 7230 precedence)
//! - Chunked, fixed-length and identity (read until close) body codecs
//! - Blocking transport over `std::io` and async transport over tokio
//! - Shared input/output buffers driven by an external reactor
//! - Keep-alive decisions
//!
//! # Example
//!
//! ```
//! use std::io::Read;
//!
//! use http::{Request, header};
//! use micro_transfer::entity::{EntityDeserializer, EntitySerializer};
//! use micro_transfer::protocol::Entity;
//!
//! let request = Request::builder()
//!     .header(header::TRANSFER_ENCODING, "chunked")
//!     .body(())
//!     .unwrap();
//!
//! let mut wire = Vec::new();
//! EntitySerializer::new()
//!     .serialize(&mut wire, &request, &mut Entity::from_bytes("hello"))
//!     .unwrap();
//! assert_eq!(wire, b"5\r\nhello\r\n0\r\n\r\n");
//!
//! let mut entity = EntityDeserializer::new().deserialize(wire.as_slice(), &request).unwrap();
//! assert!(entity.is_chunked());
//!
//! let mut body = String::new();
//! entity.read_to_string(&mut body).unwrap();
//! assert_eq!(body, "hello");
//! ```
//!
//! # Architecture
//!
//! The crate is organized into several key modules:
//!
//! - [`protocol`]: Framing decisions, entities and errors
//! - [`codec`]: Content-length strategies and body codecs
//! - [`entity`]: Serializer and deserializer binding entities to streams
//! - [`buffer`]: Shared buffers between an application thread and a reactor
//! - [`connection`]: Connection reuse decisions
//! - [`config`]: Buffer and chunk sizing
//!
//! # Error Handling
//!
//! Every fallible operation returns [`protocol::HttpError`]: a framing violation, an I/O
//! failure of the underlying stream or buffer, or an illegal use of the API. None of them
//! leave the connection fit for reuse.

pub mod buffer;
pub mod codec;
pub mod config;
pub mod connection;
pub mod entity;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
