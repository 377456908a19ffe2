//! HTTP body codecs, one per framing mode.
//!
//! # Components
//!
//! ## Decoders
//! - `ChunkedDecoder`: Handles chunked transfer encoded payloads
//! - `LengthDecoder`: Processes fixed-length payloads
//! - `IdentityDecoder`: Reads until the receiver ends
//! - [`PayloadDecoder`]: Main decoder that coordinates different decoding strategies
//!
//! ## Encoders
//! - `ChunkedEncoder`: Implements chunked transfer encoding
//! - `LengthEncoder`: Handles fixed-length payload encoding
//! - [`PayloadEncoder`]: Main encoder that manages different encoding strategies
//!
//! All of them are [`tokio_util::codec`] state machines over `BytesMut`, so
//! the same code serves the blocking streams, the async framed transport and
//! the reactor side of the shared buffers.

mod chunked_decoder;
mod chunked_encoder;
mod identity_decoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
