//! Body framing: from headers to a [`FramingDecision`](crate::protocol::FramingDecision),
//! and from a decision to the codec enforcing it.
//!
//! - [`ContentLengthStrategy`]: decides the framing of a message
//!   - [`StrictContentLengthStrategy`]: rejects ambiguous framing
//!   - [`LaxContentLengthStrategy`]: tolerant inbound variant
//! - [`PayloadEncoder`] / [`PayloadDecoder`]: chunked, fixed-length and identity codecs

pub mod body;
mod strategy;

pub use body::{PayloadDecoder, PayloadEncoder};
pub use strategy::{ContentLengthStrategy, LaxContentLengthStrategy, StrictContentLengthStrategy};
