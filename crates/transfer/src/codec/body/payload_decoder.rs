//! Decoder implementation for HTTP message payloads.
//!
//! This module provides a unified decoder for handling different types of HTTP message bodies:
//! - Content-Length based payloads
//! - Chunked transfer encoding
//! - Bodies delimited by the end of the connection
//!
//! The decoding strategy is picked from a [`FramingDecision`].

use crate::codec::body::chunked_decoder::ChunkedDecoder;
use crate::codec::body::identity_decoder::IdentityDecoder;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::protocol::{FramingDecision, HttpError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// A unified decoder for handling HTTP message payloads.
///
/// Once [`PayloadItem::Eof`] has been produced the decoder is finished and
/// yields nothing more; whatever follows in the buffer belongs to the next
/// message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    /// The specific decoding strategy to use
    kind: Kind,
    finished: bool,
}

/// Enum representing different payload decoding strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    /// Decode payload with a fixed content length
    Length(LengthDecoder),

    /// Decode payload using chunked transfer encoding
    Chunked(ChunkedDecoder),

    /// Pass bytes through until the receiver ends
    Identity(IdentityDecoder),
}

impl PayloadDecoder {
    /// Creates a PayloadDecoder for chunked transfer encoding.
    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedDecoder::new()), finished: false }
    }

    /// Creates a PayloadDecoder for a fixed-length payload.
    ///
    /// # Arguments
    /// * `size` - The expected content length in bytes
    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(size)), finished: false }
    }

    /// Creates a PayloadDecoder reading until the end of the stream.
    pub fn identity() -> Self {
        Self { kind: Kind::Identity(IdentityDecoder), finished: false }
    }

    /// Returns whether this decoder handles chunked transfer encoding.
    pub fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked(_))
    }

    /// Returns whether this decoder handles fixed-length payloads.
    pub fn is_fix_length(&self) -> bool {
        matches!(self.kind, Kind::Length(_))
    }

    /// Returns whether this decoder reads until the end of the stream.
    pub fn is_identity(&self) -> bool {
        matches!(self.kind, Kind::Identity(_))
    }

    /// Returns true once the end of the payload has been decoded.
    pub fn is_finish(&self) -> bool {
        self.finished
    }

    /// Upper bound of the bytes still belonging to this payload, if known.
    ///
    /// Readers use it to avoid pulling bytes of the next message off the wire.
    pub fn remaining_hint(&self) -> Option<u64> {
        match &self.kind {
            _ if self.finished => Some(0),
            Kind::Length(decoder) => Some(decoder.remaining()),
            Kind::Chunked(_) | Kind::Identity(_) => None,
        }
    }

    fn track(&mut self, item: Option<PayloadItem>) -> Option<PayloadItem> {
        if item.as_ref().is_some_and(PayloadItem::is_eof) {
            self.finished = true;
        }
        item
    }
}

impl From<FramingDecision> for PayloadDecoder {
    fn from(decision: FramingDecision) -> Self {
        match decision {
            FramingDecision::Length(length) => PayloadDecoder::fix_length(length),
            FramingDecision::Chunked => PayloadDecoder::chunked(),
            FramingDecision::Identity => PayloadDecoder::identity(),
        }
    }
}

/// Delegates to the appropriate decoder based on the payload type.
impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = HttpError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.finished {
            return Ok(None);
        }

        let item = match &mut self.kind {
            Kind::Length(length_decoder) => length_decoder.decode(src)?,
            Kind::Chunked(chunked_decoder) => chunked_decoder.decode(src)?,
            Kind::Identity(identity_decoder) => identity_decoder.decode(src)?,
        };
        Ok(self.track(item))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.finished {
            return Ok(None);
        }

        let item = match &mut self.kind {
            Kind::Length(length_decoder) => length_decoder.decode_eof(src)?,
            Kind::Chunked(chunked_decoder) => chunked_decoder.decode_eof(src)?,
            Kind::Identity(identity_decoder) => identity_decoder.decode_eof(src)?,
        };
        Ok(self.track(item))
    }
}
