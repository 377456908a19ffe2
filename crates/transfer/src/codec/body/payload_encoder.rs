use crate::codec::body::chunked_encoder::ChunkedEncoder;
use crate::codec::body::length_encoder::LengthEncoder;
use crate::config::DEFAULT_MAX_CHUNK_SIZE;
use crate::protocol::{FramingDecision, HttpError, PayloadItem};
use bytes::{Buf, BufMut, BytesMut};

use tokio_util::codec::Encoder;

/// encode payload for a message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEncoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    /// content-length payload
    Length(LengthEncoder),

    /// transfer-encoding chunked payload
    Chunked(ChunkedEncoder),

    /// payload delimited by closing the connection, `true` once ended
    Identity(bool),
}

impl PayloadEncoder {
    /// create a chunked `PayloadEncoder`
    pub fn chunked() -> Self {
        Self::chunked_with_max_size(DEFAULT_MAX_CHUNK_SIZE)
    }

    /// create a chunked `PayloadEncoder` emitting chunks of at most `max_chunk_size` bytes
    pub fn chunked_with_max_size(max_chunk_size: usize) -> Self {
        Self { kind: Kind::Chunked(ChunkedEncoder::with_max_chunk_size(max_chunk_size)) }
    }

    /// create a fixed length `PayloadEncoder`
    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthEncoder::new(size)) }
    }

    /// create a pass-through `PayloadEncoder`
    pub fn identity() -> Self {
        Self { kind: Kind::Identity(false) }
    }

    /// create the encoder matching `decision`
    pub fn from_decision(decision: FramingDecision, max_chunk_size: usize) -> Self {
        match decision {
            FramingDecision::Length(size) => Self::fix_length(size),
            FramingDecision::Chunked => Self::chunked_with_max_size(max_chunk_size),
            FramingDecision::Identity => Self::identity(),
        }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked(_))
    }

    pub fn is_fix_length(&self) -> bool {
        matches!(self.kind, Kind::Length(_))
    }

    pub fn is_identity(&self) -> bool {
        matches!(self.kind, Kind::Identity(_))
    }

    pub fn is_finish(&self) -> bool {
        match &self.kind {
            Kind::Length(encoder) => encoder.is_finish(),
            Kind::Chunked(encoder) => encoder.is_finish(),
            Kind::Identity(finished) => *finished,
        }
    }
}

impl From<FramingDecision> for PayloadEncoder {
    fn from(decision: FramingDecision) -> Self {
        Self::from_decision(decision, DEFAULT_MAX_CHUNK_SIZE)
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for PayloadEncoder {
    type Error = HttpError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match &mut self.kind {
            Kind::Length(encoder) => encoder.encode(item, dst),
            Kind::Chunked(encoder) => encoder.encode(item, dst),
            Kind::Identity(finished) => {
                match item {
                    PayloadItem::Chunk(_) if *finished => {}
                    PayloadItem::Chunk(bytes) => dst.put(bytes),
                    PayloadItem::Eof => *finished = true,
                }
                Ok(())
            }
        }
    }
}
