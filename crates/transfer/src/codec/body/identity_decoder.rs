//! Decoder for bodies delimited by the end of the connection.

use crate::protocol::{HttpError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

/// Passes every received byte through; the body ends when the receiver does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityDecoder;

impl Decoder for IdentityDecoder {
    type Item = PayloadItem;
    type Error = HttpError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        trace!(len = src.len(), "read identity bytes");
        Ok(Some(PayloadItem::Chunk(src.split().freeze())))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(Some(PayloadItem::Eof));
        }
        self.decode(src)
    }
}
