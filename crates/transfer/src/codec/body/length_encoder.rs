use crate::protocol::{HttpError, PayloadItem, ProtocolError};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::warn;

/// Encodes exactly `length` body bytes.
///
/// A chunk that would go past the declared length is rejected before anything
/// is written, ending the body early is reported as
/// [`ProtocolError::IncompleteBody`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    length: u64,
    remaining: u64,
    eof: bool,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { length, remaining: length, eof: false }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }

    #[inline]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = HttpError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(bytes) => {
                if !bytes.has_remaining() {
                    return Ok(());
                }

                if self.eof {
                    warn!("encode payload_item but no need to encode anymore");
                    return Ok(());
                }

                let size = bytes.remaining() as u64;
                if size > self.remaining {
                    let written = self.length - self.remaining;
                    return Err(ProtocolError::LengthExceeded { declared: self.length, attempted: written + size }.into());
                }

                dst.put(bytes);
                self.remaining -= size;
                Ok(())
            }
            PayloadItem::Eof => {
                if self.eof {
                    return Ok(());
                }
                self.eof = true;

                if self.remaining > 0 {
                    return Err(ProtocolError::IncompleteBody { declared: self.length, written: self.length - self.remaining }.into());
                }
                Ok(())
            }
        }
    }
}
