use crate::config::DEFAULT_MAX_CHUNK_SIZE;
use crate::protocol::{HttpError, PayloadItem};
use bytes::{Buf, BufMut, BytesMut};
use std::io::Write;
use tokio_util::codec::Encoder;
use tracing::trace;

/// Encodes payload items as `<hex-size>\r\n<data>\r\n` chunks.
///
/// A chunk larger than `max_chunk_size` is split into several chunks. Empty
/// chunks are dropped, a zero-size chunk is the terminator and is only
/// written once, on [`PayloadItem::Eof`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedEncoder {
    eof: bool,
    max_chunk_size: usize,
    send_size: u64,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self::with_max_chunk_size(DEFAULT_MAX_CHUNK_SIZE)
    }

    pub fn with_max_chunk_size(max_chunk_size: usize) -> Self {
        Self { eof: false, max_chunk_size: max_chunk_size.max(1), send_size: 0 }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }

    /// Total number of data bytes encoded so far, framing excluded
    pub fn send_size(&self) -> u64 {
        self.send_size
    }
}

impl Default for ChunkedEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for ChunkedEncoder {
    type Error = HttpError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.eof {
            return Ok(());
        }

        match item {
            PayloadItem::Chunk(mut bytes) => {
                while bytes.has_remaining() {
                    let size = bytes.remaining().min(self.max_chunk_size);
                    write!(helper::Writer(dst), "{size:X}\r\n")?;
                    dst.reserve(size + 2);
                    dst.put((&mut bytes).take(size));
                    dst.extend_from_slice(b"\r\n");
                    self.send_size += size as u64;
                    trace!(size, "encoded chunk");
                }
                Ok(())
            }
            PayloadItem::Eof => {
                self.eof = true;
                dst.extend_from_slice(b"0\r\n\r\n");
                Ok(())
            }
        }
    }
}

mod helper {
    use bytes::{BufMut, BytesMut};
    use std::io;

    pub struct Writer<'a>(pub &'a mut BytesMut);

    impl io::Write for Writer<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.put_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
