use std::io;
use std::io::Write;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Encoder;
use tracing::trace;

use crate::codec::PayloadEncoder;
use crate::config::DEFAULT_WRITE_BUFFER_SIZE;
use crate::protocol::PayloadItem;

/// A blocking transmitter wrapped in a body codec.
///
/// Bytes written are framed by the [`PayloadEncoder`] into an internal buffer
/// that is pushed to the transmitter once it holds `buffer_size` bytes, on
/// [`flush`](Write::flush) and on [`close`](EntityWriter::close).
#[derive(Debug)]
pub struct EntityWriter<W> {
    transmitter: W,
    encoder: PayloadEncoder,
    buffer: BytesMut,
    buffer_size: usize,
    closed: bool,
}

impl<W: Write> EntityWriter<W> {
    pub fn new(transmitter: W, encoder: PayloadEncoder) -> Self {
        Self::with_capacity(transmitter, encoder, DEFAULT_WRITE_BUFFER_SIZE)
    }

    pub fn with_capacity(transmitter: W, encoder: PayloadEncoder, buffer_size: usize) -> Self {
        Self { transmitter, encoder, buffer: BytesMut::with_capacity(buffer_size), buffer_size, closed: false }
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        self.encoder.is_chunked()
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[inline]
    pub fn get_ref(&self) -> &W {
        &self.transmitter
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.transmitter
    }

    /// Ends the body: writes the terminal framing, if any, and flushes.
    ///
    /// Closing more than once is a no-op, the terminal framing is emitted at
    /// most once.
    pub fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.encoder.encode(PayloadItem::<Bytes>::Eof, &mut self.buffer)?;
        self.flush_buffer()?;
        self.transmitter.flush()
    }

    /// Closes the body and hands back the transmitter
    pub fn finish(mut self) -> io::Result<W> {
        self.close()?;
        Ok(self.transmitter)
    }

    fn flush_buffer(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        trace!(len = self.buffer.len(), "flush encoded body bytes");
        self.transmitter.write_all(&self.buffer)?;
        self.buffer.clear();
        Ok(())
    }
}

impl<W: Write> Write for EntityWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::other("attempted write to closed entity stream"));
        }

        if buf.is_empty() {
            return Ok(0);
        }

        self.encoder.encode(PayloadItem::Chunk(buf), &mut self.buffer)?;
        if self.buffer.len() >= self.buffer_size {
            self.flush_buffer()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_buffer()?;
        self.transmitter.flush()
    }
}
