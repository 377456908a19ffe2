use std::io;
use std::io::{ErrorKind, Read};

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::PayloadDecoder;
use crate::config::DEFAULT_READ_BUFFER_SIZE;
use crate::protocol::PayloadItem;

/// A blocking receiver wrapped in a body codec.
///
/// Body bytes are pulled from the receiver lazily, only when the caller
/// reads. A fixed-length body never reads past its declared end; for the
/// other framings any read-ahead is handed back by [`into_parts`](EntityReader::into_parts).
#[derive(Debug)]
pub struct EntityReader<R> {
    receiver: R,
    decoder: PayloadDecoder,
    read_buf: BytesMut,
    current: Bytes,
    read_size: usize,
    receiver_eof: bool,
    eof: bool,
    closed: bool,
}

impl<R: Read> EntityReader<R> {
    pub fn new(receiver: R, decoder: PayloadDecoder) -> Self {
        Self::with_buffer(receiver, decoder, BytesMut::new(), DEFAULT_READ_BUFFER_SIZE)
    }

    /// `read_buf` holds bytes already taken off the receiver that belong to this body
    pub fn with_buffer(receiver: R, decoder: PayloadDecoder, read_buf: BytesMut, read_size: usize) -> Self {
        Self {
            receiver,
            decoder,
            read_buf,
            current: Bytes::new(),
            read_size: read_size.max(1),
            receiver_eof: false,
            eof: false,
            closed: false,
        }
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        self.decoder.is_chunked()
    }

    /// Returns true once the end of the body has been reached
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.eof && self.current.is_empty()
    }

    #[inline]
    pub fn get_ref(&self) -> &R {
        &self.receiver
    }

    /// Stops reading the body.
    ///
    /// Fixed-length and chunked bodies are drained so the receiver is
    /// positioned at the next message; a body delimited by the end of the
    /// connection is left alone. Closing more than once is a no-op.
    pub fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }

        if !self.decoder.is_identity() {
            let mut skipped = 0_u64;
            while self.next_chunk()? {
                skipped += self.current.len() as u64;
                self.current.clear();
            }
            trace!(skipped, "drained unread body");
        }

        self.closed = true;
        self.current.clear();
        Ok(())
    }

    /// Returns the receiver and any bytes read past the end of this body
    pub fn into_parts(self) -> (R, BytesMut) {
        (self.receiver, self.read_buf)
    }

    /// Makes the next decoded chunk current, `false` at the end of the body.
    fn next_chunk(&mut self) -> io::Result<bool> {
        loop {
            if !self.current.is_empty() {
                return Ok(true);
            }
            if self.eof {
                return Ok(false);
            }

            let item = if self.receiver_eof {
                self.decoder.decode_eof(&mut self.read_buf)?
            } else {
                self.decoder.decode(&mut self.read_buf)?
            };

            match item {
                Some(PayloadItem::Chunk(bytes)) => self.current = bytes,
                Some(PayloadItem::Eof) => self.eof = true,
                None if self.receiver_eof => self.eof = true,
                None => self.fill_buf()?,
            }
        }
    }

    fn fill_buf(&mut self) -> io::Result<()> {
        let mut read_size = self.read_size;
        if let Some(remaining) = self.decoder.remaining_hint() {
            read_size = read_size.min(usize::try_from(remaining).unwrap_or(usize::MAX)).max(1);
        }

        let filled = self.read_buf.len();
        self.read_buf.resize(filled + read_size, 0);

        let result = loop {
            match self.receiver.read(&mut self.read_buf[filled..]) {
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                result => break result,
            }
        };

        let n = match result {
            Ok(n) => n,
            Err(e) => {
                self.read_buf.truncate(filled);
                return Err(e);
            }
        };

        self.read_buf.truncate(filled + n);
        if n == 0 {
            trace!("receiver reached end of stream");
            self.receiver_eof = true;
        }
        Ok(())
    }
}

impl<R: Read> Read for EntityReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed || buf.is_empty() || !self.next_chunk()? {
            return Ok(0);
        }

        let n = buf.len().min(self.current.len());
        buf[..n].copy_from_slice(&self.current[..n]);
        self.current.advance(n);
        Ok(n)
    }
}
