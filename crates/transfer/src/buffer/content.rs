//! Reactor side channel abstractions.
//!
//! A [`ContentEncoder`] accepts as many bytes as the channel can take right
//! now, a [`ContentDecoder`] hands out whatever the channel has right now.
//! Neither ever blocks.

use std::io;

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::codec::{PayloadDecoder, PayloadEncoder};
use crate::ensure;
use crate::protocol::{HttpError, PayloadItem};

/// Non-blocking sink for body bytes.
pub trait ContentEncoder {
    /// Writes a prefix of `src`, returns how many bytes were taken; `0` when the
    /// channel is full.
    fn write(&mut self, src: &[u8]) -> io::Result<usize>;

    /// Ends the content. No write is accepted afterwards.
    fn complete(&mut self) -> io::Result<()>;

    fn is_completed(&self) -> bool;
}

/// Non-blocking source of body bytes.
pub trait ContentDecoder {
    /// Reads into `dst`, returns how many bytes were filled; `0` when nothing is
    /// available right now or the content has ended.
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize>;

    /// Returns true once every byte of the content has been read
    fn is_completed(&self) -> bool;
}

/// A [`ContentEncoder`] framing bytes with a [`PayloadEncoder`] into a bounded
/// session buffer.
///
/// The reactor moves the framed bytes from the session to the socket with
/// [`pending`](Self::pending) and [`advance`](Self::advance). Writes are
/// refused while the session holds `limit` bytes or more.
#[derive(Debug)]
pub struct FramedContentEncoder {
    encoder: PayloadEncoder,
    session: BytesMut,
    limit: usize,
    completed: bool,
}

impl FramedContentEncoder {
    pub fn new(encoder: PayloadEncoder, limit: usize) -> Result<Self, HttpError> {
        ensure!(limit > 0, HttpError::illegal_usage("session buffer limit must be positive"));
        Ok(Self { encoder, session: BytesMut::with_capacity(limit), limit, completed: false })
    }

    /// Framed bytes not yet moved to the channel
    pub fn pending(&self) -> &[u8] {
        &self.session
    }

    /// Marks `n` pending bytes as moved to the channel
    pub fn advance(&mut self, n: usize) {
        self.session.advance(n.min(self.session.len()));
    }

    /// Takes all pending bytes
    pub fn take_pending(&mut self) -> Bytes {
        self.session.split().freeze()
    }
}

impl ContentEncoder for FramedContentEncoder {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        if self.completed {
            return Err(HttpError::illegal_usage("content encoding already completed").into());
        }

        let available = self.limit.saturating_sub(self.session.len());
        let n = available.min(src.len());
        if n == 0 {
            return Ok(0);
        }

        self.encoder.encode(PayloadItem::Chunk(&src[..n]), &mut self.session)?;
        trace!(len = n, pending = self.session.len(), "encoded content");
        Ok(n)
    }

    fn complete(&mut self) -> io::Result<()> {
        if self.completed {
            return Ok(());
        }

        self.encoder.encode(PayloadItem::<Bytes>::Eof, &mut self.session)?;
        self.completed = true;
        Ok(())
    }

    fn is_completed(&self) -> bool {
        self.completed
    }
}

/// A [`ContentDecoder`] unframing bytes fed by the reactor with a [`PayloadDecoder`].
///
/// The reactor [`feed`](Self::feed)s what it reads from the socket and calls
/// [`close_input`](Self::close_input) when the socket reaches end of stream.
#[derive(Debug)]
pub struct FramedContentDecoder {
    decoder: PayloadDecoder,
    input: BytesMut,
    current: Bytes,
    input_closed: bool,
    completed: bool,
    error: Option<io::Error>,
}

impl FramedContentDecoder {
    pub fn new(decoder: PayloadDecoder) -> Self {
        Self { decoder, input: BytesMut::new(), current: Bytes::new(), input_closed: false, completed: false, error: None }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.input.extend_from_slice(bytes);
    }

    pub fn close_input(&mut self) {
        self.input_closed = true;
    }

    /// Returns the bytes fed past the end of the content
    pub fn into_remaining(self) -> BytesMut {
        self.input
    }
}

impl ContentDecoder for FramedContentDecoder {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }

        let mut filled = 0;
        while filled < dst.len() {
            if !self.current.is_empty() {
                let n = self.current.len().min(dst.len() - filled);
                dst[filled..filled + n].copy_from_slice(&self.current[..n]);
                self.current.advance(n);
                filled += n;
                continue;
            }
            if self.completed {
                break;
            }

            let result = if self.input_closed {
                self.decoder.decode_eof(&mut self.input)
            } else {
                self.decoder.decode(&mut self.input)
            };

            // hand out what was decoded before the failure, report it on the next read
            let item = match result {
                Ok(item) => item,
                Err(e) if filled > 0 => {
                    self.error = Some(e.into());
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            match item {
                Some(PayloadItem::Chunk(bytes)) => self.current = bytes,
                Some(PayloadItem::Eof) => self.completed = true,
                None if self.input_closed => self.completed = true,
                None => break,
            }
        }
        Ok(filled)
    }

    fn is_completed(&self) -> bool {
        self.completed && self.current.is_empty()
    }
}
