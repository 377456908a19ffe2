use std::io;
use std::io::Read;
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{error, trace};

use crate::buffer::io_control::ControlHandle;
use crate::buffer::{BufferMode, ContentDecoder, IoControl};
use crate::ensure;
use crate::protocol::HttpError;

#[derive(Debug)]
struct State {
    buffer: BytesMut,
    mode: BufferMode,
    end_of_stream: bool,
    shutdown: bool,
    error: Option<io::Error>,
}

/// Bounded buffer between the reactor thread receiving a body and an
/// application thread reading it.
///
/// The reactor fills it with [`consume_content`](Self::consume_content)
/// whenever the channel is readable and never blocks; the reader blocks
/// while the buffer is empty.
#[derive(Debug)]
pub struct SharedInputBuffer {
    state: Mutex<State>,
    condition: Condvar,
    capacity: usize,
    control: ControlHandle,
}

impl SharedInputBuffer {
    pub fn new<C: IoControl + Send + Sync + 'static>(capacity: usize, control: &Arc<C>) -> Result<Self, HttpError> {
        ensure!(capacity > 0, HttpError::illegal_usage("buffer capacity must be positive"));

        let state = State {
            buffer: BytesMut::with_capacity(capacity),
            mode: BufferMode::Filling,
            end_of_stream: false,
            shutdown: false,
            error: None,
        };
        Ok(Self { state: Mutex::new(state), condition: Condvar::new(), capacity, control: ControlHandle::new(control) })
    }

    /// Moves available bytes from `decoder` into the buffer. Called by the reactor only.
    ///
    /// Input interest is suspended while the buffer is full. Returns the
    /// number of bytes moved.
    pub fn consume_content<D: ContentDecoder + ?Sized>(&self, decoder: &mut D) -> io::Result<usize> {
        let mut state = self.state.lock();
        if state.shutdown {
            return Ok(0);
        }

        state.mode = BufferMode::Filling;
        let filled = state.buffer.len();
        let mut consumed = 0;
        if filled < self.capacity {
            state.buffer.resize(self.capacity, 0);
            let read = decoder.read(&mut state.buffer[filled..]);
            state.buffer.truncate(filled + read.as_ref().map_or(0, |n| *n));
            consumed = read?;
        }

        if decoder.is_completed() {
            state.end_of_stream = true;
        }

        trace!(consumed, buffered = state.buffer.len(), end_of_stream = state.end_of_stream, "consumed content");
        self.condition.notify_all();

        if state.buffer.len() >= self.capacity && !state.end_of_stream {
            self.control.hint(&mut state, |control| control.suspend_input())?;

            // the reader may have made room while the hint was in flight
            if !state.shutdown && state.buffer.len() < self.capacity {
                self.control.hint(&mut state, |control| control.request_input())?;
            }
        }
        Ok(consumed)
    }

    /// Reads buffered bytes into `dst`, blocking while the buffer is empty.
    ///
    /// Returns `0` at the end of the content and once the buffer is shut down;
    /// an error recorded by the shutdown is returned to the first read that
    /// observes it.
    pub fn read(&self, dst: &mut [u8]) -> io::Result<usize> {
        if dst.is_empty() {
            return Ok(0);
        }

        let mut state = self.state.lock();
        self.wait_for_data(&mut state)?;
        if state.shutdown {
            return state.error.take().map_or(Ok(0), Err);
        }
        if state.buffer.is_empty() {
            return Ok(0);
        }

        state.mode = BufferMode::Draining;
        let n = dst.len().min(state.buffer.len());
        dst[..n].copy_from_slice(&state.buffer[..n]);
        state.buffer.advance(n);
        Ok(n)
    }

    /// Stops reading, same as a shutdown without error.
    pub fn close(&self) {
        self.shutdown(None);
    }

    /// Terminates the buffer, waking every waiting reader.
    ///
    /// `error`, if any, is reported once to the reader. Only the first
    /// shutdown has an effect.
    pub fn shutdown(&self, error: Option<io::Error>) {
        let mut state = self.state.lock();
        if state.shutdown {
            return;
        }

        if let Some(e) = &error {
            error!(cause = %e, "shutdown input buffer");
        }
        state.shutdown = true;
        state.error = error;
        state.buffer.clear();
        self.condition.notify_all();
    }

    /// Clears content and end of stream so the buffer can carry the next message.
    pub fn reset(&self) -> Result<(), HttpError> {
        let mut state = self.state.lock();
        ensure!(!state.shutdown, HttpError::illegal_usage("reset of shut down input buffer"));

        state.buffer.clear();
        state.mode = BufferMode::Filling;
        state.end_of_stream = false;
        Ok(())
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().buffer.is_empty()
    }

    pub fn mode(&self) -> BufferMode {
        self.state.lock().mode
    }

    /// Returns true when nothing more can be read
    pub fn is_end_of_stream(&self) -> bool {
        let state = self.state.lock();
        state.shutdown || (state.end_of_stream && state.buffer.is_empty())
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    fn wait_for_data(&self, state: &mut MutexGuard<'_, State>) -> io::Result<()> {
        while state.buffer.is_empty() && !state.end_of_stream && !state.shutdown {
            self.control.hint(state, |control| control.request_input())?;
            if !state.buffer.is_empty() || state.end_of_stream || state.shutdown {
                break;
            }
            self.condition.wait(state);
        }
        Ok(())
    }
}

impl Read for SharedInputBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        SharedInputBuffer::read(self, buf)
    }
}

impl Read for &SharedInputBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        SharedInputBuffer::read(self, buf)
    }
}
