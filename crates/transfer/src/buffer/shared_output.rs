use std::io;
use std::io::{ErrorKind, Write};
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{error, trace, warn};

use crate::buffer::io_control::ControlHandle;
use crate::buffer::{BufferMode, ContentEncoder, IoControl};
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

/// Bounded buffer between an application thread writing a body and the
/// reactor thread moving it to the channel.
///
/// The writer blocks while the buffer is full. The reactor drains it with
/// [`produce_content`](Self::produce_content) whenever the channel is
/// writable and never blocks. Bytes reach the encoder in the order they were
/// written.
#[derive(Debug)]
pub struct SharedOutputBuffer {
    state: Mutex<State>,
    condition: Condvar,
    capacity: usize,
    control: ControlHandle,
}

impl SharedOutputBuffer {
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

    /// Appends all of `src`, blocking while the buffer is full.
    ///
    /// Once the buffer is shut down writes are dropped; an error recorded by
    /// the shutdown is returned to the first write that observes it.
    pub fn write(&self, src: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        if state.shutdown {
            return Self::take_error(&mut state, src.len());
        }
        if state.end_of_stream {
            return Err(io::Error::new(ErrorKind::BrokenPipe, "write to closed output buffer"));
        }

        state.mode = BufferMode::Filling;
        let mut remaining = src;
        while !remaining.is_empty() {
            let available = self.capacity - state.buffer.len();
            if available == 0 {
                state.mode = BufferMode::Draining;
                self.wait_for_capacity(&mut state)?;
                if state.shutdown {
                    return Self::take_error(&mut state, src.len());
                }
                state.mode = BufferMode::Filling;
                continue;
            }

            let n = available.min(remaining.len());
            state.buffer.extend_from_slice(&remaining[..n]);
            remaining = &remaining[n..];
        }

        trace!(len = src.len(), buffered = state.buffer.len(), "buffered output");
        Ok(src.len())
    }

    /// Asks the reactor to drain the buffer, without waiting for it.
    pub fn flush(&self) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.shutdown || state.buffer.is_empty() {
            return Ok(());
        }
        self.control.hint(&mut state, |control| control.request_output())
    }

    /// Marks the end of the content. The reactor is asked for one more drain
    /// pass, which completes the encoder once the buffer is empty.
    pub fn write_completed(&self) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.shutdown || state.end_of_stream {
            return Ok(());
        }

        state.end_of_stream = true;
        trace!(buffered = state.buffer.len(), "output end of stream");
        self.control.hint(&mut state, |control| control.request_output())
    }

    /// Same as [`write_completed`](Self::write_completed).
    pub fn close(&self) -> io::Result<()> {
        self.write_completed()
    }

    /// Moves buffered bytes into `encoder`. Called by the reactor only.
    ///
    /// Completes the encoder once the buffer is drained after the end of
    /// stream. When the buffer runs empty before that, output interest is
    /// suspended until the writer has more. Returns the number of bytes moved.
    pub fn produce_content<E: ContentEncoder + ?Sized>(&self, encoder: &mut E) -> io::Result<usize> {
        let mut state = self.state.lock();
        if state.shutdown {
            return Ok(0);
        }

        state.mode = BufferMode::Draining;
        let mut written = 0;
        if !state.buffer.is_empty() {
            written = encoder.write(&state.buffer)?;
            state.buffer.advance(written);
        }

        let drained = state.buffer.is_empty();
        if drained && state.end_of_stream && !encoder.is_completed() {
            encoder.complete()?;
        }

        trace!(written, buffered = state.buffer.len(), "produced content");
        self.condition.notify_all();

        if drained && !state.end_of_stream {
            self.control.hint(&mut state, |control| control.suspend_output())?;

            // the writer may have refilled the buffer while the hint was in flight
            if !state.shutdown && (!state.buffer.is_empty() || state.end_of_stream) {
                self.control.hint(&mut state, |control| control.request_output())?;
            }
        }
        Ok(written)
    }

    /// Terminates the buffer, waking every waiting writer.
    ///
    /// `error`, if any, is reported once to the writer. Only the first
    /// shutdown has an effect.
    pub fn shutdown(&self, error: Option<io::Error>) {
        let mut state = self.state.lock();
        if state.shutdown {
            return;
        }

        if let Some(e) = &error {
            error!(cause = %e, "shutdown output buffer");
        }
        state.shutdown = true;
        state.error = error;
        state.buffer.clear();
        self.condition.notify_all();
    }

    /// Clears content and end of stream so the buffer can carry the next message.
    pub fn reset(&self) -> Result<(), HttpError> {
        let mut state = self.state.lock();
        ensure!(!state.shutdown, HttpError::illegal_usage("reset of shut down output buffer"));

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

    pub fn available(&self) -> usize {
        self.capacity - self.len()
    }

    pub fn mode(&self) -> BufferMode {
        self.state.lock().mode
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.state.lock().end_of_stream
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    fn wait_for_capacity(&self, state: &mut MutexGuard<'_, State>) -> io::Result<()> {
        while state.buffer.len() >= self.capacity && !state.shutdown {
            self.control.hint(state, |control| control.request_output())?;
            if state.buffer.len() < self.capacity || state.shutdown {
                break;
            }
            self.condition.wait(state);
        }
        Ok(())
    }

    fn take_error(state: &mut State, len: usize) -> io::Result<usize> {
        match state.error.take() {
            Some(e) => Err(e),
            None => {
                warn!(len, "drop write to shut down output buffer");
                Ok(len)
            }
        }
    }
}

impl Write for SharedOutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        SharedOutputBuffer::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        SharedOutputBuffer::flush(self)
    }
}

impl Write for &SharedOutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        SharedOutputBuffer::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        SharedOutputBuffer::flush(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{FramedContentEncoder, MockIoControl};
    use crate::codec::PayloadEncoder;
    use std::thread;
    use std::time::Duration;

    fn lenient_control() -> Arc<MockIoControl> {
        let mut control = MockIoControl::new();
        control.expect_request_output().return_const(());
        control.expect_suspend_output().return_const(());
        Arc::new(control)
    }

    #[test]
    fn zero_capacity_is_illegal() {
        let control = lenient_control();
        assert!(matches!(SharedOutputBuffer::new(0, &control), Err(HttpError::IllegalUsage { .. })));
    }

    #[test]
    fn blocked_writer_resumes_after_drain_without_loss() {
        let control = lenient_control();
        let buffer = Arc::new(SharedOutputBuffer::new(16, &control).unwrap());
        let data: Vec<u8> = (0..200_u8).collect();

        let writer = {
            let buffer = Arc::clone(&buffer);
            let data = data.clone();
            thread::spawn(move || {
                buffer.write(&data).unwrap();
                buffer.write_completed().unwrap();
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!writer.is_finished());
        assert_eq!(buffer.len(), buffer.capacity());
        assert_eq!(buffer.mode(), BufferMode::Draining);

        let mut encoder = FramedContentEncoder::new(PayloadEncoder::identity(), 7).unwrap();
        let mut received = Vec::new();
        while !encoder.is_completed() {
            buffer.produce_content(&mut encoder).unwrap();
            received.extend_from_slice(&encoder.take_pending());
            thread::yield_now();
        }

        writer.join().unwrap();
        assert_eq!(received, data);
        assert_eq!(buffer.mode(), BufferMode::Draining);
    }

    #[test]
    fn shutdown_error_reaches_blocked_writer_once() {
        let control = lenient_control();
        let buffer = Arc::new(SharedOutputBuffer::new(4, &control).unwrap());

        let writer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || buffer.write(b"more than four bytes"))
        };

        thread::sleep(Duration::from_millis(50));
        buffer.shutdown(Some(io::Error::new(ErrorKind::ConnectionReset, "connection reset by peer")));
        buffer.shutdown(Some(io::Error::other("second shutdown is ignored")));

        let error = writer.join().unwrap().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ConnectionReset);

        assert_eq!(buffer.write(b"late").unwrap(), 4);
        assert!(buffer.is_shutdown());
        assert!(buffer.is_empty());
    }

    #[test]
    fn shutdown_without_error_turns_writes_into_no_ops() {
        let control = lenient_control();
        let buffer = SharedOutputBuffer::new(8, &control).unwrap();

        buffer.shutdown(None);
        assert_eq!(buffer.write(b"dropped").unwrap(), 7);
        assert!(buffer.is_empty());

        let mut encoder = FramedContentEncoder::new(PayloadEncoder::identity(), 8).unwrap();
        assert_eq!(buffer.produce_content(&mut encoder).unwrap(), 0);
        assert!(matches!(buffer.reset(), Err(HttpError::IllegalUsage { .. })));
    }

    #[test]
    fn write_after_close_is_broken_pipe() {
        let control = lenient_control();
        let buffer = SharedOutputBuffer::new(8, &control).unwrap();

        buffer.close().unwrap();
        assert!(buffer.is_end_of_stream());
        assert_eq!(buffer.write(b"late").unwrap_err().kind(), ErrorKind::BrokenPipe);

        buffer.reset().unwrap();
        assert!(!buffer.is_end_of_stream());
        assert_eq!(buffer.write(b"next").unwrap(), 4);
    }

    #[test]
    fn empty_buffer_suspends_output() {
        let mut control = MockIoControl::new();
        control.expect_suspend_output().times(1).return_const(());
        control.expect_request_output().never();
        let control = Arc::new(control);

        let buffer = SharedOutputBuffer::new(8, &control).unwrap();
        let mut encoder = FramedContentEncoder::new(PayloadEncoder::identity(), 8).unwrap();

        assert_eq!(buffer.produce_content(&mut encoder).unwrap(), 0);
        assert!(!encoder.is_completed());
    }

    #[test]
    fn end_of_stream_requests_output_then_completes_encoder() {
        let mut control = MockIoControl::new();
        control.expect_request_output().times(2).return_const(());
        control.expect_suspend_output().never();
        let control = Arc::new(control);

        let buffer = SharedOutputBuffer::new(8, &control).unwrap();
        let mut encoder = FramedContentEncoder::new(PayloadEncoder::chunked(), 64).unwrap();

        buffer.write(b"abc").unwrap();
        buffer.flush().unwrap();
        buffer.write_completed().unwrap();
        buffer.write_completed().unwrap();

        assert_eq!(buffer.produce_content(&mut encoder).unwrap(), 3);
        assert!(encoder.is_completed());
        assert_eq!(encoder.pending(), b"3\r\nabc\r\n0\r\n\r\n");
    }

    #[test]
    fn dropped_control_fails_blocked_writer() {
        let control = lenient_control();
        let buffer = SharedOutputBuffer::new(2, &control).unwrap();
        drop(control);

        assert_eq!(buffer.write(b"abc").unwrap_err().kind(), ErrorKind::NotConnected);
    }

    /// Drains the buffer from inside the readiness hint, on the writer's thread.
    #[derive(Default)]
    struct InlineReactor {
        buffer: Mutex<std::sync::Weak<SharedOutputBuffer>>,
        sink: Mutex<Vec<u8>>,
    }

    impl IoControl for InlineReactor {
        fn request_input(&self) {}

        fn suspend_input(&self) {}

        fn request_output(&self) {
            let Some(buffer) = self.buffer.lock().upgrade() else { return };
            let mut encoder = FramedContentEncoder::new(PayloadEncoder::identity(), 3).unwrap();
            while buffer.produce_content(&mut encoder).unwrap() > 0 {
                self.sink.lock().extend_from_slice(&encoder.take_pending());
            }
        }

        fn suspend_output(&self) {}
    }

    #[test]
    fn reentrant_hint_does_not_deadlock() {
        let reactor = Arc::new(InlineReactor::default());
        let buffer = Arc::new(SharedOutputBuffer::new(4, &reactor).unwrap());
        *reactor.buffer.lock() = Arc::downgrade(&buffer);

        buffer.write(b"0123456789").unwrap();
        buffer.write_completed().unwrap();

        assert_eq!(reactor.sink.lock().as_slice(), b"0123456789");
    }
}
