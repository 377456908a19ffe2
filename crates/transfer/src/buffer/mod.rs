//! Shared buffers for the non-blocking transport.
//!
//! An application thread and the reactor thread of a connection exchange body
//! bytes through a bounded buffer guarded by one mutex. The application side
//! blocks on a condition variable, the reactor side never blocks and steers
//! readiness through the connection's [`IoControl`]:
//!
//! - [`SharedOutputBuffer`]: application writes, reactor drains into a [`ContentEncoder`]
//! - [`SharedInputBuffer`]: reactor fills from a [`ContentDecoder`], application reads
//!
//! [`shutdown`](SharedOutputBuffer::shutdown) is the only way to cancel a
//! blocked application thread. Callers needing a timeout impose it themselves
//! and shut the buffer down when it expires.

mod content;
mod io_control;
mod shared_input;
mod shared_output;

pub use content::{ContentDecoder, ContentEncoder, FramedContentDecoder, FramedContentEncoder};
#[cfg(test)]
pub use io_control::MockIoControl;
pub use io_control::IoControl;
pub use shared_input::SharedInputBuffer;
pub use shared_output::SharedOutputBuffer;

/// Which side touched a shared buffer last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferMode {
    /// The producer is adding bytes
    Filling,
    /// The consumer is taking bytes
    Draining,
}
