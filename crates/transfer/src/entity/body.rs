use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use http_body::{Body, Frame, SizeHint};
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tracing::{error, trace};

use crate::codec::PayloadDecoder;
use crate::protocol::{FramingDecision, HttpError, PayloadItem};

/// An async receiver wrapped in a body codec, exposed as an [`http_body::Body`].
///
/// Frames are decoded lazily as the body is polled. The body ends at the end
/// of the payload, not at the end of the receiver, so the receiver can carry
/// the next message afterwards (see [`into_parts`](EntityBody::into_parts)).
#[derive(Debug)]
pub struct EntityBody<R> {
    framed: FramedRead<R, PayloadDecoder>,
    decision: FramingDecision,
    done: bool,
}

impl<R: AsyncRead + Unpin> EntityBody<R> {
    pub fn new(receiver: R, decision: FramingDecision, read_buffer_size: usize) -> Self {
        Self { framed: FramedRead::with_capacity(receiver, PayloadDecoder::from(decision), read_buffer_size), decision, done: false }
    }

    /// `read_buf` holds bytes already taken off the receiver that belong to this body
    pub fn with_buffer(receiver: R, decision: FramingDecision, read_buf: BytesMut, read_buffer_size: usize) -> Self {
        let mut body = Self::new(receiver, decision, read_buffer_size);
        body.framed.read_buffer_mut().extend_from_slice(&read_buf);
        body
    }

    #[inline]
    pub fn framing(&self) -> FramingDecision {
        self.decision
    }

    /// Returns the receiver and any bytes read past the end of this body
    pub fn into_parts(self) -> (R, BytesMut) {
        let parts = self.framed.into_parts();
        (parts.io, parts.read_buf)
    }
}

impl<R: AsyncRead + Unpin> Body for EntityBody<R> {
    type Data = Bytes;
    type Error = HttpError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        match ready!(this.framed.poll_next_unpin(cx)) {
            Some(Ok(PayloadItem::Chunk(bytes))) => {
                trace!(len = bytes.len(), "receive body frame");
                Poll::Ready(Some(Ok(Frame::data(bytes))))
            }
            Some(Ok(PayloadItem::Eof)) | None => {
                this.done = true;
                Poll::Ready(None)
            }
            Some(Err(e)) => {
                error!(cause = %e, "failed to decode body");
                this.done = true;
                Poll::Ready(Some(Err(e)))
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.done
    }

    fn size_hint(&self) -> SizeHint {
        self.decision.into()
    }
}

impl From<FramingDecision> for SizeHint {
    fn from(decision: FramingDecision) -> Self {
        match decision {
            FramingDecision::Length(length) => SizeHint::with_exact(length),
            FramingDecision::Chunked | FramingDecision::Identity => SizeHint::new(),
        }
    }
}
