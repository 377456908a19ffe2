//! HTTP entity representation.
//!
//! An [`Entity`] is a message body together with the metadata describing it:
//! declared length, chunked flag, content type and content encoding. The
//! content itself is any byte source: a blocking reader for the blocking
//! transport, an [`http_body::Body`] for the async one.

use std::io;
use std::io::Read;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use bytes::buf::Reader;
use http::HeaderValue;
use http_body::{Body, Frame, SizeHint};
use mime::Mime;

use crate::protocol::MessageBody;

/// Describes an entity independently of its content.
///
/// `content_length` is `None` when the length is unknown up front, that is
/// for chunked bodies and for bodies delimited by the end of the connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityMetadata {
    content_length: Option<u64>,
    chunked: bool,
    content_type: Option<HeaderValue>,
    content_encoding: Option<HeaderValue>,
}

impl EntityMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_length(mut self, content_length: Option<u64>) -> Self {
        self.content_length = content_length;
        self
    }

    pub fn with_chunked(mut self, chunked: bool) -> Self {
        self.chunked = chunked;
        self
    }

    pub fn with_content_type(mut self, content_type: Option<HeaderValue>) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn with_content_encoding(mut self, content_encoding: Option<HeaderValue>) -> Self {
        self.content_encoding = content_encoding;
        self
    }

    #[inline]
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    #[inline]
    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.content_type.as_ref()
    }

    #[inline]
    pub fn content_encoding(&self) -> Option<&HeaderValue> {
        self.content_encoding.as_ref()
    }

    /// Parses the content type, `None` if absent or not a valid media type
    pub fn mime_type(&self) -> Option<Mime> {
        self.content_type.as_ref()?.to_str().ok()?.parse().ok()
    }
}

/// A message body and its metadata.
#[derive(Debug)]
pub struct Entity<T> {
    metadata: EntityMetadata,
    content: T,
}

impl<T> Entity<T> {
    pub fn new(metadata: EntityMetadata, content: T) -> Self {
        Self { metadata, content }
    }

    #[inline]
    pub fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    #[inline]
    pub fn metadata_mut(&mut self) -> &mut EntityMetadata {
        &mut self.metadata
    }

    #[inline]
    pub fn content_length(&self) -> Option<u64> {
        self.metadata.content_length
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        self.metadata.chunked
    }

    #[inline]
    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.metadata.content_type()
    }

    #[inline]
    pub fn content_encoding(&self) -> Option<&HeaderValue> {
        self.metadata.content_encoding()
    }

    pub fn content(&self) -> &T {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut T {
        &mut self.content
    }

    pub fn into_content(self) -> T {
        self.content
    }

    pub fn into_parts(self) -> (EntityMetadata, T) {
        (self.metadata, self.content)
    }
}

impl Entity<Reader<Bytes>> {
    /// Creates an entity of known length from in-memory bytes
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        use bytes::Buf;

        let bytes = bytes.into();
        let metadata = EntityMetadata::new().with_content_length(Some(bytes.len() as u64));
        Self::new(metadata, bytes.reader())
    }
}

impl<T> MessageBody for Entity<T> {
    fn entity_metadata(&self) -> Option<&EntityMetadata> {
        Some(&self.metadata)
    }
}

impl<T: Read> Read for Entity<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.content.read(buf)
    }
}

impl<B: Body + Unpin> Body for Entity<B> {
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.get_mut().content).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.content.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.content.size_hint()
    }
}
