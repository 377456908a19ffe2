use bytes::{Buf, Bytes};
use http::{HeaderMap, Request, Response, Version};

use crate::protocol::EntityMetadata;

/// Represents an item in the HTTP message payload stream.
///
/// This enum is produced by the payload decoders and consumed by the payload
/// encoders: either a chunk of body data or the end of the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// A chunk of payload data
    Chunk(Data),
    /// Marks the end of the payload stream
    Eof,
}

impl<D: Buf> PayloadItem<D> {
    /// Returns true if this item represents the end of the payload stream
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    /// Returns true if this item contains chunk data
    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }
}

impl PayloadItem {
    /// Returns a reference to the contained bytes if this is a Chunk
    ///
    /// Returns None if this is an EOF marker
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }

    /// Consumes the PayloadItem and returns the contained bytes if this is a Chunk
    ///
    /// Returns None if this is an EOF marker
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}

/// How the end of a message body is delimited on the wire.
///
/// Derived from the message headers each time it is needed, never stored on
/// the message itself:
/// - Chunked: `Transfer-Encoding: chunked`
/// - Identity: the body runs until the connection signals end-of-stream
/// - Length: exactly `n` bytes, from `Content-Length`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FramingDecision {
    /// Body uses chunked transfer encoding
    Chunked,
    /// Body is delimited by the end of the connection
    Identity,
    /// Body with known length in bytes
    Length(u64),
}

impl FramingDecision {
    /// Returns true if the body uses chunked transfer encoding
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, FramingDecision::Chunked)
    }

    /// Returns true if the body runs until the connection is closed
    #[inline]
    pub fn is_identity(&self) -> bool {
        matches!(self, FramingDecision::Identity)
    }

    /// The declared length, `None` when the length is not known up front
    #[inline]
    pub fn content_length(&self) -> Option<u64> {
        match self {
            FramingDecision::Length(length) => Some(*length),
            FramingDecision::Chunked | FramingDecision::Identity => None,
        }
    }
}

/// Read access to the parts of an HTTP message the transfer engine cares about.
///
/// The request/response object model itself lives in the `http` crate; the
/// engine only looks at the protocol version, the framing related headers and,
/// for the reuse decision, the metadata of an attached entity.
pub trait HttpMessage {
    fn version(&self) -> Version;

    fn headers(&self) -> &HeaderMap;

    /// Metadata of the entity attached to this message, if any
    fn entity_metadata(&self) -> Option<&EntityMetadata> {
        None
    }
}

/// A message body that may describe itself as an entity.
pub trait MessageBody {
    fn entity_metadata(&self) -> Option<&EntityMetadata>;
}

impl MessageBody for () {
    fn entity_metadata(&self) -> Option<&EntityMetadata> {
        None
    }
}

impl<B: MessageBody> MessageBody for Option<B> {
    fn entity_metadata(&self) -> Option<&EntityMetadata> {
        self.as_ref().and_then(MessageBody::entity_metadata)
    }
}

impl<B: MessageBody> HttpMessage for Request<B> {
    fn version(&self) -> Version {
        Request::version(self)
    }

    fn headers(&self) -> &HeaderMap {
        Request::headers(self)
    }

    fn entity_metadata(&self) -> Option<&EntityMetadata> {
        self.body().entity_metadata()
    }
}

impl<B: MessageBody> HttpMessage for Response<B> {
    fn version(&self) -> Version {
        Response::version(self)
    }

    fn headers(&self) -> &HeaderMap {
        Response::headers(self)
    }

    fn entity_metadata(&self) -> Option<&EntityMetadata> {
        self.body().entity_metadata()
    }
}

impl HttpMessage for http::request::Parts {
    fn version(&self) -> Version {
        self.version
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl HttpMessage for http::response::Parts {
    fn version(&self) -> Version {
        self.version
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}
