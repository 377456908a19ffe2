use std::io;
use std::io::{Read, Write};

use bytes::Buf;
use futures::SinkExt;
use http::Version;
use http_body::Body;
use http_body_util::BodyExt;
use tokio::io::AsyncWrite;
use tokio_util::codec::FramedWrite;
use tracing::{debug, trace};

use crate::codec::{ContentLengthStrategy, PayloadEncoder, StrictContentLengthStrategy};
use crate::config::TransferConfig;
use crate::entity::EntityWriter;
use crate::protocol::{Entity, HttpError, HttpMessage, PayloadItem, ProtocolError};

/// Writes entity bodies onto a transmitter, framed the way the message headers say.
///
/// The serializer never touches the headers: putting `Transfer-Encoding` or
/// `Content-Length` on the message is the caller's job, the serializer only
/// follows them.
#[derive(Debug, Clone, Default)]
pub struct EntitySerializer<S = StrictContentLengthStrategy> {
    strategy: S,
    config: TransferConfig,
}

impl EntitySerializer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: ContentLengthStrategy> EntitySerializer<S> {
    pub fn with_strategy(strategy: S) -> Self {
        Self { strategy, config: TransferConfig::default() }
    }

    pub fn with_config(self, config: TransferConfig) -> Result<Self, HttpError> {
        config.validate()?;
        Ok(Self { config, ..self })
    }

    #[inline]
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Picks the body encoder for `message`.
    ///
    /// Chunked framing is refused on HTTP/1.0 and older whatever the strategy
    /// decided, such a peer cannot parse it.
    pub fn encoder_for<M: HttpMessage + ?Sized>(&self, message: &M) -> Result<PayloadEncoder, HttpError> {
        let decision = self.strategy.determine(message)?;
        if decision.is_chunked() && message.version() <= Version::HTTP_10 {
            return Err(ProtocolError::ChunkedNotAllowed { version: message.version() }.into());
        }

        debug!(?decision, version = ?message.version(), "select body encoder");
        Ok(PayloadEncoder::from_decision(decision, self.config.max_chunk_size()))
    }

    /// Wraps `transmitter` in the body encoder selected for `message`.
    ///
    /// The returned writer must be closed to end the body.
    pub fn writer<W: Write, M: HttpMessage + ?Sized>(&self, transmitter: W, message: &M) -> Result<EntityWriter<W>, HttpError> {
        let encoder = self.encoder_for(message)?;
        Ok(EntityWriter::with_capacity(transmitter, encoder, self.config.write_buffer_size()))
    }

    /// Writes the whole content of `entity` as the body of `message` and ends the body.
    pub fn serialize<W, M, R>(&self, transmitter: W, message: &M, entity: &mut Entity<R>) -> Result<(), HttpError>
    where
        W: Write,
        M: HttpMessage + ?Sized,
        R: Read,
    {
        let mut writer = self.writer(transmitter, message)?;
        let written = io::copy(entity.content_mut(), &mut writer)?;
        writer.close()?;

        trace!(written, "serialized entity");
        Ok(())
    }

    /// Streams the data frames of `body` onto an async transmitter and ends the body.
    ///
    /// Trailer frames are skipped. Returns the transmitter once everything has
    /// been flushed.
    pub async fn serialize_body<W, M, B>(&self, transmitter: W, message: &M, mut body: B) -> Result<W, HttpError>
    where
        W: AsyncWrite + Unpin,
        M: HttpMessage + ?Sized,
        B: Body + Unpin,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let encoder = self.encoder_for(message)?;
        let mut framed = FramedWrite::new(transmitter, encoder);
        framed.set_backpressure_boundary(self.config.write_buffer_size());

        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(|e| HttpError::io(io::Error::other(e)))?;
            match frame.into_data() {
                Ok(data) if data.has_remaining() => {
                    trace!(len = data.remaining(), "send body frame");
                    framed.feed(PayloadItem::Chunk(data)).await?;
                }
                Ok(_) => {}
                Err(_) => trace!("skip trailers frame"),
            }
        }

        framed.send(PayloadItem::<B::Data>::Eof).await?;
        Ok(framed.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::LaxContentLengthStrategy;
    use bytes::Bytes;
    use http::{Request, Response, header};
    use http_body_util::{Full, StreamBody};
    use http_body::Frame;
    use std::convert::Infallible;

    #[test]
    fn content_length_body_is_written_verbatim() {
        let request = Request::builder().header(header::CONTENT_LENGTH, "5").body(()).unwrap();
        let mut entity = Entity::from_bytes("hello");

        let mut wire = Vec::new();
        EntitySerializer::new().serialize(&mut wire, &request, &mut entity).unwrap();

        assert_eq!(wire, b"hello");
    }

    #[test]
    fn chunked_body_is_split_at_max_chunk_size() {
        let response = Response::builder().header(header::TRANSFER_ENCODING, "chunked").body(()).unwrap();
        let mut entity = Entity::from_bytes("hello world");

        let config = TransferConfig::new().with_max_chunk_size(5);
        let serializer = EntitySerializer::new().with_config(config).unwrap();

        let mut wire = Vec::new();
        serializer.serialize(&mut wire, &response, &mut entity).unwrap();

        assert_eq!(wire, b"5\r\nhello\r\n5\r\n worl\r\n1\r\nd\r\n0\r\n\r\n");
    }

    #[test]
    fn identity_body_has_no_terminator() {
        let response = Response::builder().version(Version::HTTP_10).body(()).unwrap();
        let mut entity = Entity::from_bytes("until close");

        let mut wire = Vec::new();
        EntitySerializer::new().serialize(&mut wire, &response, &mut entity).unwrap();

        assert_eq!(wire, b"until close");
    }

    #[test]
    fn entity_longer_than_content_length_is_rejected() {
        let request = Request::builder().header(header::CONTENT_LENGTH, "3").body(()).unwrap();
        let mut entity = Entity::from_bytes("hello");

        let mut wire = Vec::new();
        let error = EntitySerializer::new().serialize(&mut wire, &request, &mut entity).unwrap_err();

        assert_eq!(error.as_protocol(), Some(&ProtocolError::LengthExceeded { declared: 3, attempted: 5 }));
        assert!(wire.is_empty());
    }

    #[test]
    fn entity_shorter_than_content_length_is_rejected() {
        let request = Request::builder().header(header::CONTENT_LENGTH, "10").body(()).unwrap();
        let mut entity = Entity::from_bytes("hello");

        let mut wire = Vec::new();
        let error = EntitySerializer::new().serialize(&mut wire, &request, &mut entity).unwrap_err();

        assert_eq!(error.as_protocol(), Some(&ProtocolError::IncompleteBody { declared: 10, written: 5 }));
    }

    #[test]
    fn chunked_is_refused_on_http_10_even_when_lax() {
        let response =
            Response::builder().version(Version::HTTP_10).header(header::TRANSFER_ENCODING, "chunked").body(()).unwrap();

        let serializer = EntitySerializer::with_strategy(LaxContentLengthStrategy);
        let error = serializer.encoder_for(&response).unwrap_err();

        assert_eq!(error.as_protocol(), Some(&ProtocolError::ChunkedNotAllowed { version: Version::HTTP_10 }));
    }

    #[test]
    fn unsupported_coding_fails_before_writing() {
        let response = Response::builder().header(header::TRANSFER_ENCODING, "gzip").body(()).unwrap();
        let mut entity = Entity::from_bytes("data");

        let mut wire = Vec::new();
        let error = EntitySerializer::new().serialize(&mut wire, &response, &mut entity).unwrap_err();

        assert!(error.is_protocol());
        assert!(wire.is_empty());
    }

    #[test]
    fn zero_sized_config_is_illegal() {
        let error = EntitySerializer::new().with_config(TransferConfig::new().with_max_chunk_size(0)).unwrap_err();
        assert!(matches!(error, HttpError::IllegalUsage { .. }));
    }

    #[tokio::test]
    async fn serialize_full_body_async() {
        let response = Response::builder().header(header::CONTENT_LENGTH, "5").body(()).unwrap();

        let wire = EntitySerializer::new()
            .serialize_body(Vec::new(), &response, Full::new(Bytes::from_static(b"hello")))
            .await
            .unwrap();

        assert_eq!(wire, b"hello");
    }

    #[tokio::test]
    async fn serialize_stream_body_async_skips_trailers() {
        let response = Response::builder().header(header::TRANSFER_ENCODING, "chunked").body(()).unwrap();

        let mut trailers = http::HeaderMap::new();
        trailers.insert("x-checksum", http::HeaderValue::from_static("abc"));
        let frames = vec![
            Ok::<_, Infallible>(Frame::data(Bytes::from_static(b"hello"))),
            Ok(Frame::data(Bytes::new())),
            Ok(Frame::data(Bytes::from_static(b" world"))),
            Ok(Frame::trailers(trailers)),
        ];
        let body = StreamBody::new(futures::stream::iter(frames));

        let wire = EntitySerializer::new().serialize_body(Vec::new(), &response, body).await.unwrap();

        assert_eq!(wire, b"5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n");
    }
}
