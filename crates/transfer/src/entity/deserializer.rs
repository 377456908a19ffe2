use std::io::Read;

use bytes::BytesMut;
use http::header;
use tokio::io::AsyncRead;
use tracing::debug;

use crate::codec::{ContentLengthStrategy, PayloadDecoder, StrictContentLengthStrategy};
use crate::config::TransferConfig;
use crate::entity::{EntityBody, EntityReader};
use crate::protocol::{Entity, EntityMetadata, FramingDecision, HttpError, HttpMessage};

/// Binds the body of an inbound message to a receiver.
///
/// Nothing is read up front: the returned entity pulls its content from the
/// receiver as the caller consumes it.
#[derive(Debug, Clone, Default)]
pub struct EntityDeserializer<S = StrictContentLengthStrategy> {
    strategy: S,
    config: TransferConfig,
}

impl EntityDeserializer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: ContentLengthStrategy> EntityDeserializer<S> {
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

    /// Determines the framing of `message` and describes its entity.
    ///
    /// Content type and content encoding are copied from the first matching
    /// header.
    pub fn metadata_for<M: HttpMessage + ?Sized>(&self, message: &M) -> Result<(FramingDecision, EntityMetadata), HttpError> {
        let decision = self.strategy.determine(message)?;
        debug!(?decision, version = ?message.version(), "select body decoder");

        let headers = message.headers();
        let metadata = EntityMetadata::new()
            .with_content_length(decision.content_length())
            .with_chunked(decision.is_chunked())
            .with_content_type(headers.get(header::CONTENT_TYPE).cloned())
            .with_content_encoding(headers.get(header::CONTENT_ENCODING).cloned());
        Ok((decision, metadata))
    }

    pub fn deserialize<R, M>(&self, receiver: R, message: &M) -> Result<Entity<EntityReader<R>>, HttpError>
    where
        R: Read,
        M: HttpMessage + ?Sized,
    {
        self.deserialize_buffered(receiver, BytesMut::new(), message)
    }

    /// Like [`deserialize`](Self::deserialize), for a receiver the message
    /// head was parsed from: `read_buf` holds the bytes already read past the
    /// head, which are the start of the body.
    pub fn deserialize_buffered<R, M>(&self, receiver: R, read_buf: BytesMut, message: &M) -> Result<Entity<EntityReader<R>>, HttpError>
    where
        R: Read,
        M: HttpMessage + ?Sized,
    {
        let (decision, metadata) = self.metadata_for(message)?;
        let reader = EntityReader::with_buffer(receiver, PayloadDecoder::from(decision), read_buf, self.config.read_buffer_size());
        Ok(Entity::new(metadata, reader))
    }

    /// Binds the body to an async receiver, the content is an [`http_body::Body`].
    pub fn deserialize_body<R, M>(&self, receiver: R, message: &M) -> Result<Entity<EntityBody<R>>, HttpError>
    where
        R: AsyncRead + Unpin,
        M: HttpMessage + ?Sized,
    {
        self.deserialize_body_buffered(receiver, BytesMut::new(), message)
    }

    /// The async counterpart of [`deserialize_buffered`](Self::deserialize_buffered).
    pub fn deserialize_body_buffered<R, M>(&self, receiver: R, read_buf: BytesMut, message: &M) -> Result<Entity<EntityBody<R>>, HttpError>
    where
        R: AsyncRead + Unpin,
        M: HttpMessage + ?Sized,
    {
        let (decision, metadata) = self.metadata_for(message)?;
        let body = EntityBody::with_buffer(receiver, decision, read_buf, self.config.read_buffer_size());
        Ok(Entity::new(metadata, body))
    }
}
