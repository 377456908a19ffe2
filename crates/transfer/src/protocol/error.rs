use std::io;
use std::io::ErrorKind;

use http::Version;
use thiserror::Error;

/// Top-level error of the transfer engine.
///
/// Every failure falls in one of three kinds: a framing violation
/// ([`ProtocolError`]), a failure of the underlying transmitter/receiver or
/// shared buffer (`Io`), or a misuse of the API that is rejected before any
/// I/O happens (`IllegalUsage`). None of them leave the connection reusable.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("protocol error: {source}")]
    Protocol {
        #[from]
        source: ProtocolError,
    },

    #[error("io error: {source}")]
    Io {
        #[source]
        source: io::Error,
    },

    #[error("illegal usage: {reason}")]
    IllegalUsage { reason: String },
}

impl HttpError {
    pub fn illegal_usage<S: ToString>(str: S) -> Self {
        Self::IllegalUsage { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    #[inline]
    pub fn is_protocol(&self) -> bool {
        matches!(self, HttpError::Protocol { .. })
    }

    #[inline]
    pub fn is_io(&self) -> bool {
        matches!(self, HttpError::Io { .. })
    }

    /// Returns the protocol error if this is a framing violation
    pub fn as_protocol(&self) -> Option<&ProtocolError> {
        match self {
            HttpError::Protocol { source } => Some(source),
            _ => None,
        }
    }
}

/// Recovers a [`ProtocolError`] that travelled through an `io::Read`/`io::Write` boundary.
impl From<io::Error> for HttpError {
    fn from(e: io::Error) -> Self {
        if !e.get_ref().is_some_and(|inner| inner.is::<ProtocolError>()) {
            return Self::Io { source: e };
        }

        let kind = e.kind();
        match e.into_inner().map(|inner| inner.downcast::<ProtocolError>()) {
            Some(Ok(protocol)) => Self::Protocol { source: *protocol },
            Some(Err(inner)) => Self::Io { source: io::Error::new(kind, inner) },
            None => Self::Io { source: io::Error::from(kind) },
        }
    }
}

impl From<HttpError> for io::Error {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Protocol { source } => source.into(),
            HttpError::Io { source } => source,
            HttpError::IllegalUsage { reason } => io::Error::new(ErrorKind::InvalidInput, reason),
        }
    }
}

/// Malformed or contradictory message framing.
///
/// Always fatal to the current message exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("unsupported transfer-coding: {coding}")]
    UnsupportedTransferCoding { coding: String },

    #[error("chunked transfer-coding is not allowed for {version:?}")]
    ChunkedNotAllowed { version: Version },

    #[error("invalid chunk: {reason}")]
    InvalidChunk { reason: String },

    #[error("premature end of chunk coded message body")]
    TruncatedChunk,

    #[error("premature end of content-length delimited body, expected {expected} bytes but received {received}")]
    Truncated { expected: u64, received: u64 },

    #[error("content-length exceeded, declared {declared} bytes but attempted to write {attempted}")]
    LengthExceeded { declared: u64, attempted: u64 },

    #[error("content-length body incomplete, declared {declared} bytes but only {written} written")]
    IncompleteBody { declared: u64, written: u64 },
}

impl ProtocolError {
    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn unsupported_transfer_coding<S: ToString>(str: S) -> Self {
        Self::UnsupportedTransferCoding { coding: str.to_string() }
    }

    pub fn invalid_chunk<S: ToString>(str: S) -> Self {
        Self::InvalidChunk { reason: str.to_string() }
    }
}

impl From<ProtocolError> for io::Error {
    fn from(e: ProtocolError) -> Self {
        io::Error::new(ErrorKind::InvalidData, e)
    }
}
