//! Content-length strategies: from message headers to a [`FramingDecision`].
//!
//! refer: <https://www.rfc-editor.org/rfc/rfc7230#section-3.3.3>
//!
//! `Transfer-Encoding` always takes precedence over `Content-Length`. When
//! neither header is present the body is delimited by the end of the
//! connection.

use http::{HeaderValue, Version, header};
use tracing::debug;

use crate::ensure;
use crate::protocol::{FramingDecision, HttpMessage, ProtocolError};

const CHUNKED: &[u8] = b"chunked";
const IDENTITY: &[u8] = b"identity";

/// Decides how the body of a message is framed.
pub trait ContentLengthStrategy {
    fn determine<M: HttpMessage + ?Sized>(&self, message: &M) -> Result<FramingDecision, ProtocolError>;
}

/// Rejects anything that is not unambiguous.
///
/// - `Transfer-Encoding: chunked` is chunked, but not on HTTP/1.0 or older
/// - `Transfer-Encoding: identity` is identity
/// - any other transfer-coding is unsupported
/// - `Content-Length` must be a non-negative decimal integer, repeated
///   values must agree
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictContentLengthStrategy;

impl ContentLengthStrategy for StrictContentLengthStrategy {
    fn determine<M: HttpMessage + ?Sized>(&self, message: &M) -> Result<FramingDecision, ProtocolError> {
        let headers = message.headers();

        if let Some(te_value) = headers.get(header::TRANSFER_ENCODING) {
            let coding = te_value.as_bytes().trim_ascii();
            let decision = if coding.eq_ignore_ascii_case(CHUNKED) {
                if message.version() <= Version::HTTP_10 {
                    return Err(ProtocolError::ChunkedNotAllowed { version: message.version() });
                }
                FramingDecision::Chunked
            } else if coding.eq_ignore_ascii_case(IDENTITY) {
                FramingDecision::Identity
            } else {
                return Err(ProtocolError::unsupported_transfer_coding(String::from_utf8_lossy(coding)));
            };

            debug!(?decision, "framing from transfer-encoding");
            return Ok(decision);
        }

        let mut content_length = None;
        for cl_value in headers.get_all(header::CONTENT_LENGTH) {
            let length = parse_content_length(cl_value)?;
            match content_length {
                Some(previous) if previous != length => {
                    return Err(ProtocolError::invalid_content_length(format!("conflicting values {previous} and {length}")));
                }
                _ => content_length = Some(length),
            }
        }

        if let Some(length) = content_length {
            debug!(length, "framing from content-length");
            return Ok(FramingDecision::Length(length));
        }

        Ok(FramingDecision::Identity)
    }
}

/// Tolerates the sloppiness seen on real inbound traffic.
///
/// - `Transfer-Encoding` is read as a coding list; chunked wins when it is the
///   final coding, `identity` or any other final coding means identity
/// - duplicate `Content-Length` headers are scanned from the last one back and
///   the first parseable value wins, an unusable value means identity
#[derive(Debug, Clone, Copy, Default)]
pub struct LaxContentLengthStrategy;

impl ContentLengthStrategy for LaxContentLengthStrategy {
    fn determine<M: HttpMessage + ?Sized>(&self, message: &M) -> Result<FramingDecision, ProtocolError> {
        let headers = message.headers();

        if let Some(te_value) = headers.get(header::TRANSFER_ENCODING) {
            let decision = if te_value.as_bytes().trim_ascii().eq_ignore_ascii_case(IDENTITY) {
                FramingDecision::Identity
            } else if is_chunked(te_value) {
                FramingDecision::Chunked
            } else {
                FramingDecision::Identity
            };
            debug!(?decision, "lax framing from transfer-encoding");
            return Ok(decision);
        }

        let length = headers.get_all(header::CONTENT_LENGTH).iter().rev().find_map(|value| parse_content_length(value).ok());

        Ok(match length {
            Some(length) => FramingDecision::Length(length),
            None => FramingDecision::Identity,
        })
    }
}

fn parse_content_length(cl_value: &HeaderValue) -> Result<u64, ProtocolError> {
    let cl_str = cl_value.to_str().map_err(|_e| ProtocolError::invalid_content_length("value can't to_str"))?;

    let digits = cl_str.trim();
    ensure!(
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        ProtocolError::invalid_content_length(format!("value {cl_str} is not a decimal length"))
    );

    digits.parse::<u64>().map_err(|_e| ProtocolError::invalid_content_length(format!("value {cl_str} is not u64")))
}

/// Checks if the Transfer-Encoding header indicates chunked encoding.
///
/// According to RFC 7230, chunked must be the last encoding if present.
fn is_chunked(header_value: &HeaderValue) -> bool {
    header_value.as_bytes().rsplit(|b| *b == b',').next().is_some_and(|coding| coding.trim_ascii().eq_ignore_ascii_case(CHUNKED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Request;

    fn message(version: Version, headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().version(version);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn strict_content_length() {
        for length in [0_u64, 1, 5, 1024, u64::MAX] {
            let request = message(Version::HTTP_11, &[("Content-Length", &length.to_string())]);
            assert_eq!(StrictContentLengthStrategy.determine(&request), Ok(FramingDecision::Length(length)));
        }

        let request = message(Version::HTTP_10, &[("Content-Length", " 42 ")]);
        assert_eq!(StrictContentLengthStrategy.determine(&request), Ok(FramingDecision::Length(42)));
    }

    #[test]
    fn strict_rejects_invalid_content_length() {
        for value in ["-1", "+5", "abc", "1.5", "", "0x10", "18446744073709551616"] {
            let request = message(Version::HTTP_11, &[("Content-Length", value)]);
            assert!(matches!(StrictContentLengthStrategy.determine(&request), Err(ProtocolError::InvalidContentLength { .. })));
        }
    }

    #[test]
    fn strict_repeated_content_length() {
        let request = message(Version::HTTP_11, &[("Content-Length", "5"), ("Content-Length", "5")]);
        assert_eq!(StrictContentLengthStrategy.determine(&request), Ok(FramingDecision::Length(5)));

        let request = message(Version::HTTP_11, &[("Content-Length", "5"), ("Content-Length", "10")]);
        assert!(matches!(StrictContentLengthStrategy.determine(&request), Err(ProtocolError::InvalidContentLength { .. })));

        let request = message(Version::HTTP_11, &[("Content-Length", "5"), ("Content-Length", "-1")]);
        assert!(matches!(StrictContentLengthStrategy.determine(&request), Err(ProtocolError::InvalidContentLength { .. })));
    }

    #[test]
    fn strict_chunked() {
        let request = message(Version::HTTP_11, &[("Transfer-Encoding", "chunked")]);
        assert_eq!(StrictContentLengthStrategy.determine(&request), Ok(FramingDecision::Chunked));

        let request = message(Version::HTTP_11, &[("Transfer-Encoding", "Chunked")]);
        assert_eq!(StrictContentLengthStrategy.determine(&request), Ok(FramingDecision::Chunked));
    }

    #[test]
    fn strict_rejects_chunked_on_http_10() {
        for version in [Version::HTTP_10, Version::HTTP_09] {
            let request = message(version, &[("Transfer-Encoding", "chunked")]);
            assert_eq!(StrictContentLengthStrategy.determine(&request), Err(ProtocolError::ChunkedNotAllowed { version }));
        }
    }

    #[test]
    fn strict_transfer_encoding_wins_over_content_length() {
        let request = message(Version::HTTP_11, &[("Content-Length", "10"), ("Transfer-Encoding", "chunked")]);
        assert_eq!(StrictContentLengthStrategy.determine(&request), Ok(FramingDecision::Chunked));

        let request = message(Version::HTTP_11, &[("Content-Length", "10"), ("Transfer-Encoding", "identity")]);
        assert_eq!(StrictContentLengthStrategy.determine(&request), Ok(FramingDecision::Identity));
    }

    #[test]
    fn strict_rejects_unsupported_coding() {
        let request = message(Version::HTTP_11, &[("Transfer-Encoding", "gzip")]);
        assert_eq!(
            StrictContentLengthStrategy.determine(&request),
            Err(ProtocolError::UnsupportedTransferCoding { coding: "gzip".to_string() })
        );

        let request = message(Version::HTTP_11, &[("Transfer-Encoding", "gzip, chunked")]);
        assert!(StrictContentLengthStrategy.determine(&request).is_err());
    }

    #[test]
    fn strict_without_framing_headers_is_identity() {
        let request = message(Version::HTTP_11, &[("Host", "example.com")]);
        assert_eq!(StrictContentLengthStrategy.determine(&request), Ok(FramingDecision::Identity));
    }

    #[test]
    fn check_is_chunked() {
        assert!(is_chunked(&HeaderValue::from_static("gzip, chunked")));
        assert!(is_chunked(&HeaderValue::from_static("chunked")));
        assert!(!is_chunked(&HeaderValue::from_static("chunked, gzip")));
        assert!(!is_chunked(&HeaderValue::from_static("gzip")));
    }

    #[test]
    fn lax_accepts_coding_lists_and_http_10_chunked() {
        let request = message(Version::HTTP_11, &[("Transfer-Encoding", "gzip, chunked")]);
        assert_eq!(LaxContentLengthStrategy.determine(&request), Ok(FramingDecision::Chunked));

        let request = message(Version::HTTP_10, &[("Transfer-Encoding", "chunked")]);
        assert_eq!(LaxContentLengthStrategy.determine(&request), Ok(FramingDecision::Chunked));

        let request = message(Version::HTTP_11, &[("Transfer-Encoding", "gzip")]);
        assert_eq!(LaxContentLengthStrategy.determine(&request), Ok(FramingDecision::Identity));
    }

    #[test]
    fn lax_picks_last_valid_content_length() {
        let request = message(Version::HTTP_11, &[("Content-Length", "10"), ("Content-Length", "bogus")]);
        assert_eq!(LaxContentLengthStrategy.determine(&request), Ok(FramingDecision::Length(10)));

        let request = message(Version::HTTP_11, &[("Content-Length", "bogus")]);
        assert_eq!(LaxContentLengthStrategy.determine(&request), Ok(FramingDecision::Identity));

        let request = message(Version::HTTP_11, &[("Content-Length", "7"), ("Content-Length", "+5")]);
        assert_eq!(LaxContentLengthStrategy.determine(&request), Ok(FramingDecision::Length(7)));
    }
}
