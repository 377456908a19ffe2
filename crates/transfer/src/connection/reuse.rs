//! Keep-alive decisions.
//!
//! refer: <https://www.rfc-editor.org/rfc/rfc7230#section-6.3>

use http::header::{AsHeaderName, CONNECTION};
use http::{HeaderMap, Version};
use tracing::debug;

use crate::protocol::HttpMessage;

const CLOSE: &str = "close";
const KEEP_ALIVE: &str = "keep-alive";

/// Legacy header some HTTP/1.0 proxies send in place of `Connection`
const PROXY_CONNECTION: &str = "proxy-connection";

/// What the reuse decision needs to know about the connection itself.
pub trait ConnectionState {
    fn is_open(&self) -> bool;
}

impl ConnectionState for bool {
    fn is_open(&self) -> bool {
        *self
    }
}

/// Decides whether a connection may carry another exchange after `response`.
pub trait ConnectionReuseStrategy {
    fn keep_alive<C, M>(&self, connection: &C, response: &M) -> bool
    where
        C: ConnectionState + ?Sized,
        M: HttpMessage + ?Sized;
}

/// The default keep-alive rules:
///
/// 1. a closed connection is never reused
/// 2. an entity whose end can only be signalled by closing the connection
///    (unknown length and not chunked, or chunked on HTTP/1.0) forbids reuse
/// 3. a `close` token in `Connection` forbids reuse, a `keep-alive` token
///    allows it; `Proxy-Connection` is consulted when `Connection` is absent
/// 4. otherwise HTTP/1.1 and newer are persistent, older versions are not
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConnectionReuseStrategy;

impl ConnectionReuseStrategy for DefaultConnectionReuseStrategy {
    fn keep_alive<C, M>(&self, connection: &C, response: &M) -> bool
    where
        C: ConnectionState + ?Sized,
        M: HttpMessage + ?Sized,
    {
        if !connection.is_open() {
            return false;
        }

        let version = response.version();
        if let Some(metadata) = response.entity_metadata() {
            let chunked = metadata.is_chunked();
            if (metadata.content_length().is_none() && !chunked) || (chunked && version <= Version::HTTP_10) {
                debug!(?version, chunked, "entity framing requires closing the connection");
                return false;
            }
        }

        let headers = response.headers();
        let directive = if headers.contains_key(CONNECTION) {
            connection_directive(headers, CONNECTION)
        } else {
            connection_directive(headers, PROXY_CONNECTION)
        };

        let keep_alive = directive.unwrap_or(version >= Version::HTTP_11);
        debug!(?version, ?directive, keep_alive, "connection reuse decision");
        keep_alive
    }
}

/// `Some(false)` for any `close` token, `Some(true)` for a `keep-alive`
/// token, `None` when neither appears.
fn connection_directive<K: AsHeaderName>(headers: &HeaderMap, name: K) -> Option<bool> {
    let mut keep_alive = false;
    for token in headers.get_all(name).iter().filter_map(|value| value.to_str().ok()).flat_map(|value| value.split(',')) {
        let token = token.trim();
        if token.eq_ignore_ascii_case(CLOSE) {
            return Some(false);
        }
        if token.eq_ignore_ascii_case(KEEP_ALIVE) {
            keep_alive = true;
        }
    }
    keep_alive.then_some(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Entity, EntityMetadata};
    use http::Response;

    fn build_response(version: Version, headers: &[(&str, &str)], metadata: Option<EntityMetadata>) -> Response<Option<Entity<()>>> {
        let mut builder = Response::builder().version(version);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(metadata.map(|metadata| Entity::new(metadata, ()))).unwrap()
    }

    fn known_length() -> Option<EntityMetadata> {
        Some(EntityMetadata::new().with_content_length(Some(5)))
    }

    #[test]
    fn closed_connection_is_never_reused() {
        let response = build_response(Version::HTTP_11, &[("connection", "keep-alive")], known_length());
        assert!(!DefaultConnectionReuseStrategy.keep_alive(&false, &response));
    }

    #[test]
    fn connection_close_wins_regardless_of_version() {
        for version in [Version::HTTP_10, Version::HTTP_11] {
            let response = build_response(version, &[("connection", "close")], known_length());
            assert!(!DefaultConnectionReuseStrategy.keep_alive(&true, &response));
        }
    }

    #[test]
    fn http_11_with_known_length_is_persistent() {
        let response = build_response(Version::HTTP_11, &[], known_length());
        assert!(DefaultConnectionReuseStrategy.keep_alive(&true, &response));
    }

    #[test]
    fn http_10_with_unknown_length_closes() {
        let metadata = EntityMetadata::new().with_content_length(None);
        let response = build_response(Version::HTTP_10, &[("connection", "keep-alive")], Some(metadata));
        assert!(!DefaultConnectionReuseStrategy.keep_alive(&true, &response));
    }

    #[test]
    fn chunked_entity_on_http_10_closes() {
        let metadata = EntityMetadata::new().with_chunked(true);
        let response = build_response(Version::HTTP_10, &[("connection", "keep-alive")], Some(metadata.clone()));
        assert!(!DefaultConnectionReuseStrategy.keep_alive(&true, &response));

        let response = build_response(Version::HTTP_11, &[], Some(metadata));
        assert!(DefaultConnectionReuseStrategy.keep_alive(&true, &response));
    }

    #[test]
    fn http_10_keep_alive_is_honoured() {
        let response = build_response(Version::HTTP_10, &[("connection", "Keep-Alive")], known_length());
        assert!(DefaultConnectionReuseStrategy.keep_alive(&true, &response));

        let response = build_response(Version::HTTP_10, &[], known_length());
        assert!(!DefaultConnectionReuseStrategy.keep_alive(&true, &response));
    }

    #[test]
    fn connection_tokens_span_multiple_headers() {
        let response = build_response(Version::HTTP_11, &[("connection", "upgrade, keep-alive"), ("connection", "CLOSE")], None);
        assert!(!DefaultConnectionReuseStrategy.keep_alive(&true, &response));

        let response = build_response(Version::HTTP_11, &[("connection", "upgrade")], None);
        assert!(DefaultConnectionReuseStrategy.keep_alive(&true, &response));
    }

    #[test]
    fn proxy_connection_is_a_fallback() {
        let response = build_response(Version::HTTP_10, &[("proxy-connection", "keep-alive")], known_length());
        assert!(DefaultConnectionReuseStrategy.keep_alive(&true, &response));

        let response = build_response(Version::HTTP_11, &[("connection", "keep-alive"), ("proxy-connection", "close")], None);
        assert!(DefaultConnectionReuseStrategy.keep_alive(&true, &response));
    }
}
