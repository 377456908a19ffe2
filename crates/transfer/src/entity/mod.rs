//! Binding entity bodies to transmitters and receivers.
//!
//! [`EntitySerializer`] and [`EntityDeserializer`] ask a
//! [`ContentLengthStrategy`](crate::codec::ContentLengthStrategy) how a message
//! is framed and wrap the byte stream in the matching body codec:
//!
//! - blocking: [`EntityWriter`] over `io::Write`, [`EntityReader`] over `io::Read`
//! - async: `FramedWrite` over `AsyncWrite`, [`EntityBody`] over `AsyncRead`

mod body;
mod deserializer;
mod reader;
mod serializer;
mod writer;

pub use body::EntityBody;
pub use deserializer::EntityDeserializer;
pub use reader::EntityReader;
pub use serializer::EntitySerializer;
pub use writer::EntityWriter;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransferConfig;
    use crate::protocol::{Entity, HttpMessage};
    use bytes::Bytes;
    use http::{Request, Response, Version, header};
    use http_body_util::{BodyExt, Full};
    use std::io::Read;

    fn serialize<M: HttpMessage>(message: &M, content: &[u8], config: TransferConfig) -> Vec<u8> {
        let mut wire = Vec::new();
        let mut entity = Entity::from_bytes(content.to_vec());
        EntitySerializer::new().with_config(config).unwrap().serialize(&mut wire, message, &mut entity).unwrap();
        wire
    }

    fn deserialize<'a, M: HttpMessage>(wire: &'a [u8], message: &M, config: TransferConfig) -> Entity<EntityReader<&'a [u8]>> {
        EntityDeserializer::new().with_config(config).unwrap().deserialize(wire, message).unwrap()
    }

    #[test]
    fn hello_with_content_length() {
        let request = Request::builder().version(Version::HTTP_11).header(header::CONTENT_LENGTH, "5").body(()).unwrap();

        let wire = serialize(&request, b"hello", TransferConfig::default());
        let mut entity = deserialize(&wire, &request, TransferConfig::default());
        assert_eq!(wire, b"hello");
        assert_eq!(entity.content_length(), Some(5));
        assert!(!entity.is_chunked());

        let mut content = String::new();
        entity.read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello");
    }

    #[test]
    fn chunked_round_trip_over_multiple_chunks() {
        let response = Response::builder().header(header::TRANSFER_ENCODING, "chunked").body(()).unwrap();
        let content: Vec<u8> = (0..=255_u8).cycle().take(10_000).collect();

        let config = TransferConfig::new().with_max_chunk_size(1000).with_read_buffer_size(333);
        let wire = serialize(&response, &content, config);
        let mut entity = deserialize(&wire, &response, config);
        assert!(wire.ends_with(b"\r\n0\r\n\r\n"));
        assert!(entity.is_chunked());
        assert_eq!(entity.content_length(), None);

        let mut decoded = Vec::new();
        entity.read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, content);
    }

    #[test]
    fn chunked_round_trip_of_empty_entity() {
        let response = Response::builder().header(header::TRANSFER_ENCODING, "chunked").body(()).unwrap();

        let wire = serialize(&response, b"", TransferConfig::default());
        let mut entity = deserialize(&wire, &response, TransferConfig::default());
        assert_eq!(wire, b"0\r\n\r\n");
        assert!(entity.is_chunked());

        let mut decoded = Vec::new();
        entity.read_to_end(&mut decoded).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn fixed_length_round_trip_of_binary_content() {
        let content: Vec<u8> = (0..=255_u8).rev().collect();
        let length = content.len().to_string();
        let request = Request::builder().header(header::CONTENT_LENGTH, length).body(()).unwrap();

        let wire = serialize(&request, &content, TransferConfig::default());
        let mut entity = deserialize(&wire, &request, TransferConfig::default());
        assert_eq!(wire, content);

        let mut decoded = Vec::new();
        entity.read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, content);
    }

    #[tokio::test]
    async fn async_chunked_round_trip() {
        let response = Response::builder().header(header::TRANSFER_ENCODING, "chunked").body(()).unwrap();

        let wire = EntitySerializer::new()
            .serialize_body(Vec::new(), &response, Full::new(Bytes::from_static(b"streamed body")))
            .await
            .unwrap();

        let entity = EntityDeserializer::new().deserialize_body(wire.as_slice(), &response).unwrap();
        assert!(entity.is_chunked());

        let collected = entity.into_content().collect().await.unwrap().to_bytes();
        assert_eq!(&collected[..], b"streamed body");
    }
}
