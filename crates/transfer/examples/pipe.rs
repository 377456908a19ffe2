//! Sends a chunked response body from an application thread through a shared
//! output buffer, lets a simulated reactor move it onto a wire, then reads it
//! back through a shared input buffer.

use std::error::Error;
use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use http::{Response, header};
use micro_transfer::buffer::{
    ContentDecoder, ContentEncoder, FramedContentDecoder, FramedContentEncoder, IoControl, SharedInputBuffer, SharedOutputBuffer,
};
use micro_transfer::codec::{ContentLengthStrategy, PayloadDecoder, PayloadEncoder, StrictContentLengthStrategy};
use micro_transfer::config::DEFAULT_BUFFER_CAPACITY;
use micro_transfer::connection::{ConnectionReuseStrategy, DefaultConnectionReuseStrategy};
use micro_transfer::entity::EntitySerializer;
use micro_transfer::protocol::{Entity, EntityMetadata};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

/// Readiness interest as a reactor would track it for one connection.
#[derive(Debug, Default)]
struct Interest {
    input: AtomicBool,
    output: AtomicBool,
}

impl IoControl for Interest {
    fn request_input(&self) {
        self.input.store(true, Ordering::Release);
    }

    fn suspend_input(&self) {
        self.input.store(false, Ordering::Release);
    }

    fn request_output(&self) {
        self.output.store(true, Ordering::Release);
    }

    fn suspend_output(&self) {
        self.output.store(false, Ordering::Release);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let response = Response::builder()
        .header(header::TRANSFER_ENCODING, "chunked")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(())?;
    let body: String = (0..2_000).map(|i| format!("line {i}\n")).collect();

    let interest = Arc::new(Interest::default());
    let output = Arc::new(SharedOutputBuffer::new(DEFAULT_BUFFER_CAPACITY, &interest)?);

    // application thread: frames the body into the shared output buffer
    let application = {
        let output = Arc::clone(&output);
        let response = response.clone();
        let body = body.clone();
        thread::spawn(move || -> std::io::Result<()> {
            let mut writer = EntitySerializer::new().writer(&*output, &response)?;
            writer.write_all(body.as_bytes())?;
            writer.close()?;
            output.write_completed()
        })
    };

    // reactor: moves framed bytes to the wire whenever output is wanted
    let mut wire = Vec::new();
    let mut channel = FramedContentEncoder::new(PayloadEncoder::identity(), 1024)?;
    while !channel.is_completed() {
        if interest.output.load(Ordering::Acquire) {
            output.produce_content(&mut channel)?;
            wire.extend_from_slice(&channel.take_pending());
        } else {
            thread::yield_now();
        }
    }
    application.join().expect("application thread panicked")?;
    info!(body = body.len(), wire = wire.len(), "response sent");

    // inbound: the reactor unframes the wire into a shared input buffer
    let decision = StrictContentLengthStrategy.determine(&response)?;
    let input = Arc::new(SharedInputBuffer::new(DEFAULT_BUFFER_CAPACITY, &interest)?);
    let reader = {
        let input = Arc::clone(&input);
        thread::spawn(move || -> std::io::Result<String> {
            let mut received = String::new();
            (&*input).read_to_string(&mut received)?;
            Ok(received)
        })
    };

    let mut channel = FramedContentDecoder::new(PayloadDecoder::from(decision));
    for segment in wire.chunks(1500) {
        channel.feed(segment);
        while input.consume_content(&mut channel)? > 0 {}
        thread::yield_now();
    }
    channel.close_input();
    while !channel.is_completed() || !input.is_end_of_stream() {
        input.consume_content(&mut channel)?;
        thread::yield_now();
    }

    let received = reader.join().expect("reader thread panicked")?;
    assert_eq!(received, body);
    info!(len = received.len(), "response received");

    let metadata = EntityMetadata::new().with_chunked(decision.is_chunked());
    let (parts, ()) = response.into_parts();
    let response = Response::from_parts(parts, Some(Entity::new(metadata, ())));
    let keep_alive = DefaultConnectionReuseStrategy.keep_alive(&true, &response);
    info!(keep_alive, "connection reuse");

    Ok(())
}
