//! Core HTTP protocol abstractions used by the transfer engine.
//!
//! The request/response object model is the `http` crate's; this module only
//! adds what the engine needs on top of it.
//!
//! - **Message Handling** (`message`): payload items, framing decisions and
//!   the [`HttpMessage`] view over `http` requests and responses
//! - **Entities** (`entity`): a message body plus its metadata
//! - **Error Handling** (`error`): [`HttpError`] and [`ProtocolError`]

mod message;
pub use message::FramingDecision;
pub use message::HttpMessage;
pub use message::MessageBody;
pub use message::PayloadItem;

mod entity;
pub use entity::Entity;
pub use entity::EntityMetadata;

mod error;
pub use error::HttpError;
pub use error::ProtocolError;
