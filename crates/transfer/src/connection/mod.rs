//! Connection reuse.

mod reuse;

pub use reuse::{ConnectionReuseStrategy, ConnectionState, DefaultConnectionReuseStrategy};
