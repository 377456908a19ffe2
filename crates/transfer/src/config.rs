//! Transfer configuration.

use crate::ensure;
use crate::protocol::HttpError;

/// Default size of the read-ahead buffer used when pulling body bytes from a receiver.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Default number of encoded bytes collected before they are pushed to the transmitter.
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 8 * 1024;

/// Default upper bound for the data carried by a single emitted chunk.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 8 * 1024;

/// Default capacity of a shared input or output buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

/// Sizing knobs for entity serialization and deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfig {
    read_buffer_size: usize,
    write_buffer_size: usize,
    max_chunk_size: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
        }
    }
}

impl TransferConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many bytes are requested from the receiver per read.
    #[must_use]
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Set how many encoded bytes are buffered before writing to the transmitter.
    #[must_use]
    pub fn with_write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }

    /// Set the largest chunk emitted by the chunked encoder.
    #[must_use]
    pub fn with_max_chunk_size(mut self, size: usize) -> Self {
        self.max_chunk_size = size;
        self
    }

    #[must_use]
    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    #[must_use]
    pub fn write_buffer_size(&self) -> usize {
        self.write_buffer_size
    }

    #[must_use]
    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Rejects sizes the codecs cannot work with.
    pub fn validate(&self) -> Result<(), HttpError> {
        ensure!(self.read_buffer_size > 0, HttpError::illegal_usage("read buffer size must be positive"));
        ensure!(self.write_buffer_size > 0, HttpError::illegal_usage("write buffer size must be positive"));
        ensure!(self.max_chunk_size > 0, HttpError::illegal_usage("max chunk size must be positive"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = TransferConfig::default();
        assert_eq!(config.read_buffer_size(), DEFAULT_READ_BUFFER_SIZE);
        assert_eq!(config.write_buffer_size(), DEFAULT_WRITE_BUFFER_SIZE);
        assert_eq!(config.max_chunk_size(), DEFAULT_MAX_CHUNK_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_rejects_zero_sizes() {
        assert!(TransferConfig::new().with_read_buffer_size(0).validate().is_err());
        assert!(TransferConfig::new().with_write_buffer_size(0).validate().is_err());
        assert!(TransferConfig::new().with_max_chunk_size(0).validate().is_err());
    }
}
