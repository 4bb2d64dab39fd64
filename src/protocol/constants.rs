//! Protocol constants

/// Subscribe command keyword
pub const CMD_SUBSCRIBE: &str = "SUB";

/// Publish command keyword
pub const CMD_PUBLISH: &str = "PUB";

/// Maximum header line length in bytes, excluding the terminating newline
pub const MAX_HEADER_LEN: usize = 512;

/// Default maximum payload size (64 KiB)
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 64 * 1024;

/// Largest payload any configuration may accept; length-prefixed
/// deliveries encode the size as a `u32`
pub const MAX_PAYLOAD_LIMIT: usize = u32::MAX as usize;

/// Maximum topic name length in bytes
pub const MAX_TOPIC_LEN: usize = 256;

/// Size of the length prefix written before each length-prefixed delivery
pub const DELIVERY_PREFIX_LEN: usize = 4;

/// Initial read buffer capacity per connection
pub const READ_BUFFER_SIZE: usize = 4 * 1024;
