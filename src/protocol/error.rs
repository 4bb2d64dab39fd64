//! Protocol error types

/// Errors raised while parsing frames or enforcing per-role framing rules
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Command keyword other than `SUB` or `PUB`
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// Wrong number of header fields
    #[error("malformed header: {0:?}")]
    MalformedHeader(String),

    /// Length field is not a decimal byte count
    #[error("invalid payload length: {0:?}")]
    InvalidLength(String),

    /// Declared payload exceeds the configured maximum
    #[error("payload of {len} bytes exceeds limit of {max}")]
    PayloadTooLarge { len: usize, max: usize },

    /// No newline within the header length limit
    #[error("header line exceeds {max} bytes")]
    HeaderTooLong { max: usize },

    /// Header line is not valid UTF-8
    #[error("header is not valid UTF-8")]
    InvalidUtf8,

    /// Peer closed the connection in the middle of a frame
    #[error("connection closed mid-frame ({buffered} bytes buffered)")]
    Truncated { buffered: usize },

    /// Frame kind not accepted on this connection's port
    #[error("unexpected {frame} frame on {role} connection")]
    UnexpectedFrame {
        frame: &'static str,
        role: &'static str,
    },

    /// Subscriber did not send its subscribe frame in time
    #[error("no subscribe frame within {0:?}")]
    SubscribeTimeout(std::time::Duration),
}
