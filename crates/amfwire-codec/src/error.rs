/// Errors that can occur while encoding or decoding AMF3 messages.
#[derive(Debug, thiserror::Error)]
pub enum AmfError {
    /// No input was supplied to the deserializer.
    #[error("no source to deserialize")]
    MissingSource,

    /// The input ended before the current value was complete.
    ///
    /// The top-level deserializer converts this into leftover bytes; it only
    /// escapes when a caller drives [`crate::Deserializer::read_value`] directly.
    #[error("incomplete data (value truncated)")]
    IncompleteData,

    /// The type marker is not part of the AMF3 marker table.
    #[error("invalid type marker 0x{0:02x}")]
    InvalidMarker(u8),

    /// The type marker is valid AMF3 but decoding it is disabled.
    #[error("unsupported type marker 0x{0:02x}")]
    UnsupportedType(u8),

    /// A back-reference points past the end of its reference table.
    #[error("invalid {table} reference {index}")]
    InvalidReference { table: &'static str, index: usize },

    /// A string payload is not valid UTF-8.
    #[error("string payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Externalizable traits were used with a type that has no external reader/writer.
    #[error("type {0} is not externalizable")]
    NotExternalizable(String),

    /// A value handle does not exist in the graph being serialized.
    #[error("unknown graph node {0}")]
    UnknownNode(u32),

    /// A writer was asked to encode a node of a different kind.
    #[error("expected {expected} node, found {found}")]
    UnexpectedNode {
        expected: &'static str,
        found: &'static str,
    },

    /// Values are nested deeper than the configured limit.
    #[error("nesting depth exceeds {max}")]
    DepthLimitExceeded { max: usize },

    /// A length, count or table index does not fit its 29-bit wire field.
    #[error("{len} does not fit a 29-bit length field (max {max})")]
    LengthOverflow { len: usize, max: usize },

    /// A buffered message exceeds the configured maximum size.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing messages.
    #[error("message I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was closed before a complete message was received.
    #[error("connection closed (incomplete message, {pending} bytes pending)")]
    ConnectionClosed { pending: usize },
}

pub type Result<T> = std::result::Result<T, AmfError>;
