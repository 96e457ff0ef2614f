use thiserror::Error;

/// Errors raised while framing or parsing the wire protocol (packet
/// headers and push_transaction payloads).
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("transaction data length {0} exceeds the maximum of 65536 bytes")]
    TransactionTooLarge(u32),

    #[error("unrecognized packet tag: {0}")]
    UnknownTag(u8),

    #[error("connection ended before the declared frame was fully read")]
    UnexpectedEndOfStream,

    #[error("connection closed after only {0} of the 4-byte length prefix")]
    MessageSizeTooSmall(u32),

    #[error("declared payload length {0} exceeds the maximum frame size of 65536 bytes")]
    MessageSizeTooLarge(u32),

    #[error("op {op} is not valid for tag {tag}")]
    UnexpectedPacket { op: u8, tag: u8 },

    #[error("unrecognized packet op/tag combination: op={op} tag={tag}")]
    UnexpectedTag { op: u8, tag: u8 },

    #[error(transparent)]
    Transaction(#[from] blockchain_core::CodecError),
}

/// Errors raised by the TCP listener and per-connection tasks.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("connection reset by peer")]
    ConnectionResetByPeer,

    #[error("system resources exhausted: {0}")]
    SystemResources(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] CodecError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
