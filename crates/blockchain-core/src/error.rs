use thiserror::Error;

/// Errors raised while decoding the canonical Transaction/Block wire format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("declared data length {0} exceeds the maximum of 65536 bytes")]
    TransactionTooLarge(u32),

    #[error("buffer ended before the declared fields were read")]
    UnexpectedEndOfStream,

    #[error("unrecognized transaction tag: {0}")]
    UnknownTag(u8),

    #[error("block transaction_ids length {0} exceeds the maximum of 65535")]
    BlockTooLarge(usize),
}

/// Errors raised by the Chain driver. Invariant violations are fatal: the
/// consensus state is inconsistent and the node cannot safely continue.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("cancelled")]
    Cancelled,

    #[error(
        "finalized block referenced transaction {0} that was not present in pending — \
         consensus state is inconsistent"
    )]
    MissingFinalizedTransaction(blockchain_crypto::Id),
}

impl From<runtime::RuntimeError> for ChainError {
    fn from(_: runtime::RuntimeError) -> Self {
        ChainError::Cancelled
    }
}
