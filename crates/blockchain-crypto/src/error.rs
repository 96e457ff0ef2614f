use thiserror::Error;

/// Cryptographic errors encountered while hashing, keying, or verifying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid key bytes: {0}")]
    InvalidKey(String),

    #[error("invalid signature bytes: {0}")]
    InvalidSignature(String),

    #[error("signature verification failed")]
    VerificationFailed,

    #[error("batch signature verification failed")]
    BatchVerificationFailed,
}
