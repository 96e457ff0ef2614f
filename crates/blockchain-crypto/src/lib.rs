pub mod error;
pub mod hash;
pub mod signature;

pub use error::CryptoError;
pub use hash::Id;
pub use signature::{Keypair, PublicKey, Signature};

pub type Result<T> = std::result::Result<T, CryptoError>;
