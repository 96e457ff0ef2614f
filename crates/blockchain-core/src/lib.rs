pub mod chain;
pub mod config;
pub mod consensus;
pub mod error;
pub mod ledger;
pub mod mempool;

pub use chain::Chain;
pub use config::{ChainConfig, SamplerConfig, VerifierConfig};
pub use consensus::{Sampler, Vote};
pub use error::{ChainError, CodecError};
pub use ledger::{Block, Tag, Transaction};
pub use mempool::{PendingError, PendingPool, TransactionVerifier};
