//! Cooperative-concurrency facade shared by the node's long-running tasks:
//! cancellation contexts, a cancellation-aware timeout helper, a one-shot
//! parker, and a shutdown wait group.

pub mod context;
pub mod error;
pub mod parker;
pub mod waitgroup;

pub use context::Context;
pub use error::RuntimeError;
pub use parker::Parker;
pub use waitgroup::WaitGroup;

pub type Result<T> = std::result::Result<T, RuntimeError>;
