use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out")]
    TimedOut,
}
