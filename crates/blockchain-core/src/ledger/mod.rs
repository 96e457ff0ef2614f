pub mod block;
pub mod transaction;

pub use block::Block;
pub use transaction::{Tag, Transaction};
