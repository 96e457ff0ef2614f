pub mod error;
pub mod protocol;
pub mod server;

pub use error::{CodecError, NetworkError};
pub use protocol::{Op, Packet, Tag};
pub use server::{Listener, DEFAULT_BACKLOG};
