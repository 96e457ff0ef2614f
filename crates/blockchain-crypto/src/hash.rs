//! Content-addressing for Transaction and Block: a 32-byte BLAKE3 digest
//! over the canonical wire serialization of a value.

use std::fmt;

/// A 32-byte content id, displayed as hex and never interpreted as anything
/// else by this crate — meaning is entirely owned by the caller.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id([u8; 32]);

impl Id {
    pub const ZERO: Id = Id([0u8; 32]);

    /// Hash `bytes` (the canonical serialization of the value being
    /// addressed) into an id.
    pub fn of(bytes: &[u8]) -> Self {
        Id(*blake3::hash(bytes).as_bytes())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Id(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({}…)", &self.to_hex()[..8])
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = Id::of(b"hello world");
        let b = Id::of(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn sensitive_to_input() {
        assert_ne!(Id::of(b"a"), Id::of(b"b"));
    }
}
