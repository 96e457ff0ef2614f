//! Immutable, signed, content-addressed transactions.
//!
//! Canonical wire layout (little-endian, packed):
//! `sender(32) ‖ signature(64) ‖ data_len:u32 ‖ sender_nonce:u64 ‖
//!  created_at:u64 ‖ tag:u8 ‖ data(data_len)`.
//!
//! The signature covers only the suffix starting at `sender_nonce` — the
//! "signature payload" — so a transaction's authenticity does not depend on
//! who is relaying it.

use crate::error::CodecError;
use blockchain_crypto::{Id, Keypair, PublicKey, Signature};
use std::sync::Arc;

pub const MAX_DATA_LEN: u32 = 65536;

/// The only transaction tag currently defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    NoOp = 0,
}

impl Tag {
    fn from_u8(byte: u8) -> Result<Self, CodecError> {
        match byte {
            0 => Ok(Tag::NoOp),
            other => Err(CodecError::UnknownTag(other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transaction {
    sender: PublicKey,
    signature: Signature,
    sender_nonce: u64,
    created_at: u64,
    tag: Tag,
    data: Vec<u8>,
    id: Id,
}

impl Transaction {
    /// Build and sign a new transaction. `signer`'s public key becomes
    /// `sender`; the signature payload covers everything after `sender`
    /// and `signature` themselves.
    pub fn new(
        signer: &Keypair,
        sender_nonce: u64,
        created_at: u64,
        tag: Tag,
        data: Vec<u8>,
    ) -> Self {
        let payload = signature_payload(sender_nonce, created_at, tag, &data);
        let signature = signer.sign(&payload);
        let sender = signer.public_key();
        let bytes = encode(&sender, &signature, sender_nonce, created_at, tag, &data);
        let id = Id::of(&bytes);

        Transaction {
            sender,
            signature,
            sender_nonce,
            created_at,
            tag,
            data,
            id,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn sender(&self) -> &PublicKey {
        &self.sender
    }

    pub fn sender_nonce(&self) -> u64 {
        self.sender_nonce
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The bytes the signature was computed over: everything from
    /// `sender_nonce` onward.
    pub fn signature_payload(&self) -> Vec<u8> {
        signature_payload(self.sender_nonce, self.created_at, self.tag, &self.data)
    }

    /// Check the signature against the sender's public key. Does not
    /// re-derive the id; callers that decoded from untrusted bytes get a
    /// recomputed id for free from [`decode`].
    pub fn verify_signature(&self) -> bool {
        blockchain_crypto::signature::verify(&self.sender, &self.signature_payload(), &self.signature)
    }

    pub fn encode(&self) -> Vec<u8> {
        encode(
            &self.sender,
            &self.signature,
            self.sender_nonce,
            self.created_at,
            self.tag,
            &self.data,
        )
    }

    pub fn size(&self) -> usize {
        32 + 64 + 4 + 8 + 8 + 1 + self.data.len()
    }

    /// Share a handle to this transaction (reference-counted ownership).
    pub fn share(self: &Arc<Self>) -> Arc<Self> {
        Arc::clone(self)
    }
}

fn signature_payload(sender_nonce: u64, created_at: u64, tag: Tag, data: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(8 + 8 + 1 + data.len());
    payload.extend_from_slice(&sender_nonce.to_le_bytes());
    payload.extend_from_slice(&created_at.to_le_bytes());
    payload.push(tag as u8);
    payload.extend_from_slice(data);
    payload
}

fn encode(
    sender: &PublicKey,
    signature: &Signature,
    sender_nonce: u64,
    created_at: u64,
    tag: Tag,
    data: &[u8],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(32 + 64 + 4 + 8 + 8 + 1 + data.len());
    out.extend_from_slice(&sender.to_bytes());
    out.extend_from_slice(&signature.to_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&sender_nonce.to_le_bytes());
    out.extend_from_slice(&created_at.to_le_bytes());
    out.push(tag as u8);
    out.extend_from_slice(data);
    out
}

/// Decode a single transaction from the front of `buf`, returning it along
/// with the number of bytes consumed. The id is always recomputed from the
/// bytes actually read, never trusted from the wire.
pub fn decode(buf: &[u8]) -> Result<(Transaction, usize), CodecError> {
    let mut offset = 0usize;

    let take = |offset: &mut usize, len: usize| -> Result<&[u8], CodecError> {
        let end = offset.checked_add(len).ok_or(CodecError::UnexpectedEndOfStream)?;
        let slice = buf.get(*offset..end).ok_or(CodecError::UnexpectedEndOfStream)?;
        *offset = end;
        Ok(slice)
    };

    let sender_bytes: [u8; 32] = take(&mut offset, 32)?
        .try_into()
        .map_err(|_| CodecError::UnexpectedEndOfStream)?;
    let sig_bytes: [u8; 64] = take(&mut offset, 64)?
        .try_into()
        .map_err(|_| CodecError::UnexpectedEndOfStream)?;
    let data_len_bytes: [u8; 4] = take(&mut offset, 4)?
        .try_into()
        .map_err(|_| CodecError::UnexpectedEndOfStream)?;
    let data_len = u32::from_le_bytes(data_len_bytes);
    if data_len > MAX_DATA_LEN {
        return Err(CodecError::TransactionTooLarge(data_len));
    }

    let nonce_bytes: [u8; 8] = take(&mut offset, 8)?
        .try_into()
        .map_err(|_| CodecError::UnexpectedEndOfStream)?;
    let created_at_bytes: [u8; 8] = take(&mut offset, 8)?
        .try_into()
        .map_err(|_| CodecError::UnexpectedEndOfStream)?;
    let tag_byte = take(&mut offset, 1)?[0];
    let tag = Tag::from_u8(tag_byte)?;
    let data = take(&mut offset, data_len as usize)?.to_vec();

    let sender = PublicKey::from_bytes(&sender_bytes)
        .map_err(|_| CodecError::UnexpectedEndOfStream)?;
    let signature = Signature::from_bytes(&sig_bytes);
    let sender_nonce = u64::from_le_bytes(nonce_bytes);
    let created_at = u64::from_le_bytes(created_at_bytes);

    let bytes = &buf[..offset];
    let id = Id::of(bytes);

    Ok((
        Transaction {
            sender,
            signature,
            sender_nonce,
            created_at,
            tag,
            data,
            id,
        },
        offset,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let keypair = Keypair::generate();
        let tx = Transaction::new(&keypair, 123, 456, Tag::NoOp, b"hello world".to_vec());
        let bytes = tx.encode();

        let (decoded, consumed) = decode(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded.id(), tx.id());
        assert_eq!(decoded.sender_nonce(), 123);
        assert_eq!(decoded.created_at(), 456);
        assert_eq!(decoded.data(), b"hello world");
        assert!(decoded.verify_signature());
    }

    #[test]
    fn id_is_pure_function_of_fields() {
        let keypair = Keypair::generate();
        let a = Transaction::new(&keypair, 1, 1, Tag::NoOp, b"x".to_vec());
        let b = Transaction::new(&keypair, 1, 1, Tag::NoOp, b"x".to_vec());
        // Same signer + same fields yields the same signature (Ed25519 is
        // deterministic) and therefore the same id.
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn tampered_signature_fails_verification() {
        let keypair = Keypair::generate();
        let tx = Transaction::new(&keypair, 1, 2, Tag::NoOp, b"data".to_vec());
        let mut bytes = tx.encode();
        bytes[32] ^= 0xFF; // flip a byte inside the signature
        let (decoded, _) = decode(&bytes).unwrap();
        assert!(!decoded.verify_signature());
    }

    #[test]
    fn oversized_data_len_rejected() {
        let mut bytes = vec![0u8; 32 + 64];
        bytes.extend_from_slice(&(MAX_DATA_LEN + 1).to_le_bytes());
        assert_eq!(decode(&bytes), Err(CodecError::TransactionTooLarge(MAX_DATA_LEN + 1)));
    }

    #[test]
    fn truncated_buffer_rejected() {
        let keypair = Keypair::generate();
        let tx = Transaction::new(&keypair, 1, 2, Tag::NoOp, b"hello world".to_vec());
        let bytes = tx.encode();
        assert_eq!(decode(&bytes[..bytes.len() - 1]), Err(CodecError::UnexpectedEndOfStream));
    }

    #[test]
    fn unknown_tag_rejected() {
        let keypair = Keypair::generate();
        let tx = Transaction::new(&keypair, 1, 2, Tag::NoOp, Vec::new());
        let mut bytes = tx.encode();
        let tag_offset = 32 + 64 + 4 + 8 + 8;
        bytes[tag_offset] = 0xAB;
        assert_eq!(decode(&bytes), Err(CodecError::UnknownTag(0xAB)));
    }
}
