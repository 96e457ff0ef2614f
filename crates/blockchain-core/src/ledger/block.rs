//! Immutable, content-addressed blocks: an ordered list of transaction ids
//! at a given height, plus a reserved (always-zero) merkle root field.
//!
//! Canonical wire layout (little-endian, packed):
//! `height:u64 ‖ merkle_root(32) ‖ num_ids:u16 ‖ ids(num_ids × 32)`.

use crate::error::CodecError;
use blockchain_crypto::Id;

pub const MAX_TRANSACTION_IDS: usize = 65535;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    height: u64,
    merkle_root: [u8; 32],
    transaction_ids: Vec<Id>,
    id: Id,
}

impl Block {
    /// Build a block. `merkle_root` is reserved by the wire format but
    /// never computed by this core — it is always zero.
    pub fn new(height: u64, transaction_ids: Vec<Id>) -> Result<Self, CodecError> {
        if transaction_ids.len() > MAX_TRANSACTION_IDS {
            return Err(CodecError::BlockTooLarge(transaction_ids.len()));
        }
        let merkle_root = [0u8; 32];
        let bytes = encode(height, &merkle_root, &transaction_ids);
        let id = Id::of(&bytes);

        Ok(Block {
            height,
            merkle_root,
            transaction_ids,
            id,
        })
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn merkle_root(&self) -> &[u8; 32] {
        &self.merkle_root
    }

    pub fn transaction_ids(&self) -> &[Id] {
        &self.transaction_ids
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn encode(&self) -> Vec<u8> {
        encode(self.height, &self.merkle_root, &self.transaction_ids)
    }

    pub fn size(&self) -> usize {
        8 + 32 + 2 + self.transaction_ids.len() * 32
    }
}

fn encode(height: u64, merkle_root: &[u8; 32], transaction_ids: &[Id]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + 32 + 2 + transaction_ids.len() * 32);
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(merkle_root);
    out.extend_from_slice(&(transaction_ids.len() as u16).to_le_bytes());
    for id in transaction_ids {
        out.extend_from_slice(id.as_bytes());
    }
    out
}

pub fn decode(buf: &[u8]) -> Result<(Block, usize), CodecError> {
    let mut offset = 0usize;

    let take = |offset: &mut usize, len: usize| -> Result<&[u8], CodecError> {
        let end = offset.checked_add(len).ok_or(CodecError::UnexpectedEndOfStream)?;
        let slice = buf.get(*offset..end).ok_or(CodecError::UnexpectedEndOfStream)?;
        *offset = end;
        Ok(slice)
    };

    let height_bytes: [u8; 8] = take(&mut offset, 8)?
        .try_into()
        .map_err(|_| CodecError::UnexpectedEndOfStream)?;
    let merkle_root: [u8; 32] = take(&mut offset, 32)?
        .try_into()
        .map_err(|_| CodecError::UnexpectedEndOfStream)?;
    let num_ids_bytes: [u8; 2] = take(&mut offset, 2)?
        .try_into()
        .map_err(|_| CodecError::UnexpectedEndOfStream)?;
    let num_ids = u16::from_le_bytes(num_ids_bytes) as usize;

    let mut transaction_ids = Vec::with_capacity(num_ids);
    for _ in 0..num_ids {
        let id_bytes: [u8; 32] = take(&mut offset, 32)?
            .try_into()
            .map_err(|_| CodecError::UnexpectedEndOfStream)?;
        transaction_ids.push(Id::from_bytes(id_bytes));
    }

    let height = u64::from_le_bytes(height_bytes);
    let bytes = &buf[..offset];
    let id = Id::of(bytes);

    Ok((
        Block {
            height,
            merkle_root,
            transaction_ids,
            id,
        },
        offset,
    ))
}
