//! Wire framing for the ingress protocol: a fixed 10-byte header followed
//! by `len` payload bytes.
//!
//! Canonical header layout (little-endian, packed):
//! `len:u32 ‖ nonce:u32 ‖ op:u8 ‖ tag:u8`.

use crate::error::CodecError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const HEADER_LEN: usize = 4 + 4 + 1 + 1;
pub const MAX_PAYLOAD_LEN: u32 = 65536;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Request = 0,
    Response = 1,
    Command = 2,
}

impl Op {
    fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Op::Request),
            1 => Some(Op::Response),
            2 => Some(Op::Command),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Ping = 0,
    PushTransaction = 1,
}

impl Tag {
    fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Tag::Ping),
            1 => Some(Tag::PushTransaction),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Packet {
    pub nonce: u32,
    pub op: Op,
    pub tag: Tag,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn ping_request(nonce: u32) -> Self {
        Packet {
            nonce,
            op: Op::Request,
            tag: Tag::Ping,
            payload: b"hello world".to_vec(),
        }
    }

    pub fn ping_response(nonce: u32, payload: Vec<u8>) -> Self {
        Packet {
            nonce,
            op: Op::Response,
            tag: Tag::Ping,
            payload,
        }
    }

    /// Validate that `op` and `tag` form a combination this protocol
    /// accepts. `push_transaction` is only valid paired with `command`.
    fn validate(op: Op, tag: Tag) -> Result<(), CodecError> {
        if tag == Tag::PushTransaction && op != Op::Command {
            return Err(CodecError::UnexpectedPacket {
                op: op as u8,
                tag: tag as u8,
            });
        }
        Ok(())
    }
}

/// Read the 4-byte length prefix, distinguishing a connection that closed
/// before sending anything (`UnexpectedEndOfStream`) from one that closed
/// mid-prefix, having sent fewer than `sizeof(u32)` bytes
/// (`MessageSizeTooSmall`).
async fn read_length_prefix<R: AsyncRead + Unpin>(reader: &mut R) -> Result<u32, CodecError> {
    let mut buf = [0u8; 4];
    let mut filled = 0usize;

    while filled < buf.len() {
        let n = reader
            .read(&mut buf[filled..])
            .await
            .map_err(|_| CodecError::UnexpectedEndOfStream)?;

        if n == 0 {
            return if filled == 0 {
                Err(CodecError::UnexpectedEndOfStream)
            } else {
                Err(CodecError::MessageSizeTooSmall(filled as u32))
            };
        }
        filled += n;
    }

    Ok(u32::from_le_bytes(buf))
}

pub async fn read_packet<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Packet, CodecError> {
    let len = read_length_prefix(reader).await?;
    if len > MAX_PAYLOAD_LEN {
        return Err(CodecError::MessageSizeTooLarge(len));
    }

    let mut rest = [0u8; HEADER_LEN - 4];
    reader
        .read_exact(&mut rest)
        .await
        .map_err(|_| CodecError::UnexpectedEndOfStream)?;

    let nonce = u32::from_le_bytes(rest[0..4].try_into().unwrap());
    let op_byte = rest[4];
    let tag_byte = rest[5];

    let op = Op::from_u8(op_byte).ok_or(CodecError::UnexpectedTag {
        op: op_byte,
        tag: tag_byte,
    })?;
    let tag = Tag::from_u8(tag_byte).ok_or(CodecError::UnknownTag(tag_byte))?;
    Packet::validate(op, tag)?;

    let mut payload = vec![0u8; len as usize];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|_| CodecError::UnexpectedEndOfStream)?;

    Ok(Packet { nonce, op, tag, payload })
}

pub async fn write_packet<W: AsyncWrite + Unpin>(
    writer: &mut W,
    packet: &Packet,
) -> Result<(), CodecError> {
    let len = packet.payload.len();
    if len > MAX_PAYLOAD_LEN as usize {
        return Err(CodecError::MessageSizeTooLarge(len as u32));
    }

    let mut frame = Vec::with_capacity(HEADER_LEN + len);
    frame.extend_from_slice(&(len as u32).to_le_bytes());
    frame.extend_from_slice(&packet.nonce.to_le_bytes());
    frame.push(packet.op as u8);
    frame.push(packet.tag as u8);
    frame.extend_from_slice(&packet.payload);

    writer
        .write_all(&frame)
        .await
        .map_err(|_| CodecError::UnexpectedEndOfStream)?;
    Ok(())
}

/// Decode every transaction concatenated in a `push_transaction` payload.
pub fn decode_push_transaction(
    payload: &[u8],
) -> Result<Vec<blockchain_core::Transaction>, CodecError> {
    let mut offset = 0usize;
    let mut transactions = Vec::new();

    while offset < payload.len() {
        let (tx, consumed) = blockchain_core::ledger::transaction::decode(&payload[offset..])?;
        transactions.push(tx);
        offset += consumed;
    }

    Ok(transactions)
}
