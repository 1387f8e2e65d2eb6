use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use crate::{
    block::{BlockData, BlockRequest},
    Bitfield,
};
use super::PeerError;

// Frames are <length: u32 BE><id: u8><payload>; a bare zero length is a
// keep-alive with no id or payload.
#[cfg_attr(test, derive(Debug, Clone, PartialEq, Eq))]
pub enum Message {

    // Advises the peer not to close the connection; carries nothing.
    KeepAlive,

    // No further requests will be served.
    Choke,

    // Requests will be served again.
    Unchoke,

    // We intend to request blocks.
    Interested,

    NotInterested,

    // The sender acquired the piece with this index.
    Have { idx: u32 },

    // Which pieces the peer holds; sent once, right after the handshake.
    Bitfield(Bitfield),

    // Ask for one block: piece index, offset within piece, length.
    Request(BlockRequest),

    // One block of piece data.
    Block(BlockData),

    // Withdraw an earlier request.
    Cancel(BlockRequest),

}

pub struct MessageCodec;

impl Encoder<Message> for MessageCodec {

    type Error = PeerError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match msg {

            Message::KeepAlive => dst.put_u32(0),

            Message::Choke => {
                dst.put_u32(1);
                dst.put_u8(0);
            },

            Message::Unchoke => {
                dst.put_u32(1);
                dst.put_u8(1);
            },

            Message::Interested => {
                dst.put_u32(1);
                dst.put_u8(2);
            },

            Message::NotInterested => {
                dst.put_u32(1);
                dst.put_u8(3);
            },

            // have: <len=0005><id=4><piece index>
            Message::Have { idx } => {
                dst.put_u32(5);
                dst.put_u8(4);
                dst.put_u32(idx);
            },

            // bitfield: <len=0001+X><id=5><bitfield>
            Message::Bitfield(bitfield) => {
                let raw = bitfield.into_vec();
                dst.put_u32(1 + raw.len() as u32);
                dst.put_u8(5);
                dst.extend_from_slice(&raw);
            },

            // request: <len=0013><id=6><index><begin><length>
            Message::Request(block) => {
                dst.put_u32(13);
                dst.put_u8(6);
                dst.put_u32(block.piece_idx);
                dst.put_u32(block.offset);
                dst.put_u32(block.len);
            },

            // piece: <len=0009+X><id=7><index><begin><block>
            Message::Block(block) => {
                dst.put_u32(9 + block.data.len() as u32);
                dst.put_u8(7);
                dst.put_u32(block.piece_idx);
                dst.put_u32(block.offset);
                dst.extend_from_slice(&block.data);
            },

            // cancel: <len=0013><id=8><index><begin><length>
            Message::Cancel(block) => {
                dst.put_u32(13);
                dst.put_u8(8);
                dst.put_u32(block.piece_idx);
                dst.put_u32(block.offset);
                dst.put_u32(block.len);
            },
        }

        Ok(())
    }
}

impl Decoder for MessageCodec {

    type Item = Message;
    type Error = PeerError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {

        // Wait for the length prefix.
        if src.len() < 4 {
            return Ok(None);
        }
        let msg_len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

        // Wait for the whole frame.
        if src.len() < 4 + msg_len {
            return Ok(None);
        }
        src.advance(4);
        if msg_len == 0 {
            return Ok(Some(Message::KeepAlive));
        }

        let id = src.get_u8();
        let payload_len = msg_len - 1;
        let msg = match (id, payload_len) {
            (0, 0) => Message::Choke,
            (1, 0) => Message::Unchoke,
            (2, 0) => Message::Interested,
            (3, 0) => Message::NotInterested,
            (4, 4) => Message::Have { idx: src.get_u32() },
            (5, n) if n > 0 => {
                let mut raw = vec![0; n];
                src.copy_to_slice(&mut raw);
                Message::Bitfield(Bitfield::from_vec(raw))
            },
            (6, 12) => Message::Request(BlockRequest {
                piece_idx: src.get_u32(),
                offset: src.get_u32(),
                len: src.get_u32(),
            }),
            (7, n) if n >= 8 => {
                let piece_idx = src.get_u32();
                let offset = src.get_u32();
                let mut data = vec![0; n - 8];
                src.copy_to_slice(&mut data);
                Message::Block(BlockData { piece_idx, offset, data })
            },
            (8, 12) => Message::Cancel(BlockRequest {
                piece_idx: src.get_u32(),
                offset: src.get_u32(),
                len: src.get_u32(),
            }),
            (id @ 0..=8, _) => {
                tracing::warn!("message id {} with bad payload length {}", id, payload_len);
                return Err(PeerError::Protocol("truncated frame"));
            },
            (id, _) => {
                tracing::warn!("invalid message id: {}", id);
                return Err(PeerError::InvalidMessageId(id));
            },
        };

        Ok(Some(msg))
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::KeepAlive => write!(f, "keep-alive"),
            Message::Choke => write!(f, "choke"),
            Message::Unchoke => write!(f, "unchoke"),
            Message::Interested => write!(f, "interested"),
            Message::NotInterested => write!(f, "not interested"),
            Message::Have { idx } => write!(f, "have {}", idx),
            Message::Bitfield(bf) => write!(f, "bitfield ({} of {} bits set)", bf.count_ones(), bf.len()),
            Message::Request(block) => write!(
                f, "request piece {} [{}..{}]",
                block.piece_idx, block.offset, block.offset + block.len,
            ),
            Message::Block(block) => write!(
                f, "block of piece {} [{}..{}]",
                block.piece_idx, block.offset, block.offset + block.data.len() as u32,
            ),
            Message::Cancel(block) => write!(
                f, "cancel piece {} [{}..{}]",
                block.piece_idx, block.offset, block.offset + block.len,
            ),
        }
    }
}
