use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use crate::ID;
use super::PeerError;

pub const PROTOCOL: [u8; 19] = *b"BitTorrent protocol";

// Fixed 68 bytes on the wire:
// <19><"BitTorrent protocol"><8 reserved><info hash><peer id>
const HANDSHAKE_LEN: usize = 68;

pub struct Handshake {
    pub protocol: [u8; 19],
    pub reserved: [u8; 8],
    pub info_hash: ID,
    pub peer_id: ID,
}

impl Handshake {
    pub fn new(info_hash: ID, peer_id: ID) -> Self {
        Self {
            protocol: PROTOCOL,
            reserved: [0; 8],
            info_hash,
            peer_id,
        }
    }
}

pub struct HandshakeCodec;

impl Encoder<Handshake> for HandshakeCodec {

    type Error = PeerError;

    fn encode(&mut self, item: Handshake, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.put_u8(PROTOCOL.len() as u8);
        dst.extend_from_slice(&item.protocol);
        dst.extend_from_slice(&item.reserved);
        dst.extend_from_slice(&item.info_hash);
        dst.extend_from_slice(&item.peer_id);
        debug_assert_eq!(dst.len(), HANDSHAKE_LEN, "encoded handshake length is not 68 bytes");
        Ok(())
    }
}

impl Decoder for HandshakeCodec {

    type Item = Handshake;
    type Error = PeerError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {

        if src.is_empty() {
            return Ok(None);
        }
        // The length byte is enough to reject a non-peer immediately.
        if src[0] != PROTOCOL.len() as u8 {
            return Err(PeerError::HandshakeMismatch);
        }
        if src.len() < HANDSHAKE_LEN {
            return Ok(None);
        }

        src.advance(1);
        let mut protocol = [0; 19];
        src.copy_to_slice(&mut protocol);
        let mut reserved = [0; 8];
        src.copy_to_slice(&mut reserved);
        let mut info_hash = [0; 20];
        src.copy_to_slice(&mut info_hash);
        let mut peer_id = [0; 20];
        src.copy_to_slice(&mut peer_id);

        Ok(Some(Handshake {
            protocol,
            reserved,
            info_hash,
            peer_id,
        }))
    }
}

impl std::fmt::Debug for Handshake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handshake")
            .field("protocol", &String::from_utf8_lossy(&self.protocol))
            .field("reserved", &self.reserved)
            .field("info_hash", &hex::encode(self.info_hash))
            .field("peer_id", &String::from_utf8_lossy(&self.peer_id))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_handshake() -> BytesMut {
        let mut src = BytesMut::new();
        src.put_u8(19);
        src.extend_from_slice(b"BitTorrent protocol");
        src.extend_from_slice(&[0; 8]);
        src.extend_from_slice(&[0xab; 20]);
        src.extend_from_slice(b"00112233445566778899");
        src
    }

    #[test]
    fn test_handshake_round_trip() {
        let mut encoded = BytesMut::new();
        HandshakeCodec
            .encode(Handshake::new([0xab; 20], *b"00112233445566778899"), &mut encoded)
            .unwrap();
        assert_eq!(encoded, raw_handshake());

        let decoded = HandshakeCodec.decode(&mut encoded).unwrap().unwrap();
        assert_eq!(decoded.protocol, PROTOCOL);
        assert_eq!(decoded.reserved, [0; 8]);
        assert_eq!(decoded.info_hash, [0xab; 20]);
        assert_eq!(&decoded.peer_id, b"00112233445566778899");
    }

    #[test]
    fn test_handshake_decode_incomplete() {
        let mut src = raw_handshake();
        src.truncate(40);
        assert!(HandshakeCodec.decode(&mut src).unwrap().is_none());
        // Empty buffer is also just "not yet".
        assert!(HandshakeCodec.decode(&mut BytesMut::new()).unwrap().is_none());
    }

    #[test]
    fn test_handshake_decode_bad_length_byte() {
        let mut src = raw_handshake();
        src[0] = 20;
        assert!(matches!(
            HandshakeCodec.decode(&mut src),
            Err(PeerError::HandshakeMismatch),
        ));
    }

    #[test]
    fn test_handshake_decode_leaves_extra_data() {
        let mut src = raw_handshake();
        src.extend_from_slice(&[0, 0, 0, 0]); // trailing keep-alive
        assert!(HandshakeCodec.decode(&mut src).unwrap().is_some());
        assert_eq!(src.len(), 4);
    }
}
