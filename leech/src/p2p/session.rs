use std::net::SocketAddr;
use std::sync::Arc;
use futures::{stream::{SplitSink, SplitStream}, SinkExt, StreamExt};
use sha1::{Digest, Sha1};
use tokio::{net::TcpStream, time};
use tokio_util::codec::Framed;
use crate::{
    block::{block_len, num_blocks, BlockData, BlockRequest},
    piece::{Piece, PieceData, PieceQueue},
    torrent::TorrentContext,
    Bitfield, BLOCK_SIZE,
};
use super::{
    handshake::{Handshake, HandshakeCodec, PROTOCOL},
    message::{Message, MessageCodec},
    state::ConnState,
    PeerError, Result, ResultTx,
};

// A peer gets this many corrupt pieces before we give up on it.
const MAX_BAD_HASHES: u32 = 5;

type MessageSink = SplitSink<Framed<TcpStream, MessageCodec>, Message>;
type MessageStream = SplitStream<Framed<TcpStream, MessageCodec>>;

// One session per peer, owning its socket and a scratch piece buffer.
// The flow is linear: dial, handshake, bitfield, interested, unchoke,
// then the request loop until the queue closes or something breaks.
pub struct PeerSession {

    // The peer's IP address.
    address: SocketAddr,

    // Read-only state shared by all sessions.
    ctx: Arc<TorrentContext>,

    // Pool of pieces still needed; failed attempts go back in.
    queue: PieceQueue,

    // Verified pieces out to the coordinator.
    result_tx: ResultTx,

    // Pieces the peer told us it has.
    bitfield: Bitfield,

    state: ConnState,

    // Corrupt pieces served by this peer so far.
    bad_hashes: u32,

}

impl PeerSession {

    pub fn new(
        address: SocketAddr,
        ctx: Arc<TorrentContext>,
        queue: PieceQueue,
        result_tx: ResultTx,
    ) -> PeerSession {
        PeerSession {
            address,
            ctx,
            queue,
            result_tx,
            bitfield: Bitfield::new(),
            state: ConnState::default(),
            bad_hashes: 0,
        }
    }

    // Runs the session to completion. Errors stop at this boundary: the
    // socket is dropped, the in-flight piece has been returned, and the
    // coordinator only ever learns through the results channel.
    #[tracing::instrument(name = "peer", skip(self), fields(address = %self.address))]
    pub async fn start(mut self) {
        match self.run().await {
            Ok(()) => tracing::info!("session finished"),
            Err(e) => tracing::warn!("session failed in state {}: {}", self.state, e),
        }
        self.state = ConnState::Disconnected;
    }

    async fn run(&mut self) -> Result<()> {

        self.state = ConnState::Connecting;
        let stream = time::timeout(self.ctx.dial_timeout, TcpStream::connect(self.address))
            .await
            .map_err(|_| PeerError::Timeout)??;
        tracing::debug!("outbound connection successful");

        let socket = self.exchange_handshake(stream).await?;
        let (mut sink, mut stream) = socket.split();

        // The peer owes us exactly one bitfield before anything else.
        self.state = ConnState::AwaitingBitfield;
        match self.next_frame(&mut stream).await? {
            Message::Bitfield(bitfield) => self.handle_bitfield(bitfield),
            _ => return Err(PeerError::Protocol("expected bitfield after handshake")),
        }

        self.state = ConnState::AwaitingUnchoke;
        self.send_message(&mut sink, Message::Interested).await?;
        self.await_unchoke(&mut stream).await?;

        self.state = ConnState::Downloading;
        self.request_loop(&mut sink, &mut stream).await
    }

    async fn exchange_handshake(&mut self, stream: TcpStream) -> Result<Framed<TcpStream, MessageCodec>> {

        self.state = ConnState::Handshaking;
        let mut socket = Framed::new(stream, HandshakeCodec);

        tracing::debug!("sending handshake");
        socket.send(Handshake::new(self.ctx.info_hash, self.ctx.client_id)).await?;

        let reply = match socket.next().await {
            Some(reply) => reply?,
            None => return Err(PeerError::Protocol("no handshake received")),
        };
        // Only the length byte and protocol string have to echo what we
        // sent; the codec already vetted the length byte.
        if reply.protocol != PROTOCOL {
            return Err(PeerError::HandshakeMismatch);
        }
        tracing::debug!("handshake successful, peer id {:?}", String::from_utf8_lossy(&reply.peer_id));

        Ok(socket.map_codec(|_| MessageCodec))
    }

    fn handle_bitfield(&mut self, mut bitfield: Bitfield) {
        // Remove trailing bits.
        bitfield.resize(self.ctx.num_pieces, false);
        tracing::debug!("peer has {}/{} pieces", bitfield.count_ones(), self.ctx.num_pieces);
        self.bitfield = bitfield;
    }

    // Main work loop: drain the shared queue until it closes.
    async fn request_loop(&mut self, sink: &mut MessageSink, stream: &mut MessageStream) -> Result<()> {

        while let Some(piece) = self.queue.next().await {

            if !has_piece(&self.bitfield, piece.idx) {
                tracing::debug!("peer lacks piece {}, returning it", piece.idx);
                self.queue.requeue(piece).await;
                continue;
            }

            let data = match self.download_piece(sink, stream, &piece).await {
                Ok(data) => data,
                Err(e) => {
                    // Give the piece back on the way out, whatever broke.
                    self.queue.requeue(piece).await;
                    return Err(e);
                },
            };

            if verify_piece(&piece, &data) {
                tracing::debug!("piece {} verified", piece.idx);
                self.result_tx
                    .send(PieceData { idx: piece.idx, data })
                    .map_err(|_| PeerError::Channel)?;
            } else {
                self.bad_hashes += 1;
                tracing::warn!(
                    "piece {} failed verification ({}/{} strikes)",
                    piece.idx, self.bad_hashes, MAX_BAD_HASHES,
                );
                self.queue.requeue(piece).await;
                if self.bad_hashes >= MAX_BAD_HASHES {
                    return Err(PeerError::BadHashLimit);
                }
            }
        }

        tracing::debug!("queue closed");
        Ok(())
    }

    // Fetches one piece, one 16 KiB block at a time, one request in
    // flight. Blocks arrive in request order on the single connection,
    // so the scratch buffer just grows front to back.
    async fn download_piece(
        &mut self,
        sink: &mut MessageSink,
        stream: &mut MessageStream,
        piece: &Piece,
    ) -> Result<Vec<u8>> {

        let mut data = Vec::with_capacity(piece.len as usize);

        for block_idx in 0..num_blocks(piece.len) {
            let request = BlockRequest {
                piece_idx: piece.idx as u32,
                offset: block_idx * BLOCK_SIZE,
                len: block_len(piece.len, block_idx),
            };
            self.send_message(sink, Message::Request(request)).await?;

            let block = self.await_block(stream).await?;
            data.extend_from_slice(&block.data);
        }

        Ok(data)
    }

    // Reads frames until the requested block shows up. A choke parks the
    // session until the matching unchoke; a stray unchoke is ignored;
    // anything else is a protocol violation.
    async fn await_block(&mut self, stream: &mut MessageStream) -> Result<BlockData> {
        loop {
            match self.next_frame(stream).await? {
                Message::Block(block) => return Ok(block),
                Message::Choke => {
                    self.state = ConnState::Choked;
                    self.await_unchoke(stream).await?;
                    self.state = ConnState::Downloading;
                },
                Message::Unchoke => {},
                _ => return Err(PeerError::Protocol("unexpected message while downloading")),
            }
        }
    }

    async fn await_unchoke(&mut self, stream: &mut MessageStream) -> Result<()> {
        match self.next_frame(stream).await? {
            Message::Unchoke => Ok(()),
            _ => Err(PeerError::Protocol("expected unchoke")),
        }
    }

    // Next frame from the peer, with keep-alives silently discarded.
    async fn next_frame(&mut self, stream: &mut MessageStream) -> Result<Message> {
        loop {
            match stream.next().await {
                Some(Ok(Message::KeepAlive)) => continue,
                Some(Ok(msg)) => {
                    tracing::debug!("read: {}", msg);
                    return Ok(msg);
                },
                Some(Err(e)) => return Err(e),
                None => return Err(PeerError::Protocol("connection closed mid stream")),
            }
        }
    }

    async fn send_message(&mut self, sink: &mut MessageSink, msg: Message) -> Result<()> {
        tracing::debug!("send: {}", msg);
        sink.send(msg).await
    }
}

fn has_piece(bitfield: &Bitfield, idx: usize) -> bool {
    // Out of range means the peer never claimed it.
    bitfield.get(idx).map(|bit| *bit).unwrap_or(false)
}

fn verify_piece(piece: &Piece, data: &[u8]) -> bool {
    let mut hasher = Sha1::new();
    hasher.update(data);
    let digest: [u8; 20] = hasher.finalize().into();
    digest == piece.hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_piece_bit_order() {
        let bitfield = Bitfield::from_vec(vec![0b1010_0000, 0b0000_0001]);
        assert!(has_piece(&bitfield, 0));
        assert!(!has_piece(&bitfield, 1));
        assert!(has_piece(&bitfield, 2));
        assert!(!has_piece(&bitfield, 3));
        assert!(has_piece(&bitfield, 15));
        // Out of range.
        assert!(!has_piece(&bitfield, 16));
    }

    #[test]
    fn test_verify_piece() {
        let data = b"some piece data";
        let mut hasher = Sha1::new();
        hasher.update(data);
        let piece = Piece {
            idx: 0,
            hash: hasher.finalize().into(),
            len: data.len() as u32,
        };
        assert!(verify_piece(&piece, data));
        assert!(!verify_piece(&piece, b"some other data"));
    }
}
