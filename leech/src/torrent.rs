use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use crate::{
    config::Config,
    metainfo::MetaInfo,
    p2p::{PeerSession, ResultRx},
    piece::{piece_table, PieceData, PieceQueue},
    tracker::{AnnounceParams, Tracker, TrackerError},
    ID,
};

#[derive(Debug, thiserror::Error)]
pub enum TorrentError {

    #[error("tracker error: {0}")]
    TrackerError(#[from] TrackerError),

    // Every session exited while pieces were still missing; nothing is
    // left to wait for.
    #[error("all peer sessions exited with pieces still missing")]
    OutOfPeers,

    #[error("piece {0} delivered twice")]
    DuplicatePiece(usize),

}

type Result<T> = std::result::Result<T, TorrentError>;

// Read-only state shared with every session.
pub(crate) struct TorrentContext {

    pub info_hash: ID,

    pub client_id: ID,

    pub num_pieces: usize,

    pub dial_timeout: Duration,

}

// The coordinator: owns the output buffer and the only results
// receiver, spawns one session per peer, and is the only thing that
// ever closes the work queue.
pub struct Torrent {

    metainfo: MetaInfo,

    config: Config,

}

impl Torrent {

    pub fn new(metainfo: MetaInfo, config: Config) -> Torrent {
        Torrent { metainfo, config }
    }

    // Announces once, then downloads from whatever the tracker gave us.
    pub async fn download(&self) -> Result<Vec<u8>> {
        tracing::info!(
            "starting download, info hash {}, {} pieces",
            self.metainfo.info_hash_hex(),
            self.metainfo.num_pieces(),
        );

        let tracker = Tracker::new(self.metainfo.announce().clone());
        let peers = tracker
            .announce(AnnounceParams {
                info_hash: self.metainfo.info_hash(),
                client_id: self.config.client_id,
                port: self.config.port,
                uploaded: 0,
                downloaded: 0,
                left: self.metainfo.total_len(),
            })
            .await?;
        tracing::info!("tracker returned {} peers", peers.len());

        self.download_from(peers).await
    }

    // Downloads from a known peer list, skipping the announce.
    pub async fn download_from(&self, peers: Vec<SocketAddr>) -> Result<Vec<u8>> {

        let queue = PieceQueue::new(piece_table(&self.metainfo));
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let ctx = Arc::new(TorrentContext {
            info_hash: self.metainfo.info_hash(),
            client_id: self.config.client_id,
            num_pieces: self.metainfo.num_pieces(),
            dial_timeout: self.config.dial_timeout,
        });

        for address in peers {
            let session = PeerSession::new(address, ctx.clone(), queue.clone(), result_tx.clone());
            tokio::spawn(session.start());
        }
        // Sessions now hold the only senders, so recv() == None exactly
        // when every session has exited.
        drop(result_tx);

        let result = self.assemble(result_rx).await;

        // The only cancellation signal there is. Sessions parked on the
        // queue wake up and exit; busy ones exit after their current
        // piece.
        queue.close().await;
        result
    }

    // Drains the results channel exactly once per piece, placing each
    // piece at its slot in the file buffer.
    async fn assemble(&self, mut result_rx: ResultRx) -> Result<Vec<u8>> {

        let num_pieces = self.metainfo.num_pieces();
        let mut buf = vec![0u8; self.metainfo.total_len() as usize];
        let mut received = vec![false; num_pieces];
        let mut done = 0;

        while done < num_pieces {
            let PieceData { idx, data } = result_rx.recv().await.ok_or(TorrentError::OutOfPeers)?;

            // Sessions only publish pieces they drained from the queue,
            // so a second delivery would mean the queue got corrupted.
            if std::mem::replace(&mut received[idx], true) {
                return Err(TorrentError::DuplicatePiece(idx));
            }

            let begin = self.metainfo.piece_offset(idx) as usize;
            buf[begin..begin + data.len()].copy_from_slice(&data);
            done += 1;

            tracing::info!(
                "piece {} downloaded, {} pieces remain ({:.1}%)",
                idx,
                num_pieces - done,
                done as f64 / num_pieces as f64 * 100.0,
            );
        }

        tracing::info!("download complete, {} bytes", buf.len());
        Ok(buf)
    }
}
