use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use crate::{metainfo::MetaInfo, ID};

// Unit of work handed to peer sessions.
#[derive(Debug, Clone)]
pub struct Piece {

    pub idx: usize,

    // Expected SHA1 of the piece bytes.
    pub hash: ID,

    // Every piece is the same size except possibly the last.
    pub len: u32,

}

// A downloaded, hash-checked piece on its way to the coordinator.
#[derive(Debug)]
pub struct PieceData {
    pub idx: usize,
    pub data: Vec<u8>,
}

pub fn piece_table(metainfo: &MetaInfo) -> Vec<Piece> {
    metainfo
        .piece_hashes()
        .iter()
        .enumerate()
        .map(|(idx, &hash)| Piece {
            idx,
            hash,
            len: metainfo.piece_len(idx),
        })
        .collect()
}

// Pool of pieces still to be fetched, shared by every session. Sessions
// both consume and produce: a piece the peer doesn't hold, or one that
// failed verification, goes back into the pool for someone else.
//
// next() waits while the pool is momentarily empty, because a piece owned
// by a failing session may still re-enter. Closing the queue is the
// termination signal; after close() every next() returns None.
#[derive(Clone)]
pub struct PieceQueue {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    notify: Notify,
}

struct State {
    pieces: VecDeque<Piece>,
    closed: bool,
}

impl PieceQueue {

    pub fn new(pieces: Vec<Piece>) -> Self {
        PieceQueue {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    pieces: pieces.into(),
                    closed: false,
                }),
                notify: Notify::new(),
            }),
        }
    }

    // Pops the next piece, waiting while the queue is empty but open.
    // None means the queue has been closed.
    pub async fn next(&self) -> Option<Piece> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register as a waiter before checking state, so a wake
            // between the check and the await cannot be lost.
            notified.as_mut().enable();
            {
                let mut state = self.inner.state.lock().await;
                if state.closed {
                    return None;
                }
                if let Some(piece) = state.pieces.pop_front() {
                    return Some(piece);
                }
            }
            notified.await;
        }
    }

    // Returns a piece to the pool.
    pub async fn requeue(&self, piece: Piece) {
        let mut state = self.inner.state.lock().await;
        if state.closed {
            // Nobody is coming back for it.
            return;
        }
        state.pieces.push_back(piece);
        drop(state);
        self.inner.notify.notify_one();
    }

    pub async fn close(&self) {
        let mut state = self.inner.state.lock().await;
        state.closed = true;
        drop(state);
        self.inner.notify.notify_waiters();
    }
}
