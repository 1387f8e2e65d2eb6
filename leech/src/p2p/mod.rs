use tokio::sync::mpsc;
use crate::piece::PieceData;

mod handshake;
mod message;
mod session;
pub mod state;

pub use session::PeerSession;

type Result<T, E = PeerError> = std::result::Result<T, E>;

// Each session gets a clone of the sender; the coordinator holds the
// only receiver.
pub type ResultTx = mpsc::UnboundedSender<PieceData>;
pub type ResultRx = mpsc::UnboundedReceiver<PieceData>;

// Session failures are contained: the session logs, requeues its job and
// exits. None of these ever reach the coordinator as an error.
#[derive(thiserror::Error, Debug)]
pub enum PeerError {

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection timeout")]
    Timeout,

    #[error("handshake reply does not match sent prefix")]
    HandshakeMismatch,

    #[error("invalid message ID: {0}")]
    InvalidMessageId(u8),

    #[error("protocol violation: {0}")]
    Protocol(&'static str),

    // The peer produced its fifth corrupt piece.
    #[error("too many corrupt pieces")]
    BadHashLimit,

    #[error("results channel closed")]
    Channel,

}
