// Where a session is in its lifecycle. Purely linear apart from the
// downloading/choked pair; used for log context and nothing else.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum ConnState {

    #[default]
    Idle,

    Connecting,

    Handshaking,

    // Waiting for the single bitfield the peer owes us post-handshake.
    AwaitingBitfield,

    // Interested sent, waiting to be unchoked.
    AwaitingUnchoke,

    Downloading,

    // Choked mid-download; parked until the peer unchokes us.
    Choked,

    Disconnected,

}

impl std::fmt::Display for ConnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnState::Idle => write!(f, "idle"),
            ConnState::Connecting => write!(f, "connecting"),
            ConnState::Handshaking => write!(f, "handshaking"),
            ConnState::AwaitingBitfield => write!(f, "awaiting bitfield"),
            ConnState::AwaitingUnchoke => write!(f, "awaiting unchoke"),
            ConnState::Downloading => write!(f, "downloading"),
            ConnState::Choked => write!(f, "choked"),
            ConnState::Disconnected => write!(f, "disconnected"),
        }
    }
}
