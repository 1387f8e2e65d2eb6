mod block;
mod config;
mod metainfo;
mod piece;
mod p2p;
mod torrent;
mod tracker;

// Most commonly used block size - 16KB.
const BLOCK_SIZE: u32 = 0x4000;

// Piece availability advertised by a peer. The wire format is MSB-first
// within each byte: bit (7 - i % 8) of byte i / 8 covers piece i.
type Bitfield = bitvec::vec::BitVec<u8, bitvec::order::Msb0>;

// 20 byte SHA1 digest, doubling as the client/peer id width.
pub type ID = [u8; 20];

// Re-exports
pub use config::Config;
pub use metainfo::{MetaInfo, MetaInfoError};
pub use p2p::PeerError;
pub use torrent::{Torrent, TorrentError};
pub use tracker::TrackerError;
