use std::path::Path;
use bencode::Value;
use sha1::{Digest, Sha1};
use url::Url;
use crate::ID;

#[derive(Debug, thiserror::Error)]
pub enum MetaInfoError {

    #[error("bencode error whilst decoding metainfo: {0}")]
    BencodeError(#[from] bencode::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("missing required key: {0}")]
    MissingKey(&'static str),

    #[error("wrong type for key: {0}")]
    WrongType(&'static str),

    #[error("invalid announce url: {0}")]
    InvalidAnnounce(#[from] url::ParseError),

    #[error("length and piece length must be positive")]
    InvalidLength,

    #[error("invalid pieces length, must be a non-zero multiple of 20")]
    InvalidPiecesLength,

    #[error("expected {expected} piece digests, found {found}")]
    PieceCountMismatch { expected: usize, found: usize },

}

type Result<T> = std::result::Result<T, MetaInfoError>;

// Single-file torrent metadata, immutable once loaded.
#[derive(Clone)]
pub struct MetaInfo {

    // The announce URL of the tracker.
    announce: Url,

    // Length of the file in bytes.
    total_len: u64,

    // Number of bytes in each piece except possibly the last.
    piece_len: u32,

    // One 20-byte SHA1 digest per piece, in piece order.
    piece_hashes: Vec<ID>,

    // SHA1 of the canonically re-encoded info dictionary.
    info_hash: ID,

}

fn required<'a>(dict: &'a Value, key: &'static str) -> Result<&'a Value> {
    dict.lookup(key.as_bytes()).ok_or(MetaInfoError::MissingKey(key))
}

impl MetaInfo {

    pub fn new<P: AsRef<Path>>(path: P) -> Result<MetaInfo> {
        // Raw bytes, not text; the pieces blob is binary.
        MetaInfo::from_bytes(&std::fs::read(path)?)
    }

    pub fn from_bytes(raw: &[u8]) -> Result<MetaInfo> {

        let doc = bencode::decode(raw)?;

        let announce = required(&doc, "announce")?
            .as_utf8()
            .ok_or(MetaInfoError::WrongType("announce"))?;
        let announce = Url::parse(announce)?;

        let info = required(&doc, "info")?;
        if !info.is_dict() {
            return Err(MetaInfoError::WrongType("info"));
        }

        let total_len = required(info, "length")?
            .as_int()
            .ok_or(MetaInfoError::WrongType("length"))?;
        let piece_len = required(info, "piece length")?
            .as_int()
            .ok_or(MetaInfoError::WrongType("piece length"))?;
        if total_len <= 0 || piece_len <= 0 {
            return Err(MetaInfoError::InvalidLength);
        }
        let total_len = total_len as u64;
        let piece_len = u32::try_from(piece_len).map_err(|_| MetaInfoError::InvalidLength)?;

        let pieces = required(info, "pieces")?
            .as_bytes()
            .ok_or(MetaInfoError::WrongType("pieces"))?;
        if pieces.is_empty() || pieces.len() % 20 != 0 {
            return Err(MetaInfoError::InvalidPiecesLength);
        }
        let piece_hashes: Vec<ID> = pieces
            .chunks_exact(20)
            // Safe as we have already checked length is a multiple of 20.
            .map(|c| c.try_into().unwrap())
            .collect();

        let expected = total_len.div_ceil(piece_len as u64) as usize;
        if piece_hashes.len() != expected {
            return Err(MetaInfoError::PieceCountMismatch {
                expected,
                found: piece_hashes.len(),
            });
        }

        // The swarm identifier is the digest of the info dictionary as
        // re-encoded by us, so the encoder must be canonical.
        let mut hasher = Sha1::new();
        hasher.update(bencode::encode(info));
        let info_hash = hasher.finalize().into();

        let metainfo = MetaInfo {
            announce,
            total_len,
            piece_len,
            piece_hashes,
            info_hash,
        };
        tracing::debug!("metainfo loaded: {:#?}", metainfo);
        Ok(metainfo)
    }

    pub fn announce(&self) -> &Url { &self.announce }

    pub fn total_len(&self) -> u64 { self.total_len }

    pub fn num_pieces(&self) -> usize { self.piece_hashes.len() }

    pub fn piece_hashes(&self) -> &[ID] { &self.piece_hashes }

    pub fn info_hash(&self) -> ID { self.info_hash }

    pub fn info_hash_hex(&self) -> String { hex::encode(self.info_hash) }

    // Returns length of piece given its index; only the last piece can
    // fall short of piece_len.
    pub fn piece_len(&self, idx: usize) -> u32 {
        if idx == self.num_pieces() - 1 {
            self.last_piece_len()
        } else {
            self.piece_len
        }
    }

    pub fn last_piece_len(&self) -> u32 {
        (self.total_len - self.piece_len as u64 * (self.num_pieces() as u64 - 1)) as u32
    }

    // Byte offset of a piece within the assembled file.
    pub fn piece_offset(&self, idx: usize) -> u64 {
        idx as u64 * self.piece_len as u64
    }
}

// Dont want to print out the digest table, so Debug is manual.
impl std::fmt::Debug for MetaInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaInfo")
            .field("announce", &self.announce.as_str())
            .field("total_len", &self.total_len)
            .field("piece_len", &self.piece_len)
            .field("num_pieces", &self.num_pieces())
            .field("info_hash", &self.info_hash_hex())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // piece length 32768, length 100000 -> four pieces, last one short.
    fn synthetic_torrent() -> Vec<u8> {
        let mut pieces = Vec::with_capacity(80);
        for i in 0u8..80 {
            pieces.push(i.wrapping_mul(3));
        }
        let mut doc = Vec::new();
        doc.extend_from_slice(b"d8:announce27:http://tracker.example.com/4:infod6:lengthi100000e4:name8:file.bin12:piece lengthi32768e6:pieces80:");
        doc.extend_from_slice(&pieces);
        doc.extend_from_slice(b"ee");
        doc
    }

    #[test]
    fn test_metainfo_fields() {
        let metainfo = MetaInfo::from_bytes(&synthetic_torrent()).unwrap();
        assert_eq!(metainfo.announce().as_str(), "http://tracker.example.com/");
        assert_eq!(metainfo.total_len(), 100_000);
        assert_eq!(metainfo.num_pieces(), 4);
        assert_eq!(metainfo.piece_len(0), 32_768);
        assert_eq!(metainfo.piece_len(3), 100_000 - 3 * 32_768);
        assert_eq!(metainfo.piece_hashes()[1][0], 20u8.wrapping_mul(3));
    }

    #[test]
    fn test_info_hash_matches_reencoded_info() {
        let doc = synthetic_torrent();
        let metainfo = MetaInfo::from_bytes(&doc).unwrap();

        let value = bencode::decode(&doc).unwrap();
        let mut hasher = Sha1::new();
        hasher.update(bencode::encode(value.lookup(b"info").unwrap()));
        let expected: ID = hasher.finalize().into();

        assert_eq!(metainfo.info_hash(), expected);
        // Deterministic across loads.
        assert_eq!(MetaInfo::from_bytes(&doc).unwrap().info_hash(), expected);
    }

    #[test]
    fn test_metainfo_missing_keys() {
        assert!(matches!(
            MetaInfo::from_bytes(b"d4:infod6:lengthi1e12:piece lengthi1e6:pieces20:aaaaaaaaaaaaaaaaaaaaee"),
            Err(MetaInfoError::MissingKey("announce")),
        ));
        assert!(matches!(
            MetaInfo::from_bytes(b"d8:announce18:http://example.com4:infodee"),
            Err(MetaInfoError::MissingKey("length")),
        ));
    }

    #[test]
    fn test_metainfo_bad_pieces_blob() {
        // 19 bytes of digest, not a multiple of 20.
        let doc = b"d8:announce18:http://example.com4:infod6:lengthi100e12:piece lengthi100e6:pieces19:aaaaaaaaaaaaaaaaaaaee";
        assert!(matches!(
            MetaInfo::from_bytes(doc),
            Err(MetaInfoError::InvalidPiecesLength),
        ));
    }

    #[test]
    fn test_metainfo_piece_count_mismatch() {
        // length 100000 at piece length 32768 needs 4 digests, gives 1.
        let doc = b"d8:announce18:http://example.com4:infod6:lengthi100000e12:piece lengthi32768e6:pieces20:aaaaaaaaaaaaaaaaaaaaee";
        assert!(matches!(
            MetaInfo::from_bytes(doc),
            Err(MetaInfoError::PieceCountMismatch { expected: 4, found: 1 }),
        ));
    }

    #[test]
    fn test_metainfo_wrong_types() {
        let doc = b"d8:announce18:http://example.com4:info4:oopse";
        assert!(matches!(
            MetaInfo::from_bytes(doc),
            Err(MetaInfoError::WrongType("info")),
        ));
    }
}
