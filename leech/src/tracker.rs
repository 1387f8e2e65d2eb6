use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use bencode::Value;
use url::Url;
use crate::ID;

type Result<T> = std::result::Result<T, TrackerError>;

// Any of these is fatal to the run; without a peer list there is
// nothing to download from.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {

    #[error("request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("error decoding response: {0}")]
    BencodeError(#[from] bencode::Error),

    #[error("tracker reported failure: {0}")]
    Failure(String),

    #[error("malformed response: {0}")]
    MalformedResponse(&'static str),

}

#[derive(Debug, Copy, Clone)]
pub struct AnnounceParams {

    // Hash of the info dict.
    pub info_hash: ID,

    // 20-byte id identifying this client to the swarm.
    pub client_id: ID,

    // Port we claim to accept connections on.
    pub port: u16,

    pub uploaded: u64,

    pub downloaded: u64,

    // Bytes still needed for the complete file.
    pub left: u64,

}

pub struct Tracker {

    client: reqwest::Client,

    url: Url,

}

impl Tracker {

    pub fn new(url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    // Single announce; this client does not re-announce on an interval.
    pub async fn announce(&self, params: AnnounceParams) -> Result<Vec<SocketAddr>> {

        // info_hash and peer_id are raw bytes and must be percent-encoded
        // by hand; reqwest's query builder would mangle them via UTF-8.
        let url = format!(
            "{}?info_hash={}&peer_id={}&port={}&uploaded={}&downloaded={}&left={}&compact=1",
            self.url.as_str(),
            urlencoding::encode_binary(&params.info_hash),
            urlencoding::encode_binary(&params.client_id),
            params.port,
            params.uploaded,
            params.downloaded,
            params.left,
        );
        tracing::debug!("announce url: {}", url);

        let raw_resp = self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let resp = bencode::decode(&raw_resp)?;

        // If present, no other key matters.
        if let Some(reason) = resp.lookup(b"failure reason") {
            let reason = reason
                .as_bytes()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_else(|| "unreadable reason".into());
            return Err(TrackerError::Failure(reason));
        }

        let peers = resp
            .lookup(b"peers")
            .and_then(Value::as_bytes)
            .ok_or(TrackerError::MalformedResponse("peers key missing or not a string"))?;

        parse_compact_peers(peers)
    }
}

// Compact model: consecutive 6-byte records, 4 bytes of IPv4 address
// then a big-endian port.
fn parse_compact_peers(raw: &[u8]) -> Result<Vec<SocketAddr>> {
    if raw.len() % 6 != 0 {
        return Err(TrackerError::MalformedResponse("peer string not a multiple of 6"));
    }
    Ok(raw
        .chunks_exact(6)
        .map(|record| {
            let ip = Ipv4Addr::new(record[0], record[1], record[2], record[3]);
            let port = u16::from_be_bytes([record[4], record[5]]);
            SocketAddr::new(IpAddr::V4(ip), port)
        })
        .collect())
}
