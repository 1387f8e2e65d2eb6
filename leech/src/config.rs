use std::time::Duration;
use crate::ID;

// The id every request advertises; the swarm only needs it to be 20 bytes.
const DEFAULT_CLIENT_ID: ID = *b"00112233445566778899";

#[derive(Debug, Clone)]
pub struct Config {

    pub client_id: ID,

    // Port reported to the tracker. We never listen on it; this client
    // only dials out.
    pub port: u16,

    pub dial_timeout: Duration,

}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID,
            port: 6881,
            dial_timeout: Duration::from_secs(10),
        }
    }
}
