use url::Url;
use url::form_urlencoded::byte_serialize;

use crate::client::Config;
use crate::core::{PeerId, Sha1};
use crate::torrent::Torrent;

#[derive(Debug)]
pub struct TrackerRequest {
    pub announce: Url,
    pub info_hash: Sha1,
    pub peer_id: PeerId,
    /// The port number that the client is listening on. Ports reserved for BitTorrent are
    /// typically 6881-6889.
    pub port: u16,
    /// The total amount uploaded so far, in bytes.
    pub uploaded: usize,
    /// The total amount downloaded so far, in bytes.
    pub downloaded: usize,
    /// The number of bytes this client still has to download.
    pub left: usize,
}

impl TrackerRequest {
    /// The first announce of a fresh download: nothing transferred yet, everything left.
    pub fn new(torrent: &Torrent, config: &Config) -> Self {
        Self {
            announce: torrent.announce.clone(),
            info_hash: torrent.info.info_hash,
            peer_id: config.client_id,
            port: config.port,
            uploaded: 0,
            downloaded: 0,
            left: torrent.info.length,
        }
    }
}

/// Peers are always requested in the compact model: a string with 6 bytes per peer.
impl From<TrackerRequest> for Url {
    fn from(value: TrackerRequest) -> Self {
        let mut url = value.announce;
        let query = format!(
            "info_hash={}&peer_id={}&port={}&uploaded={}&downloaded={}&left={}&compact=1",
            url_encode(&value.info_hash.0),
            url_encode(&value.peer_id.0),
            value.port,
            value.uploaded,
            value.downloaded,
            value.left,
        );
        let query = match url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{query}"),
            _ => query,
        };
        url.set_query(Some(&query));
        url
    }
}

fn url_encode(bytes: &[u8]) -> String {
    String::from_iter(byte_serialize(bytes))
}
