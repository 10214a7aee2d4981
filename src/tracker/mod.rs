use log::{debug, info};
use url::Url;

use crate::bencoding;
use crate::client::Config;
use crate::error::{Error, Result};
use crate::torrent::Torrent;

pub use self::request::TrackerRequest;
pub use self::response::{PeerAddress, TrackerResponse};

mod request;
mod response;

/// Announces this client to the torrent's tracker and returns the peers it handed out.
pub async fn announce(torrent: &Torrent, config: &Config) -> Result<Vec<PeerAddress>> {
    let response = request(TrackerRequest::new(torrent, config)).await?;
    info!(
        "tracker returned {} peers (interval {:?})",
        response.peers.len(),
        response.interval
    );
    Ok(response.peers)
}

pub async fn request(request: TrackerRequest) -> Result<TrackerResponse> {
    let url = Url::from(request);
    debug!("announcing to {}", url);
    let response = reqwest::get(url).await?;
    if !response.status().is_success() {
        return Err(Error::Tracker(format!(
            "server returned status {}",
            response.status()
        )));
    }
    let body = response.bytes().await?;
    let value = bencoding::decode(&body)
        .map_err(|err| Error::Tracker(format!("malformed response: {err}")))?;
    TrackerResponse::try_from(value)
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    use crate::bencoding::Value;
    use crate::torrent::tests::metainfo;

    use super::*;

    async fn mock_tracker(response: ResponseTemplate) -> (MockServer, Torrent) {
        let mock_tracker = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/announce"))
            .and(query_param("port", "6881"))
            .and(query_param("uploaded", "0"))
            .and(query_param("downloaded", "0"))
            .and(query_param("left", "20000"))
            .and(query_param("compact", "1"))
            .respond_with(response)
            .mount(&mock_tracker)
            .await;

        let announce_url = format!("{}/announce", mock_tracker.uri());
        let torrent = Torrent::from_bytes(&metainfo(&announce_url, &[0; 20000], 16384))
            .expect("invalid metainfo");
        (mock_tracker, torrent)
    }

    fn bencoded(value: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(value.to_bytes(), "text/plain")
    }

    #[tokio::test]
    async fn announce_returns_compact_peers() {
        let body = Value::dictionary()
            .with_entry("interval", Value::Integer(60))
            .with_entry("peers", Value::String(vec![127, 0, 0, 1, 0x1a, 0xe1]));
        let (_server, torrent) = mock_tracker(bencoded(body)).await;

        let peers = announce(&torrent, &Config::default())
            .await
            .expect("failed to contact tracker");

        assert_eq!(
            peers,
            vec![PeerAddress {
                ip: Ipv4Addr::LOCALHOST,
                port: 6881
            }]
        );
    }

    #[tokio::test]
    async fn error_status() {
        let (_server, torrent) = mock_tracker(ResponseTemplate::new(500)).await;

        let result = announce(&torrent, &Config::default()).await;

        assert!(matches!(result, Err(Error::Tracker(_))));
    }

    #[tokio::test]
    async fn malformed_body() {
        let response = ResponseTemplate::new(200).set_body_raw("d5:peers", "text/plain");
        let (_server, torrent) = mock_tracker(response).await;

        let result = announce(&torrent, &Config::default()).await;

        assert!(matches!(result, Err(Error::Tracker(_))));
    }
}
