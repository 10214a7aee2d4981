use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use crate::bencoding::{Value, ValueError};
use crate::error::{Error, Result};

const COMPACT_PEER_LEN: usize = 6;

#[derive(Debug, PartialEq)]
pub struct TrackerResponse {
    pub interval: Option<Duration>,
    pub peers: Vec<PeerAddress>,
}

fn field_error(key: &'static str) -> impl FnOnce(ValueError) -> Error {
    move |err| Error::Tracker(format!("response field `{key}`: {err}"))
}

impl TryFrom<Value> for TrackerResponse {
    type Error = Error;

    fn try_from(mut value: Value) -> Result<Self> {
        if !matches!(value, Value::Dictionary(_)) {
            return Err(Error::Tracker(format!(
                "response must be a dictionary, found {}",
                value.kind()
            )));
        }
        if let Some(reason) = value
            .try_remove_entry("failure reason")
            .map_err(field_error("failure reason"))?
        {
            let reason = match reason {
                Value::String(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                other => format!("<{}>", other.kind()),
            };
            return Err(Error::Tracker(format!("tracker refused announce: {reason}")));
        }
        let interval = match value.take::<usize>("interval") {
            Ok(seconds) => Some(Duration::from_secs(seconds as u64)),
            Err(_) => None,
        };
        let peers: Vec<u8> = value.take("peers").map_err(field_error("peers"))?;
        if peers.len() % COMPACT_PEER_LEN != 0 {
            return Err(Error::Tracker(format!(
                "invalid peers length {}. must be a multiple of {}",
                peers.len(),
                COMPACT_PEER_LEN
            )));
        }
        let peers = peers
            .chunks_exact(COMPACT_PEER_LEN)
            .map(PeerAddress::from_compact)
            .collect();
        Ok(TrackerResponse { interval, peers })
    }
}

/// A peer in the compact model: the host and the port, both in network byte order.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct PeerAddress {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl PeerAddress {
    fn from_compact(bytes: &[u8]) -> Self {
        Self {
            ip: Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]),
            port: u16::from_be_bytes([bytes[4], bytes[5]]),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.ip, self.port))
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}
