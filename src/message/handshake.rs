use std::io::{Error, ErrorKind, Result};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::codec::{AsyncDecoder, AsyncEncoder};
use crate::core::{PeerId, SHA1_LEN, Sha1};

const PROTOCOL: &[u8; 19] = b"BitTorrent protocol";
const RESERVED_LEN: usize = 8;

/// Length of a version 1.0 handshake, in both directions.
pub const HANDSHAKE_LEN: usize = 1 + PROTOCOL.len() + RESERVED_LEN + SHA1_LEN + 20;

/// The handshake is a required message and must be the first message transmitted by the client.
///
/// _handshake: <pstrlen><pstr><reserved><info\_hash><peer\_id>_
///
/// * **pstrlen**: string length of <pstr>, as a single raw byte
/// * **pstr**: string identifier of the protocol
/// * **reserved**: eight (8) reserved bytes. All current implementations use all zeroes. Each bit
///   in these bytes can be used to change the behavior of the protocol.
/// * **info\_hash**: 20-byte SHA1 hash of the info key in the metainfo file. This is the same
///   info\_hash that is transmitted in tracker requests.
/// * **peer\_id**: 20-byte string used as a unique ID for the client.
///
/// In version 1.0 of the BitTorrent protocol, pstrlen = 19, and pstr = "BitTorrent protocol",
/// which makes the whole message 68 bytes long.
///
/// If a client receives a handshake with an info\_hash that it is not currently serving, then the
/// client must drop the connection.
#[derive(Debug, PartialEq, Clone)]
pub struct Handshake {
    pub reserved: [u8; RESERVED_LEN],
    pub info_hash: Sha1,
    pub peer_id: PeerId,
}

impl Handshake {
    pub fn new(info_hash: Sha1, peer_id: PeerId) -> Self {
        Self {
            reserved: [0; RESERVED_LEN],
            info_hash,
            peer_id,
        }
    }

    pub fn to_bytes(&self) -> [u8; HANDSHAKE_LEN] {
        let mut buf = [0; HANDSHAKE_LEN];
        buf[0] = PROTOCOL.len() as u8;
        buf[1..20].copy_from_slice(PROTOCOL);
        buf[20..28].copy_from_slice(&self.reserved);
        buf[28..48].copy_from_slice(&self.info_hash.0);
        buf[48..68].copy_from_slice(&self.peer_id.0);
        buf
    }

    fn from_bytes(buf: &[u8; HANDSHAKE_LEN]) -> Result<Self> {
        if buf[0] as usize != PROTOCOL.len() || &buf[1..20] != PROTOCOL {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!(
                    "invalid handshake protocol: {:?}",
                    String::from_utf8_lossy(&buf[1..20])
                ),
            ));
        }
        let mut reserved = [0; RESERVED_LEN];
        reserved.copy_from_slice(&buf[20..28]);
        let mut info_hash = [0; SHA1_LEN];
        info_hash.copy_from_slice(&buf[28..48]);
        let mut peer_id = [0; 20];
        peer_id.copy_from_slice(&buf[48..68]);
        Ok(Handshake {
            reserved,
            info_hash: Sha1(info_hash),
            peer_id: PeerId(peer_id),
        })
    }
}

impl AsyncDecoder for Handshake {
    async fn decode<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Self> {
        let mut buf = [0; HANDSHAKE_LEN];
        stream.read_exact(&mut buf).await?;
        Handshake::from_bytes(&buf)
    }
}

impl AsyncEncoder for Handshake {
    async fn encode<S: AsyncWrite + Unpin>(&self, stream: &mut S) -> Result<()> {
        stream.write_all(&self.to_bytes()).await?;
        stream.flush().await?;
        Ok(())
    }
}
