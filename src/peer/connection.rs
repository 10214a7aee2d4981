use std::io::ErrorKind;
use std::net::SocketAddr;

use bit_set::BitSet;
use futures::{SinkExt, StreamExt};
use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::codec::{AsyncDecoder, AsyncEncoder};
use crate::core::PeerId;
use crate::error::{Error, Result};
use crate::message::{BlockData, Handshake, Message, MessageCodec, MessageId};

/// A peer connection past the handshake.
///
/// A raw stream becomes a `Connection` only once both handshakes have been exchanged, so holding
/// one means the handshake is confirmed. Any error leaves the connection unusable, and it is
/// closed when dropped or through [`Connection::close`].
pub struct Connection<S> {
    peer_id: PeerId,
    messages: Framed<S, MessageCodec>,
}

impl Connection<TcpStream> {
    pub async fn open(addr: SocketAddr, handshake: &Handshake, max_length: usize) -> Result<Self> {
        info!("connecting to {}...", addr);
        let socket = TcpStream::connect(addr).await?;
        Self::handshake(socket, handshake, max_length).await
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Sends our handshake, then reads exactly one handshake back. The reply must be for the
    /// same torrent.
    pub async fn handshake(mut stream: S, handshake: &Handshake, max_length: usize) -> Result<Self> {
        handshake
            .encode(&mut stream)
            .await
            .map_err(|err| Error::Handshake(format!("unable to send handshake: {err}")))?;
        debug!("> sent handshake");

        let reply = Handshake::decode(&mut stream)
            .await
            .map_err(|err| match err.kind() {
                ErrorKind::UnexpectedEof => {
                    Error::Handshake("connection closed before handshake completed".to_string())
                }
                _ => Error::Handshake(err.to_string()),
            })?;
        debug!("< got handshake {:?}", reply);

        if reply.info_hash != handshake.info_hash {
            return Err(Error::Handshake(format!(
                "info hash mismatch: sent {}, got {}",
                handshake.info_hash, reply.info_hash
            )));
        }
        if reply.reserved != [0; 8] {
            debug!("peer reserved bits {}, ignored", hex::encode(reply.reserved));
        }
        info!("handshake completed with peer {}", reply.peer_id.to_hex());
        Ok(Self {
            peer_id: reply.peer_id,
            messages: Framed::new(stream, MessageCodec::new(max_length)),
        })
    }

    /// The identifier the remote peer sent in its handshake.
    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub async fn send(&mut self, message: Message) -> Result<()> {
        debug!("> sending {:?}", &message);
        self.messages.send(message).await?;
        Ok(())
    }

    /// Waits for the next message, which must be of the `expected` type. Keep-alives are
    /// skipped.
    pub async fn receive(&mut self, expected: MessageId) -> Result<Message> {
        loop {
            let message = match self.messages.next().await {
                Some(Ok(message)) => message,
                Some(Err(err)) => return Err(frame_error(err)),
                None => {
                    return Err(Error::Protocol(format!(
                        "connection closed while waiting for {:?}",
                        expected
                    )));
                }
            };
            debug!("< got {:?}", message);
            match message.id() {
                None => continue,
                Some(id) if id == expected => return Ok(message),
                Some(_) => return Err(unexpected(expected, &message)),
            }
        }
    }

    pub async fn receive_bitfield(&mut self) -> Result<BitSet> {
        match self.receive(MessageId::Bitfield).await? {
            Message::Bitfield(bitset) => Ok(bitset),
            other => Err(unexpected(MessageId::Bitfield, &other)),
        }
    }

    pub async fn receive_unchoke(&mut self) -> Result<()> {
        match self.receive(MessageId::Unchoke).await? {
            Message::Unchoke => Ok(()),
            other => Err(unexpected(MessageId::Unchoke, &other)),
        }
    }

    pub async fn receive_piece(&mut self) -> Result<BlockData> {
        match self.receive(MessageId::Piece).await? {
            Message::Piece(block_data) => Ok(block_data),
            other => Err(unexpected(MessageId::Piece, &other)),
        }
    }

    /// Flushes pending messages and shuts the stream down.
    pub async fn close(mut self) -> Result<()> {
        self.messages.close().await?;
        Ok(())
    }
}

fn unexpected(expected: MessageId, got: &Message) -> Error {
    Error::Protocol(format!("expected {:?}, got {:?}", expected, got))
}

fn frame_error(err: std::io::Error) -> Error {
    match err.kind() {
        // Decoding failures, and EOF in the middle of a frame.
        ErrorKind::InvalidData | ErrorKind::Other => {
            Error::Protocol(format!("malformed frame: {err}"))
        }
        _ => Error::Io(err),
    }
}
