use bit_set::BitSet;
use log::{debug, info, warn};
use size::Size;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;

use crate::client::Config;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::peer::connection::Connection;
use crate::peer::piece::{PieceBuffer, blocks};
use crate::torrent::Info;

/// Downloads pieces from a single peer, one block request at a time.
pub struct Downloader<'a, S> {
    connection: Connection<S>,
    info: &'a Info,
    block_size: usize,
    available: BitSet,
}

impl<'a, S: AsyncRead + AsyncWrite + Unpin> Downloader<'a, S> {
    /// Runs the session preamble: the peer's bitfield, our interest, then the peer's unchoke.
    /// Anything else arriving in between fails the session.
    pub async fn start(
        mut connection: Connection<S>,
        info: &'a Info,
        config: &Config,
    ) -> Result<Self> {
        let available = connection.receive_bitfield().await?;
        connection.send(Message::Interested).await?;
        connection.receive_unchoke().await?;
        info!(
            "unchoked by peer {}, it has {} of {} pieces",
            connection.peer_id().to_hex(),
            available.len(),
            info.total_pieces()
        );
        Ok(Self {
            connection,
            info,
            block_size: config.block_size(),
            available,
        })
    }

    /// Downloads and verifies a single piece.
    pub async fn download_piece(&mut self, piece: usize) -> Result<Vec<u8>> {
        let total = self.info.total_pieces();
        let sha1 = *self
            .info
            .piece_hash(piece)
            .ok_or(Error::PieceOutOfRange { piece, total })?;
        if !self.available.contains(piece) {
            warn!("peer did not announce piece {}, requesting anyway", piece);
        }

        let started = Instant::now();
        let piece_size = self.info.piece_size(piece);
        let mut buffer = PieceBuffer::new(piece, piece_size, sha1);
        for block in blocks(piece, piece_size, self.block_size) {
            self.connection.send(Message::Request(block)).await?;
            let block_data = self.connection.receive_piece().await?;
            buffer.add(&block, block_data)?;
        }
        let data = buffer.verify()?;
        info!(
            "piece {} verified ({}) in {:?}",
            piece,
            Size::from_bytes(data.len()),
            started.elapsed()
        );
        Ok(data)
    }

    /// Downloads every piece in order. The first failure aborts the download and discards
    /// whatever was already received.
    pub async fn download_all(&mut self) -> Result<Vec<u8>> {
        let mut file = Vec::with_capacity(self.info.length);
        for piece in 0..self.info.total_pieces() {
            let data = self.download_piece(piece).await?;
            file.extend_from_slice(&data);
            debug!("{} of {} pieces done", piece + 1, self.info.total_pieces());
        }
        if file.len() != self.info.length {
            return Err(Error::Incomplete {
                expected: self.info.length,
                actual: file.len(),
            });
        }
        info!("download complete ({})", Size::from_bytes(file.len()));
        Ok(file)
    }

    pub async fn finish(self) -> Result<()> {
        self.connection.close().await
    }
}
