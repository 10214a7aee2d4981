use thiserror::Error;

use crate::bencoding::DecodeError;

/// Every failure is fatal to the operation that raised it; nothing here is retried.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed bencode: {0}")]
    Decode(#[from] DecodeError),

    #[error("invalid metainfo: {0}")]
    Metadata(String),

    #[error("tracker error: {0}")]
    Tracker(String),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("piece {piece} out of range, torrent has {total} pieces")]
    PieceOutOfRange { piece: usize, total: usize },

    #[error("piece {piece} failed hash verification")]
    Integrity { piece: usize },

    #[error("incomplete download: got {actual} of {expected} bytes")]
    Incomplete { expected: usize, actual: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
