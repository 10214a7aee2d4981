use std::io::Result;

use tokio::io::{AsyncRead, AsyncWrite};

/// Values written straight to a stream, outside of any framing.
pub trait AsyncEncoder {
    async fn encode<S: AsyncWrite + Unpin>(&self, stream: &mut S) -> Result<()>;
}

/// Values read straight from a stream, outside of any framing.
pub trait AsyncDecoder: Sized {
    async fn decode<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Self>;
}

pub trait TransportMessage {
    /// Bytes this message occupies on the wire, length prefix included.
    fn transport_bytes(&self) -> usize;
}
