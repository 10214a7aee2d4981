use size::Size;

use crate::core::PeerId;

/// Largest block peers are expected to serve.
pub const MAX_BLOCK_SIZE: Size = Size::from_const(16 * size::KiB);

/// Configuration settings for the client
#[derive(Clone, Debug)]
pub struct Config {
    /// Identifier sent to the tracker and in handshakes
    pub client_id: PeerId,
    /// Port reported to the tracker
    pub port: u16,
    /// Size of the blocks a piece is requested in. Peers reject requests above 16 KiB.
    pub block_size: Size,
}

impl Config {
    #[cfg(test)]
    pub fn with_client_id(mut self, client_id: PeerId) -> Self {
        self.client_id = client_id;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sizes above [`MAX_BLOCK_SIZE`] are clamped to it.
    pub fn with_block_size(mut self, size: Size) -> Self {
        self.block_size = Size::from_bytes(size.bytes().min(MAX_BLOCK_SIZE.bytes()));
        self
    }

    pub fn block_size(&self) -> usize {
        self.block_size.bytes() as usize
    }

    /// Largest frame accepted from a peer: a full block in a piece message, or a bitfield
    /// covering every piece.
    pub fn max_frame_length(&self, total_pieces: usize) -> usize {
        (self.block_size() + 9).max(total_pieces.div_ceil(8) + 1)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: PeerId::random(),
            port: 6881,
            block_size: MAX_BLOCK_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_block_size() {
        assert_eq!(Config::default().block_size(), 16384);
    }

    #[test]
    fn max_frame_length() {
        let config = Config::default();

        assert_eq!(config.max_frame_length(10), 16393);
        assert_eq!(config.max_frame_length(200_000), 25001);
    }

    #[test]
    fn builder() {
        let config = Config::default()
            .with_client_id(PeerId([1; 20]))
            .with_port(6889)
            .with_block_size(Size::from_bytes(4));

        assert_eq!(config.client_id, PeerId([1; 20]));
        assert_eq!(config.port, 6889);
        assert_eq!(config.block_size(), 4);
    }

    #[test]
    fn block_size_above_maximum_is_clamped() {
        let config = Config::default().with_block_size(Size::from_kibibytes(32));

        assert_eq!(config.block_size(), 16384);
        assert_eq!(config.max_frame_length(10), 16393);
    }
}
