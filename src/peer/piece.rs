use log::warn;

use crate::core::Sha1;
use crate::error::{Error, Result};
use crate::message::{Block, BlockData};

/// Splits a piece into contiguous blocks of at most `block_size` bytes, in ascending offset
/// order. Only the last block may be shorter.
pub fn blocks(piece: usize, piece_size: usize, block_size: usize) -> impl Iterator<Item = Block> {
    let block_size = block_size.max(1);
    (0..piece_size)
        .step_by(block_size)
        .map(move |offset| Block::new(piece, offset, block_size.min(piece_size - offset)))
}

/// Collects the blocks of a single piece, in request order, until it can be verified.
pub struct PieceBuffer {
    piece: usize,
    size: usize,
    sha1: Sha1,
    data: Vec<u8>,
}

impl PieceBuffer {
    pub fn new(piece: usize, size: usize, sha1: Sha1) -> Self {
        Self {
            piece,
            size,
            sha1,
            data: Vec::with_capacity(size),
        }
    }

    /// Appends the data received for `block`, which must be the next block of this piece.
    pub fn add(&mut self, block: &Block, block_data: BlockData) -> Result<()> {
        let received = Block::from(&block_data);
        if received != *block {
            return Err(Error::Protocol(format!(
                "requested {:?}, got {:?}",
                block, received
            )));
        }
        if block.piece != self.piece || block.offset != self.data.len() {
            return Err(Error::Protocol(format!(
                "{:?} does not continue piece {} at offset {}",
                block,
                self.piece,
                self.data.len()
            )));
        }
        self.data.extend_from_slice(&block_data.data);
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.data.len() == self.size
    }

    /// Consumes the buffer, returning the piece if its SHA1 matches the expected one.
    pub fn verify(self) -> Result<Vec<u8>> {
        if !self.is_complete() {
            return Err(Error::Incomplete {
                expected: self.size,
                actual: self.data.len(),
            });
        }
        if Sha1::digest(&self.data) != self.sha1 {
            warn!("piece {} sha1 mismatch", self.piece);
            return Err(Error::Integrity { piece: self.piece });
        }
        Ok(self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_data(piece: usize, offset: usize, data: &[u8]) -> BlockData {
        BlockData {
            piece,
            offset,
            data: data.to_vec(),
        }
    }

    #[test]
    fn split_into_blocks() {
        let blocks: Vec<_> = blocks(3, 20000, 16384).collect();

        assert_eq!(
            blocks,
            vec![Block::new(3, 0, 16384), Block::new(3, 16384, 3616)]
        );
    }

    #[test]
    fn piece_smaller_than_block() {
        let blocks: Vec<_> = blocks(1, 3616, 16384).collect();

        assert_eq!(blocks, vec![Block::new(1, 0, 3616)]);
    }

    #[test]
    fn exact_multiple_of_block_size() {
        let lengths: Vec<_> = blocks(0, 32768, 16384).map(|block| block.length).collect();

        assert_eq!(lengths, vec![16384, 16384]);
    }

    #[test]
    fn piece_complete() {
        let mut buffer = PieceBuffer::new(0, 8, Sha1::digest(&[0, 0, 0, 0, 1, 1, 1, 1]));

        buffer
            .add(&Block::new(0, 0, 4), block_data(0, 0, &[0; 4]))
            .expect("unexpected block");
        assert!(!buffer.is_complete());
        buffer
            .add(&Block::new(0, 4, 4), block_data(0, 4, &[1; 4]))
            .expect("unexpected block");

        assert_eq!(buffer.verify().expect("invalid piece"), vec![0, 0, 0, 0, 1, 1, 1, 1]);
    }

    #[test]
    fn piece_complete_but_invalid() {
        let mut buffer = PieceBuffer::new(2, 4, Sha1([0; 20]));

        buffer
            .add(&Block::new(2, 0, 4), block_data(2, 0, &[0; 4]))
            .expect("unexpected block");

        assert!(matches!(buffer.verify(), Err(Error::Integrity { piece: 2 })));
    }

    #[test]
    fn reject_block_for_other_offset() {
        let mut buffer = PieceBuffer::new(0, 8, Sha1([0; 20]));

        let result = buffer.add(&Block::new(0, 0, 4), block_data(0, 4, &[0; 4]));

        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[test]
    fn reject_short_block() {
        let mut buffer = PieceBuffer::new(0, 8, Sha1([0; 20]));

        let result = buffer.add(&Block::new(0, 0, 4), block_data(0, 0, &[0; 3]));

        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[test]
    fn incomplete_piece() {
        let buffer = PieceBuffer::new(0, 8, Sha1([0; 20]));

        assert!(matches!(
            buffer.verify(),
            Err(Error::Incomplete {
                expected: 8,
                actual: 0
            })
        ));
    }
}
