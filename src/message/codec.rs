use std::io::{Error, ErrorKind, Result};

use bit_set::BitSet;
use tokio_util::bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::TransportMessage;
use crate::message::{Block, BlockData, Message, MessageId};

const LENGTH_SIZE: usize = 4;

/// Frames messages as `<length prefix><message ID><payload>`, with the length prefix counting
/// the ID byte plus the payload.
pub struct MessageCodec {
    max_length: usize,
}

impl MessageCodec {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(item.transport_bytes());
        match item {
            Message::KeepAlive => dst.put_u32(0),
            Message::Choke => put_header(dst, MessageId::Choke, 0),
            Message::Unchoke => put_header(dst, MessageId::Unchoke, 0),
            Message::Interested => put_header(dst, MessageId::Interested, 0),
            Message::NotInterested => put_header(dst, MessageId::NotInterested, 0),
            Message::Have(piece) => {
                put_header(dst, MessageId::Have, 4);
                dst.put_u32(piece as u32);
            }
            Message::Bitfield(bitset) => {
                let bytes = bitset.get_ref().to_bytes();
                put_header(dst, MessageId::Bitfield, bytes.len());
                dst.extend_from_slice(&bytes);
            }
            Message::Request(block) => {
                put_header(dst, MessageId::Request, 12);
                encode_block(block, dst);
            }
            Message::Piece(BlockData {
                piece,
                offset,
                data,
            }) => {
                put_header(dst, MessageId::Piece, 8 + data.len());
                dst.put_u32(piece as u32);
                dst.put_u32(offset as u32);
                dst.extend_from_slice(&data);
            }
            Message::Cancel(block) => {
                put_header(dst, MessageId::Cancel, 12);
                encode_block(block, dst);
            }
        }
        Ok(())
    }
}

fn put_header(dst: &mut BytesMut, id: MessageId, payload_length: usize) {
    dst.put_u32(1 + payload_length as u32);
    dst.put_u8(id as u8);
}

fn encode_block(block: Block, dst: &mut BytesMut) {
    dst.put_u32(block.piece as u32);
    dst.put_u32(block.offset as u32);
    dst.put_u32(block.length as u32);
}

impl Decoder for MessageCodec {
    type Error = std::io::Error;
    type Item = Message;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.len() < LENGTH_SIZE {
            // Not enough data to read length marker.
            return Ok(None);
        }

        let mut length_bytes = [0; LENGTH_SIZE];
        length_bytes.copy_from_slice(&src[0..LENGTH_SIZE]);
        let length = u32::from_be_bytes(length_bytes) as usize;

        if length == 0 {
            src.advance(LENGTH_SIZE);
            return Ok(Some(Message::KeepAlive));
        }

        if length > self.max_length {
            src.advance(LENGTH_SIZE);
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!(
                    "message length {} exceeds maximum of {}",
                    length, self.max_length
                ),
            ));
        }

        if src.len() < LENGTH_SIZE + length {
            src.reserve(LENGTH_SIZE + length - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_SIZE);
        let id = src.get_u8();
        let payload_length = length - 1;
        let message = match (MessageId::try_from(id), payload_length) {
            (Ok(MessageId::Choke), 0) => Message::Choke,
            (Ok(MessageId::Unchoke), 0) => Message::Unchoke,
            (Ok(MessageId::Interested), 0) => Message::Interested,
            (Ok(MessageId::NotInterested), 0) => Message::NotInterested,
            (Ok(MessageId::Have), 4) => Message::Have(src.get_u32() as usize),
            (Ok(MessageId::Bitfield), _) => {
                let bitset = BitSet::from_bytes(&src[0..payload_length]);
                src.advance(payload_length);
                Message::Bitfield(bitset)
            }
            (Ok(MessageId::Request), 12) => Message::Request(decode_block(src)),
            (Ok(MessageId::Piece), 8..) => {
                let piece = src.get_u32() as usize;
                let offset = src.get_u32() as usize;
                let data_length = payload_length - 8;
                let data = src[0..data_length].to_vec();
                src.advance(data_length);
                Message::Piece(BlockData {
                    piece,
                    offset,
                    data,
                })
            }
            (Ok(MessageId::Cancel), 12) => Message::Cancel(decode_block(src)),
            _ => {
                src.advance(payload_length);
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    format!("invalid message id {} with length {}", id, length),
                ));
            }
        };
        Ok(Some(message))
    }
}

fn decode_block(src: &mut BytesMut) -> Block {
    let piece = src.get_u32() as usize;
    let offset = src.get_u32() as usize;
    let length = src.get_u32() as usize;
    Block::new(piece, offset, length)
}

impl TransportMessage for Message {
    fn transport_bytes(&self) -> usize {
        let payload_size = match self {
            Self::KeepAlive => 0,
            Self::Choke => 1,
            Self::Unchoke => 1,
            Self::Interested => 1,
            Self::NotInterested => 1,
            Self::Have(_) => 5,
            Self::Bitfield(bitset) => 1 + bitset.get_ref().to_bytes().len(),
            Self::Request(_) => 13,
            Self::Piece(block) => 9 + block.data.len(),
            Self::Cancel(_) => 13,
        };
        LENGTH_SIZE + payload_size
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Seek};

    use futures::{SinkExt, StreamExt};
    use tokio_util::codec::Framed;

    use super::*;

    fn encode(message: Message) -> Vec<u8> {
        let mut dst = BytesMut::new();
        MessageCodec::new(16393)
            .encode(message, &mut dst)
            .expect("unable to encode");
        dst.to_vec()
    }

    #[test]
    fn interested_has_empty_payload() {
        assert_eq!(encode(Message::Interested), vec![0, 0, 0, 1, 2]);
    }

    #[test]
    fn request_wire_format() {
        assert_eq!(
            encode(Message::Request(Block::new(1, 16384, 3616))),
            vec![0, 0, 0, 13, 6, 0, 0, 0, 1, 0, 0, 0x40, 0, 0, 0, 0x0e, 0x20]
        );
    }

    #[test]
    fn decode_piece() {
        let mut src = BytesMut::from(&[0, 0, 0, 12, 7, 0, 0, 0, 2, 0, 0, 0, 0, 9, 8, 7][..]);

        let message = MessageCodec::new(16393).decode(&mut src).expect("invalid frame");

        assert_eq!(
            message,
            Some(Message::Piece(BlockData {
                piece: 2,
                offset: 0,
                data: vec![9, 8, 7]
            }))
        );
        assert!(src.is_empty());
    }

    #[test]
    fn decode_bitfield_high_bit_first() {
        let mut src = BytesMut::from(&[0, 0, 0, 2, 5, 0b1010_0000][..]);

        let message = MessageCodec::new(16393).decode(&mut src).expect("invalid frame");

        let Some(Message::Bitfield(bitset)) = message else {
            panic!("expected bitfield, got {message:?}");
        };
        assert!(bitset.contains(0));
        assert!(!bitset.contains(1));
        assert!(bitset.contains(2));
    }

    #[test]
    fn wait_for_complete_frame() {
        let mut codec = MessageCodec::new(16393);
        let mut src = BytesMut::from(&[0, 0, 0, 5, 4, 0][..]);

        assert_eq!(codec.decode(&mut src).expect("invalid frame"), None);

        src.extend_from_slice(&[0, 0, 3]);
        assert_eq!(
            codec.decode(&mut src).expect("invalid frame"),
            Some(Message::Have(3))
        );
    }

    #[test]
    fn keep_alive() {
        let mut src = BytesMut::from(&[0, 0, 0, 0][..]);

        let message = MessageCodec::new(16393).decode(&mut src).expect("invalid frame");

        assert_eq!(message, Some(Message::KeepAlive));
    }

    #[test]
    fn fail_for_unknown_id() {
        let mut src = BytesMut::from(&[0, 0, 0, 3, 9, 0x1a, 0xe1][..]);

        assert!(MessageCodec::new(16393).decode(&mut src).is_err());
    }

    #[test]
    fn fail_for_wrong_fixed_length() {
        let mut src = BytesMut::from(&[0, 0, 0, 2, 1, 0][..]);

        assert!(MessageCodec::new(16393).decode(&mut src).is_err());
    }

    #[tokio::test]
    async fn verify_max_length() {
        let message = Message::Piece(BlockData {
            piece: 1,
            offset: 2,
            data: vec![1, 2, 3],
        });
        let length = message.transport_bytes();
        let cursor = Cursor::new(Vec::with_capacity(length));
        let mut framed = Framed::new(cursor, MessageCodec::new(5));

        framed.send(message.clone()).await.expect("unable to write");
        assert_eq!(length, framed.get_ref().position() as usize);
        framed.get_mut().rewind().expect("unable to rewind");
        let message_read = framed.next().await.expect("empty");
        assert!(message_read.is_err());
    }
}
