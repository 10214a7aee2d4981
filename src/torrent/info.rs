use crate::bencoding::{Value, ValueError};
use crate::core::{SHA1_LEN, Sha1};
use crate::error::{Error, Result};

/// The `info` dictionary of a single-file torrent.
#[derive(Debug, PartialEq, Clone)]
pub struct Info {
    /// SHA1 of the `info` dictionary exactly as it was encoded in the metainfo file.
    pub info_hash: Sha1,
    pub name: Option<String>,
    pub length: usize,
    pub piece_length: usize,
    pub pieces: Vec<Sha1>,
}

impl Info {
    fn build_pieces(pieces: &[u8]) -> Result<Vec<Sha1>> {
        if pieces.len() % SHA1_LEN != 0 {
            return Err(Error::Metadata(format!(
                "invalid pieces length {}. must be a multiple of {}",
                pieces.len(),
                SHA1_LEN
            )));
        }
        let mut all = Vec::with_capacity(pieces.len() / SHA1_LEN);
        for chunk in pieces.chunks_exact(SHA1_LEN) {
            let mut bytes = [0; SHA1_LEN];
            bytes.copy_from_slice(chunk);
            all.push(Sha1(bytes));
        }
        Ok(all)
    }

    pub fn total_pieces(&self) -> usize {
        self.pieces.len()
    }

    pub fn piece_offset(&self, piece: usize) -> usize {
        self.piece_length * piece
    }

    /// Size of the given piece; only the last one may be shorter than `piece_length`.
    pub fn piece_size(&self, piece: usize) -> usize {
        let piece_start = self.piece_offset(piece).min(self.length);
        let piece_end = (piece_start + self.piece_length).min(self.length);
        piece_end - piece_start
    }

    pub fn piece_hash(&self, piece: usize) -> Option<&Sha1> {
        self.pieces.get(piece)
    }
}

fn field_error(key: &'static str) -> impl FnOnce(ValueError) -> Error {
    move |err| Error::Metadata(format!("info field `{key}`: {err}"))
}

impl TryFrom<Value> for Info {
    type Error = Error;

    fn try_from(mut value: Value) -> Result<Self> {
        if !matches!(value, Value::Dictionary(_)) {
            return Err(Error::Metadata(format!(
                "`info` must be a dictionary, found {}",
                value.kind()
            )));
        }
        let info_hash = Sha1::from(&value);
        let length: usize = value.take("length").map_err(field_error("length"))?;
        let piece_length: usize = value
            .take("piece length")
            .map_err(field_error("piece length"))?;
        if piece_length == 0 {
            return Err(Error::Metadata("piece length must be positive".to_string()));
        }
        let pieces: Vec<u8> = value.take("pieces").map_err(field_error("pieces"))?;
        let pieces = Info::build_pieces(&pieces)?;
        let expected = length.div_ceil(piece_length);
        if pieces.len() != expected {
            return Err(Error::Metadata(format!(
                "{} piece hashes for {} pieces",
                pieces.len(),
                expected
            )));
        }
        let name = match value.take::<String>("name") {
            Ok(name) => Some(name),
            Err(_) => None,
        };
        Ok(Info {
            info_hash,
            name,
            length,
            piece_length,
            pieces,
        })
    }
}
