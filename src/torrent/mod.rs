use url::Url;

use crate::bencoding::{self, Value};
use crate::error::{Error, Result};

mod info;

pub use info::Info;

// https://wiki.theory.org/BitTorrentSpecification#Metainfo_File_Structure

#[derive(Debug, PartialEq, Clone)]
pub struct Torrent {
    pub announce: Url,
    pub info: Info,
}

impl Torrent {
    /// Parses the contents of a `.torrent` file.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let value = bencoding::decode(data)?;
        Torrent::try_from(value)
    }
}

impl TryFrom<Value> for Torrent {
    type Error = Error;

    fn try_from(mut value: Value) -> Result<Self> {
        let announce: String = value
            .take("announce")
            .map_err(|err| Error::Metadata(format!("field `announce`: {err}")))?;
        let announce = Url::parse(&announce)
            .map_err(|err| Error::Metadata(format!("invalid announce url {announce}: {err}")))?;
        let info = value
            .remove_entry("info")
            .map_err(|err| Error::Metadata(format!("field `info`: {err}")))?
            .try_into()?;
        Ok(Torrent { announce, info })
    }
}
