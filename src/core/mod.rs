mod peer_id;
mod sha1;

pub use self::peer_id::PeerId;
pub use self::sha1::{SHA1_LEN, Sha1};
