mod decoder;
mod encoder;
mod error;
mod json;
mod value;

pub use decoder::decode;
pub use error::DecodeError;
pub use value::{Value, ValueError};
