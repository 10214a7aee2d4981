use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected end of input at byte {position}")]
    UnexpectedEof { position: usize },

    #[error("unexpected byte 0x{byte:02x} at byte {position}")]
    UnexpectedByte { byte: u8, position: usize },

    #[error("invalid integer at byte {position}")]
    InvalidInteger { position: usize },

    #[error("leading zero at byte {position}")]
    LeadingZero { position: usize },

    #[error("negative zero at byte {position}")]
    NegativeZero { position: usize },

    #[error("string at byte {position} declares {declared} bytes, only {remaining} remain")]
    StringTooLong {
        position: usize,
        declared: usize,
        remaining: usize,
    },

    #[error("dictionary key at byte {position} is not a string")]
    NonStringKey { position: usize },

    #[error("repeated dictionary key at byte {position}")]
    DuplicateKey { position: usize },

    #[error("trailing data at byte {position}")]
    TrailingData { position: usize },

    #[error("nesting too deep at byte {position}")]
    NestingTooDeep { position: usize },
}
