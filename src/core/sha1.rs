use sha1::Digest;

use crate::bencoding::Value;

pub const SHA1_LEN: usize = 20;

#[derive(PartialEq, Eq, Clone, Copy, Hash)]
pub struct Sha1(pub [u8; SHA1_LEN]);

impl Sha1 {
    pub fn digest(data: &[u8]) -> Self {
        Self(sha1::Sha1::digest(data).into())
    }

    #[cfg(test)]
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0; SHA1_LEN];
        hex::decode_to_slice(hex, &mut bytes)?;
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Hash of the value's bencoded form.
impl From<&Value> for Sha1 {
    fn from(value: &Value) -> Self {
        Self::digest(&value.to_bytes())
    }
}

impl std::fmt::Debug for Sha1 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sha1({})", self.to_hex())
    }
}

impl std::fmt::Display for Sha1 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest() {
        assert_eq!(
            Sha1::digest(b"abc"),
            Sha1::from_hex("a9993e364706816aba3e25717850c26c9cd0d89d").unwrap()
        );
    }

    #[test]
    fn same_value_same_hash() {
        let info = Value::dictionary()
            .with_entry("length", Value::Integer(20000))
            .with_entry("name", Value::string("sample.txt"))
            .with_entry("piece length", Value::Integer(16384))
            .with_entry("pieces", Value::String(vec![7; 40]));

        assert_eq!(info.to_bytes(), info.clone().to_bytes());
        assert_eq!(Sha1::from(&info), Sha1::from(&info.clone()));
    }

    #[test]
    fn key_order_changes_hash() {
        let a = Value::dictionary()
            .with_entry("a", Value::Integer(1))
            .with_entry("b", Value::Integer(2));
        let b = Value::dictionary()
            .with_entry("b", Value::Integer(2))
            .with_entry("a", Value::Integer(1));

        assert_ne!(Sha1::from(&a), Sha1::from(&b));
    }

    #[test]
    fn invalid_hex() {
        assert!(Sha1::from_hex("abc").is_err());
    }
}
