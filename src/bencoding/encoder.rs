use crate::bencoding::value::Value;

impl Value {
    /// Encodes the value. Dictionary entries are written in their stored order and never
    /// re-sorted, so a decoded dictionary encodes back to its original bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::String(string) => encode_string(string, out),
            Self::Integer(integer) => {
                out.push(b'i');
                out.extend_from_slice(integer.to_string().as_bytes());
                out.push(b'e');
            }
            Self::List(values) => {
                out.push(b'l');
                for value in values {
                    value.encode_into(out);
                }
                out.push(b'e');
            }
            Self::Dictionary(entries) => {
                out.push(b'd');
                for (key, value) in entries.iter() {
                    encode_string(key, out);
                    value.encode_into(out);
                }
                out.push(b'e');
            }
        }
    }
}

fn encode_string(string: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(string.len().to_string().as_bytes());
    out.push(b':');
    out.extend_from_slice(string);
}
