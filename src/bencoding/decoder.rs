use crate::bencoding::error::DecodeError;
use crate::bencoding::value::{Dictionary, Value};

const MAX_DEPTH: usize = 64;

/// Decodes a single bencoded value which must span the whole input.
pub fn decode(data: &[u8]) -> Result<Value, DecodeError> {
    let (value, end) = decode_at(data, 0, 0)?;
    if end != data.len() {
        return Err(DecodeError::TrailingData { position: end });
    }
    Ok(value)
}

impl TryFrom<&[u8]> for Value {
    type Error = DecodeError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        decode(data)
    }
}

/// Decodes the value starting at `start`, returning it along with the position immediately
/// following its encoding.
fn decode_at(data: &[u8], start: usize, depth: usize) -> Result<(Value, usize), DecodeError> {
    if depth > MAX_DEPTH {
        return Err(DecodeError::NestingTooDeep { position: start });
    }
    match data.get(start) {
        Some(b'0'..=b'9') => decode_string(data, start),
        Some(b'i') => decode_integer(data, start),
        Some(b'l') => decode_list(data, start, depth),
        Some(b'd') => decode_dictionary(data, start, depth),
        Some(&byte) => Err(DecodeError::UnexpectedByte {
            byte,
            position: start,
        }),
        None => Err(DecodeError::UnexpectedEof { position: start }),
    }
}

fn decode_string(data: &[u8], start: usize) -> Result<(Value, usize), DecodeError> {
    let (begin, end) = string_span(data, start)?;
    Ok((Value::String(data[begin..end].to_vec()), end))
}

fn decode_integer(data: &[u8], start: usize) -> Result<(Value, usize), DecodeError> {
    let end = integer_end(data, start)?;
    let digits = &data[(start + 1)..end];
    let magnitude = match digits.split_first() {
        Some((&b'-', rest)) => rest,
        _ => digits,
    };
    if magnitude.is_empty() || !magnitude.iter().all(u8::is_ascii_digit) {
        return Err(DecodeError::InvalidInteger { position: start });
    }
    if magnitude[0] == b'0' && magnitude.len() > 1 {
        return Err(DecodeError::LeadingZero { position: start });
    }
    if magnitude.len() < digits.len() && magnitude == b"0" {
        return Err(DecodeError::NegativeZero { position: start });
    }
    // Only ASCII digits and an optional sign remain, so this is valid UTF-8.
    let integer = std::str::from_utf8(digits)
        .ok()
        .and_then(|digits| digits.parse::<i64>().ok())
        .ok_or(DecodeError::InvalidInteger { position: start })?;
    Ok((Value::Integer(integer), end + 1))
}

fn decode_list(data: &[u8], start: usize, depth: usize) -> Result<(Value, usize), DecodeError> {
    let end = container_end(data, start)?;
    // Children are decoded against the container content only, so none can run past its `e`.
    let content = &data[..(end - 1)];
    let mut values = Vec::new();
    let mut position = start + 1;
    while position < content.len() {
        let (value, next) = decode_at(content, position, depth + 1)?;
        values.push(value);
        position = next;
    }
    Ok((Value::List(values), end))
}

fn decode_dictionary(
    data: &[u8],
    start: usize,
    depth: usize,
) -> Result<(Value, usize), DecodeError> {
    let end = container_end(data, start)?;
    let content = &data[..(end - 1)];
    let mut entries = Dictionary::new();
    let mut position = start + 1;
    while position < content.len() {
        if !content[position].is_ascii_digit() {
            return Err(DecodeError::NonStringKey { position });
        }
        let (begin, key_end) = string_span(content, position)?;
        let key = content[begin..key_end].to_vec();
        if entries.get(&key).is_some() {
            return Err(DecodeError::DuplicateKey { position });
        }
        let (value, next) = decode_at(content, key_end, depth + 1)?;
        entries.insert(key, value);
        position = next;
    }
    Ok((Value::Dictionary(entries), end))
}

/// Returns the position immediately after the `e` closing the list or dictionary that opens at
/// `start`. String contents are skipped by their declared length, so content bytes are never
/// taken for structure.
fn container_end(data: &[u8], start: usize) -> Result<usize, DecodeError> {
    let mut depth = 0;
    let mut position = start;
    loop {
        match data.get(position) {
            Some(b'l' | b'd') => {
                depth += 1;
                if depth > MAX_DEPTH {
                    return Err(DecodeError::NestingTooDeep { position });
                }
                position += 1;
            }
            Some(b'e') => {
                depth -= 1;
                position += 1;
                if depth == 0 {
                    return Ok(position);
                }
            }
            Some(b'i') => position = integer_end(data, position)? + 1,
            Some(b'0'..=b'9') => position = string_span(data, position)?.1,
            Some(&byte) => return Err(DecodeError::UnexpectedByte { byte, position }),
            None => return Err(DecodeError::UnexpectedEof { position }),
        }
    }
}

/// Position of the `e` terminating the integer that opens at `start`.
fn integer_end(data: &[u8], start: usize) -> Result<usize, DecodeError> {
    data[(start + 1)..]
        .iter()
        .position(|&byte| byte == b'e')
        .map(|offset| start + 1 + offset)
        .ok_or(DecodeError::UnexpectedEof {
            position: data.len(),
        })
}

/// Returns the `[begin, end)` range of the contents of the string that opens at `start`.
fn string_span(data: &[u8], start: usize) -> Result<(usize, usize), DecodeError> {
    let mut declared: usize = 0;
    let mut position = start;
    let begin = loop {
        match data.get(position) {
            Some(b':') if position > start => break position + 1,
            Some(&byte @ b'0'..=b'9') => {
                if position > start && data[start] == b'0' {
                    return Err(DecodeError::LeadingZero { position: start });
                }
                declared = declared
                    .checked_mul(10)
                    .and_then(|length| length.checked_add((byte - b'0') as usize))
                    .ok_or(DecodeError::InvalidInteger { position: start })?;
                position += 1;
            }
            Some(&byte) => return Err(DecodeError::UnexpectedByte { byte, position }),
            None => return Err(DecodeError::UnexpectedEof { position }),
        }
    };
    let remaining = data.len() - begin;
    if declared > remaining {
        return Err(DecodeError::StringTooLong {
            position: start,
            declared,
            remaining,
        });
    }
    Ok((begin, begin + declared))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error() {
        assert!(decode(b"foo").is_err());
    }

    #[test]
    fn string() {
        assert_eq!(decode(b"4:spam"), Ok(Value::string("spam")));
    }

    #[test]
    fn empty_string() {
        assert_eq!(decode(b"0:"), Ok(Value::string("")));
    }

    #[test]
    fn binary_string() {
        assert_eq!(
            decode(b"3:\x00\xffe"),
            Ok(Value::String(vec![0x00, 0xff, b'e']))
        );
    }

    #[test]
    fn fail_for_string_longer_than_input() {
        assert_eq!(
            decode(b"5:spam"),
            Err(DecodeError::StringTooLong {
                position: 0,
                declared: 5,
                remaining: 4
            })
        );
    }

    #[test]
    fn fail_for_string_length_with_leading_zero() {
        assert_eq!(
            decode(b"04:spam"),
            Err(DecodeError::LeadingZero { position: 0 })
        );
    }

    #[test]
    fn integers() {
        assert_eq!(decode(b"i0e"), Ok(Value::Integer(0)));
        assert_eq!(decode(b"i-5e"), Ok(Value::Integer(-5)));
        assert_eq!(decode(b"i123456789e"), Ok(Value::Integer(123456789)));
    }

    #[test]
    fn fail_for_leading_zero() {
        assert_eq!(decode(b"i03e"), Err(DecodeError::LeadingZero { position: 0 }));
        assert_eq!(
            decode(b"i-03e"),
            Err(DecodeError::LeadingZero { position: 0 })
        );
    }

    #[test]
    fn fail_for_minus_zero() {
        assert_eq!(
            decode(b"i-0e"),
            Err(DecodeError::NegativeZero { position: 0 })
        );
    }

    #[test]
    fn fail_for_malformed_integers() {
        assert!(decode(b"ie").is_err());
        assert!(decode(b"i-e").is_err());
        assert!(decode(b"i1-2e").is_err());
        assert!(decode(b"i99999999999999999999e").is_err());
        assert_eq!(decode(b"i42"), Err(DecodeError::UnexpectedEof { position: 3 }));
    }

    #[test]
    fn list() {
        assert_eq!(
            decode(b"l4:spam4:eggse"),
            Ok(Value::list()
                .with_value(Value::string("spam"))
                .with_value(Value::string("eggs")))
        );
    }

    #[test]
    fn empty_containers() {
        assert_eq!(decode(b"le"), Ok(Value::list()));
        assert_eq!(decode(b"de"), Ok(Value::dictionary()));
    }

    #[test]
    fn dictionary() {
        assert_eq!(
            decode(b"d3:cow3:moo4:spam4:eggse"),
            Ok(Value::dictionary()
                .with_entry("cow", Value::string("moo"))
                .with_entry("spam", Value::string("eggs")))
        );
    }

    #[test]
    fn dictionary_with_list() {
        assert_eq!(
            decode(b"d4:spaml1:a1:bee"),
            Ok(Value::dictionary().with_entry(
                "spam",
                Value::list()
                    .with_value(Value::string("a"))
                    .with_value(Value::string("b"))
            ))
        );
    }

    #[test]
    fn unsorted_dictionary_keeps_order() {
        let value = decode(b"d4:spami1e3:cowi2ee").expect("invalid dictionary");
        let Value::Dictionary(entries) = value else {
            panic!("expected dictionary");
        };
        let keys: Vec<_> = entries.iter().map(|(key, _)| key.to_vec()).collect();

        assert_eq!(keys, vec![b"spam".to_vec(), b"cow".to_vec()]);
    }

    #[test]
    fn structural_bytes_inside_strings() {
        assert_eq!(
            decode(b"d1:el2:ee1:dee"),
            Ok(Value::dictionary().with_entry(
                "e",
                Value::list()
                    .with_value(Value::string("ee"))
                    .with_value(Value::string("d"))
            ))
        );
    }

    #[test]
    fn deeply_nested_structure() {
        assert_eq!(
            decode(b"d3:food3:barl3:bazee3:quxi42ee"),
            Ok(Value::dictionary()
                .with_entry(
                    "foo",
                    Value::dictionary()
                        .with_entry("bar", Value::list().with_value(Value::string("baz")))
                )
                .with_entry("qux", Value::Integer(42)))
        );
    }

    #[test]
    fn fail_for_non_string_keys() {
        assert_eq!(
            decode(b"di1ei2ee"),
            Err(DecodeError::NonStringKey { position: 1 })
        );
    }

    #[test]
    fn fail_for_repeated_key() {
        assert_eq!(
            decode(b"d1:ai1e1:ai2ee"),
            Err(DecodeError::DuplicateKey { position: 7 })
        );
    }

    #[test]
    fn fail_for_repeated_key_in_nested_dictionary() {
        assert_eq!(
            decode(b"d4:infod6:lengthi3e6:lengthi3eee"),
            Err(DecodeError::DuplicateKey { position: 19 })
        );
    }

    #[test]
    fn fail_for_key_without_value() {
        assert!(decode(b"d3:fooe").is_err());
    }

    #[test]
    fn fail_for_unterminated_list() {
        assert_eq!(
            decode(b"l4:spam"),
            Err(DecodeError::UnexpectedEof { position: 7 })
        );
    }

    #[test]
    fn fail_for_trailing_data() {
        assert_eq!(
            decode(b"i42ei1e"),
            Err(DecodeError::TrailingData { position: 4 })
        );
    }

    #[test]
    fn fail_for_excessive_nesting() {
        let mut data = vec![b'l'; MAX_DEPTH + 2];
        data.extend(vec![b'e'; MAX_DEPTH + 2]);

        assert!(matches!(
            decode(&data),
            Err(DecodeError::NestingTooDeep { .. })
        ));
    }
}
