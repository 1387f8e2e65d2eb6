use std::collections::BTreeMap;
use bytes::Bytes;
use super::error::{Error, Result};
use super::value::Value;

// Hostile input could otherwise blow the stack with "lllll...".
const MAX_DEPTH: usize = 64;

/// Decodes a single bencode value, consuming the whole input.
///
/// Dictionary keys may arrive in any order; the last occurrence of a
/// repeated key wins. Canonical input (sorted, unique keys) re-encodes
/// byte-identically, which is what the info-hash relies on.
pub fn decode(data: &[u8]) -> Result<Value> {
    let mut parser = Parser { data, pos: 0 };
    let value = parser.parse_value(0)?;
    if parser.pos != data.len() {
        return Err(Error::TrailingData);
    }
    Ok(value)
}

struct Parser<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {

    fn peek(&self) -> Result<u8> {
        self.data.get(self.pos).copied().ok_or(Error::Eof)
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(Error::TooDeep(MAX_DEPTH));
        }
        match self.peek()? {
            b'i' => self.parse_integer(),
            b'l' => self.parse_list(depth),
            b'd' => self.parse_dict(depth),
            b'0'..=b'9' => self.parse_bytes().map(Value::Bytes),
            other => Err(Error::UnexpectedByte(other)),
        }
    }

    // i<signed decimal>e
    fn parse_integer(&mut self) -> Result<Value> {
        self.pos += 1; // consume 'i'

        let start = self.pos;
        while self.peek()? != b'e' {
            self.pos += 1;
        }
        let digits = &self.data[start..self.pos];
        self.pos += 1; // consume 'e'

        let (negative, magnitude) = match digits {
            [b'-', rest @ ..] => (true, rest),
            _ => (false, digits),
        };
        if magnitude.is_empty() || !magnitude.iter().all(u8::is_ascii_digit) {
            return Err(Error::InvalidInteger);
        }
        // Only "0" may start with a zero, and "-0" is not a thing.
        if magnitude[0] == b'0' && (negative || magnitude.len() > 1) {
            return Err(Error::InvalidInteger);
        }

        // Always valid UTF-8 at this point, digits only.
        std::str::from_utf8(digits)
            .expect("ascii digits")
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| Error::InvalidInteger)
    }

    // <unsigned decimal>:<bytes>
    fn parse_bytes(&mut self) -> Result<Bytes> {
        let start = self.pos;
        while self.peek()? != b':' {
            if !self.data[self.pos].is_ascii_digit() {
                return Err(Error::InvalidLength);
            }
            self.pos += 1;
        }
        let len = std::str::from_utf8(&self.data[start..self.pos])
            .expect("ascii digits")
            .parse::<usize>()
            .map_err(|_| Error::InvalidLength)?;
        self.pos += 1; // consume ':'

        let end = self.pos.checked_add(len).ok_or(Error::InvalidLength)?;
        if end > self.data.len() {
            return Err(Error::Eof);
        }
        let bytes = Bytes::copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(bytes)
    }

    // l<element>*e
    fn parse_list(&mut self, depth: usize) -> Result<Value> {
        self.pos += 1; // consume 'l'
        let mut list = Vec::new();
        while self.peek()? != b'e' {
            list.push(self.parse_value(depth + 1)?);
        }
        self.pos += 1; // consume 'e'
        Ok(Value::List(list))
    }

    // d(<string><value>)*e
    fn parse_dict(&mut self, depth: usize) -> Result<Value> {
        self.pos += 1; // consume 'd'
        let mut dict = BTreeMap::new();
        while self.peek()? != b'e' {
            if !self.peek()?.is_ascii_digit() {
                return Err(Error::NonStringKey);
            }
            let key = self.parse_bytes()?;
            let value = self.parse_value(depth + 1)?;
            dict.insert(key, value);
        }
        self.pos += 1; // consume 'e'
        Ok(Value::Dict(dict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_integer() {
        assert_eq!(decode(b"i42e").unwrap(), Value::Integer(42));
        assert_eq!(decode(b"i-7e").unwrap(), Value::Integer(-7));
        assert_eq!(decode(b"i0e").unwrap(), Value::Integer(0));
        assert_eq!(decode(b"ie").unwrap_err(), Error::InvalidInteger);
        assert_eq!(decode(b"i-0e").unwrap_err(), Error::InvalidInteger);
        assert_eq!(decode(b"i042e").unwrap_err(), Error::InvalidInteger);
        assert_eq!(decode(b"i12").unwrap_err(), Error::Eof);
        assert_eq!(decode(b"i1x2e").unwrap_err(), Error::InvalidInteger);
        // One past i64::MAX.
        assert_eq!(decode(b"i9223372036854775808e").unwrap_err(), Error::InvalidInteger);
    }

    #[test]
    fn test_decode_string() {
        assert_eq!(decode(b"5:hello").unwrap(), Value::from("hello"));
        assert_eq!(decode(b"0:").unwrap(), Value::from(""));
        assert_eq!(decode(b"3:ab").unwrap_err(), Error::Eof);
        assert_eq!(decode(b"5x:hello").unwrap_err(), Error::InvalidLength);
        assert_eq!(decode(b"99999999999999999999999:a").unwrap_err(), Error::InvalidLength);
    }

    #[test]
    fn test_decode_binary_string() {
        // Not UTF-8, must survive untouched.
        let raw: &[u8] = &[0xde, 0xad, 0xbe, 0xef, 0x00];
        let mut input = b"5:".to_vec();
        input.extend_from_slice(raw);
        let value = decode(&input).unwrap();
        assert_eq!(value.as_bytes().unwrap(), raw);
        assert_eq!(value.as_utf8(), None);
    }

    #[test]
    fn test_decode_list() {
        let value = decode(b"l5:helloi42ee").unwrap();
        let list = match &value {
            Value::List(l) => l,
            _ => panic!("expected list"),
        };
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].as_utf8(), Some("hello"));
        assert_eq!(list[1].as_int(), Some(42));

        assert_eq!(decode(b"le").unwrap(), Value::List(vec![]));
        assert_eq!(decode(b"l5:hello").unwrap_err(), Error::Eof);
    }

    #[test]
    fn test_decode_dict() {
        let value = decode(b"d3:cow3:moo4:spam4:eggse").unwrap();
        assert_eq!(value.lookup(b"cow").and_then(Value::as_utf8), Some("moo"));
        assert_eq!(value.lookup(b"spam").and_then(Value::as_utf8), Some("eggs"));
        assert_eq!(value.lookup(b"missing"), None);

        assert_eq!(decode(b"di1e3:mooe").unwrap_err(), Error::NonStringKey);
        assert_eq!(decode(b"d3:cow3:moo").unwrap_err(), Error::Eof);
    }

    #[test]
    fn test_decode_dict_key_collision() {
        // Non-canonical input: repeated key, last occurrence wins.
        let value = decode(b"d1:ai1e1:ai2ee").unwrap();
        assert_eq!(value.lookup(b"a").and_then(Value::as_int), Some(2));
    }

    #[test]
    fn test_decode_dict_unsorted_keys() {
        // Out-of-order keys are accepted.
        let value = decode(b"d1:bi2e1:ai1ee").unwrap();
        assert_eq!(value.lookup(b"a").and_then(Value::as_int), Some(1));
        assert_eq!(value.lookup(b"b").and_then(Value::as_int), Some(2));
    }

    #[test]
    fn test_decode_rejects_junk() {
        assert_eq!(decode(b"").unwrap_err(), Error::Eof);
        assert_eq!(decode(b"x").unwrap_err(), Error::UnexpectedByte(b'x'));
        assert_eq!(decode(b"i42etrailing").unwrap_err(), Error::TrailingData);
    }

    #[test]
    fn test_decode_depth_limit() {
        let mut input = vec![b'l'; 1000];
        input.extend(std::iter::repeat(b'e').take(1000));
        assert!(matches!(decode(&input).unwrap_err(), Error::TooDeep(_)));
    }
}
