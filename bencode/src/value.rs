use std::collections::BTreeMap;
use bytes::Bytes;

/// A decoded bencode value.
///
/// "Strings" are raw byte sequences; torrent piece digests are binary and
/// routinely contain bytes that are not valid UTF-8, so no text type is
/// involved anywhere in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {

    Integer(i64),

    Bytes(Bytes),

    List(Vec<Value>),

    // Keys sorted by raw byte order, which is also the canonical
    // encoding order.
    Dict(BTreeMap<Bytes, Value>),

}

// Shape-probing accessors: None whenever the value is not the shape the
// caller hoped for. Consumers pattern-match for anything fancier.
impl Value {

    pub fn as_int(&self) -> Option<i64> {
        if let Value::Integer(n) = self { Some(*n) } else { None }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        if let Value::Bytes(b) = self { Some(b) } else { None }
    }

    // The byte string reinterpreted as text, when it happens to be UTF-8.
    pub fn as_utf8(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()?).ok()
    }

    pub fn is_dict(&self) -> bool {
        matches!(self, Value::Dict(_))
    }

    /// Dictionary lookup; `None` if this is not a dictionary or the key
    /// is absent.
    pub fn lookup(&self, key: &[u8]) -> Option<&Value> {
        if let Value::Dict(entries) = self {
            entries.get(key)
        } else {
            None
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Bytes(Bytes::copy_from_slice(s.as_bytes()))
    }
}
