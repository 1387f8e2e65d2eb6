use super::value::Value;

/// Encodes a value canonically: dictionary keys in ascending byte order,
/// which the `BTreeMap` already guarantees.
///
/// Re-encoding a decoded canonical document reproduces it byte for byte;
/// info-hash stability depends on exactly this.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_into(value, &mut buf);
    buf
}

fn encode_into(value: &Value, buf: &mut Vec<u8>) {
    match value {

        Value::Integer(n) => {
            buf.push(b'i');
            buf.extend_from_slice(n.to_string().as_bytes());
            buf.push(b'e');
        },

        Value::Bytes(b) => {
            buf.extend_from_slice(b.len().to_string().as_bytes());
            buf.push(b':');
            buf.extend_from_slice(b);
        },

        Value::List(list) => {
            buf.push(b'l');
            for item in list {
                encode_into(item, buf);
            }
            buf.push(b'e');
        },

        Value::Dict(dict) => {
            buf.push(b'd');
            for (key, val) in dict {
                buf.extend_from_slice(key.len().to_string().as_bytes());
                buf.push(b':');
                buf.extend_from_slice(key);
                encode_into(val, buf);
            }
            buf.push(b'e');
        },
    }
}
