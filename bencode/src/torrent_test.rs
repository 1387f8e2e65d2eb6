// Exercises the codec against a realistic single-file torrent document,
// binary digest blob included.
use crate::{decode, encode, Value};

fn synthetic_torrent() -> Vec<u8> {
    // Four 20-byte digests, deliberately not UTF-8.
    let mut pieces = Vec::with_capacity(80);
    for i in 0u8..80 {
        pieces.push(0xe0_u8.wrapping_add(i));
    }

    let mut doc = Vec::new();
    doc.extend_from_slice(b"d8:announce31:http://tracker.example.com:80/a4:infod6:lengthi100000e4:name8:file.bin12:piece lengthi32768e6:pieces80:");
    doc.extend_from_slice(&pieces);
    doc.extend_from_slice(b"ee");
    doc
}

#[test]
fn test_torrent_document_fields() {
    let doc = synthetic_torrent();
    let value = decode(&doc).unwrap();

    assert_eq!(
        value.lookup(b"announce").and_then(Value::as_utf8),
        Some("http://tracker.example.com:80/a"),
    );

    let info = value.lookup(b"info").unwrap();
    assert_eq!(info.lookup(b"length").and_then(Value::as_int), Some(100_000));
    assert_eq!(info.lookup(b"piece length").and_then(Value::as_int), Some(32_768));

    let pieces = info.lookup(b"pieces").and_then(Value::as_bytes).unwrap();
    assert_eq!(pieces.len(), 80);
    assert_eq!(pieces[0], 0xe0);
}

#[test]
fn test_torrent_document_round_trip() {
    let doc = synthetic_torrent();
    let value = decode(&doc).unwrap();
    assert_eq!(encode(&value), doc);

    // The info sub-dictionary alone must also re-encode identically,
    // since its encoding is what gets hashed.
    let info = value.lookup(b"info").unwrap();
    let encoded_info = encode(info);
    let info_start = doc.windows(5).position(|w| w == b"infod").map(|p| p + 4).unwrap();
    assert_eq!(&doc[info_start..doc.len() - 1], &encoded_info[..]);
}
