//! Cache entry wire format.
//!
//! An entry is a single opaque byte sequence:
//!
//! ```text
//! [1 byte content-type length L][L bytes UTF-8 content-type][raw body]
//! ```
//!
//! The single-byte length prefix caps the content-type at 255 bytes.
//! Entries are only ever written by [`encode`] and read back by [`decode`];
//! the format never leaves the cache store.

use bytes::{BufMut, Bytes, BytesMut};

/// Maximum content-type length representable by the one-byte prefix.
pub const MAX_CONTENT_TYPE_LEN: usize = 255;

/// Encodes a content-type and body into a cache entry.
///
/// Returns `None` when the content-type is longer than
/// [`MAX_CONTENT_TYPE_LEN`] bytes; such a response is skipped rather than
/// truncated.
pub fn encode(content_type: &str, body: &[u8]) -> Option<Bytes> {
    let ct = content_type.as_bytes();
    if ct.len() > MAX_CONTENT_TYPE_LEN {
        return None;
    }

    let mut buf = BytesMut::with_capacity(1 + ct.len() + body.len());
    buf.put_u8(ct.len() as u8);
    buf.put_slice(ct);
    buf.put_slice(body);
    Some(buf.freeze())
}

/// Decodes a cache entry back into its content-type and body.
///
/// Entries are produced exclusively by [`encode`], so a buffer that is too
/// short for its own length prefix, or whose content-type bytes are not
/// valid UTF-8, is a corrupted store — reported as `None`, never read past
/// bounds.
pub fn decode(entry: &[u8]) -> Option<(String, Bytes)> {
    let (&len, rest) = entry.split_first()?;
    let len = len as usize;
    if rest.len() < len {
        return None;
    }

    let content_type = std::str::from_utf8(&rest[..len]).ok()?.to_owned();
    let body = Bytes::copy_from_slice(&rest[len..]);
    Some((content_type, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(ct: &str, body: &[u8]) {
        let encoded = encode(ct, body).unwrap();
        let (decoded_ct, decoded_body) = decode(&encoded).unwrap();
        assert_eq!(decoded_ct, ct);
        assert_eq!(decoded_body.as_ref(), body);
    }

    #[test]
    fn roundtrip_text() {
        roundtrip("text/plain", b"hello");
    }

    #[test]
    fn roundtrip_empty_body() {
        roundtrip("application/json", b"");
    }

    #[test]
    fn roundtrip_empty_content_type() {
        roundtrip("", b"body without a type");
    }

    #[test]
    fn roundtrip_binary_body() {
        roundtrip("application/octet-stream", &[0u8, 1, 2, 255, 254, 0]);
    }

    #[test]
    fn roundtrip_max_content_type() {
        let ct = "x".repeat(MAX_CONTENT_TYPE_LEN);
        roundtrip(&ct, b"payload");
    }

    #[test]
    fn oversized_content_type_is_rejected() {
        let ct = "x".repeat(MAX_CONTENT_TYPE_LEN + 1);
        assert!(encode(&ct, b"payload").is_none());
    }

    #[test]
    fn layout_is_length_prefixed() {
        let encoded = encode("a/b", b"XY").unwrap();
        assert_eq!(encoded.as_ref(), b"\x03a/bXY");
    }

    #[test]
    fn truncated_entry_decodes_to_none() {
        // Prefix claims 10 content-type bytes but only 3 follow.
        assert!(decode(b"\x0aabc").is_none());
        assert!(decode(b"").is_none());
    }

    #[test]
    fn invalid_utf8_content_type_decodes_to_none() {
        assert!(decode(&[2, 0xff, 0xfe, b'x']).is_none());
    }
}
