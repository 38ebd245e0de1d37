//! Base58 and base58check encoding for WIF keys and addresses.
//!
//! Uses the Bitcoin alphabet. The check variant appends the first four
//! bytes of sha256d(payload).

#![forbid(unsafe_code)]

use altnode_core::{Error, Result};

/// Encode bytes to Base58 string.
pub fn encode(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

/// Decode a Base58 string.
pub fn decode(s: &str) -> Result<Vec<u8>> {
    bs58::decode(s).into_vec().map_err(map_error)
}

/// Encode `payload || checksum(payload)`.
pub fn encode_check(payload: &[u8]) -> String {
    bs58::encode(payload).with_check().into_string()
}

/// Decode and verify a base58check string, returning the payload.
pub fn decode_check(s: &str) -> Result<Vec<u8>> {
    bs58::decode(s).with_check(None).into_vec().map_err(map_error)
}

fn map_error(err: bs58::decode::Error) -> Error {
    match err {
        bs58::decode::Error::InvalidChecksum { .. } => Error::Checksum,
        other => Error::Base58(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::checksum;

    #[test]
    fn test_empty() {
        assert_eq!(encode(b""), "");
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_leading_zeros() {
        assert_eq!(encode(&[0, 0, 0, 1]), "1112");
        assert_eq!(decode("1112").unwrap(), vec![0, 0, 0, 1]);
    }

    #[test]
    fn test_hello_world() {
        assert_eq!(encode(b"Hello World!"), "2NEpo7TZRRrLZSi2U");
        assert_eq!(decode("2NEpo7TZRRrLZSi2U").unwrap(), b"Hello World!");
    }

    #[test]
    fn test_invalid_character() {
        assert!(matches!(decode("0OIl"), Err(Error::Base58(_))));
    }

    #[test]
    fn test_check_appends_sha256d_prefix() {
        let payload = [0x4cu8, 1, 2, 3, 4, 5];
        let s = encode_check(&payload);
        let raw = decode(&s).unwrap();
        assert_eq!(raw[..payload.len()], payload);
        assert_eq!(raw[payload.len()..], checksum(&payload));
        assert_eq!(decode_check(&s).unwrap(), payload);
    }

    #[test]
    fn test_check_detects_corruption() {
        let s = encode_check(&[0x80u8; 33]);
        let mut raw = decode(&s).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 1;
        assert_eq!(decode_check(&encode(&raw)), Err(Error::Checksum));
        assert!(matches!(decode_check("1"), Err(Error::Base58(_))));
    }
}
