//! Hash functions used by keys, addresses and signatures.

#![forbid(unsafe_code)]

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// SHA-256 output length in bytes.
pub const SHA256_LEN: usize = 32;

/// RIPEMD160(SHA256) output length in bytes.
pub const HASH160_LEN: usize = 20;

/// Checksum length used by base58check.
pub const CHECKSUM_LEN: usize = 4;

pub fn sha256(data: &[u8]) -> [u8; SHA256_LEN] {
    Sha256::digest(data).into()
}

/// SHA256(SHA256(data)), the digest signed by every consensus message.
pub fn sha256d(data: &[u8]) -> [u8; SHA256_LEN] {
    Sha256::digest(Sha256::digest(data)).into()
}

/// RIPEMD160(SHA256(data)).
pub fn hash160(data: &[u8]) -> [u8; HASH160_LEN] {
    Ripemd160::digest(Sha256::digest(data)).into()
}

/// Leading four bytes of sha256d(data).
pub fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let h = sha256d(data);
    [h[0], h[1], h[2], h[3]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_empty() {
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sha256d_hello() {
        assert_eq!(
            hex::encode(sha256d(b"hello")),
            "9595c9df90075148eb06860365df33584b75bff782a510c6cd4883a419833d50"
        );
    }

    #[test]
    fn test_hash160_generator_key() {
        // hash160 of the compressed encoding of G (private key 1)
        let g = hex::decode("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
            .unwrap();
        assert_eq!(
            hex::encode(hash160(&g)),
            "751e76e8199196d454941c45d1b3a323f1433bd6"
        );
    }

    #[test]
    fn test_checksum_prefix() {
        let data = b"checksum";
        assert_eq!(checksum(data), sha256d(data)[..4]);
    }
}
