//! RFC 6979 HMAC-DRBG nonce generator over HMAC-SHA256.

#![forbid(unsafe_code)]

use altnode_core::{Error, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroize;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 output length in bytes.
pub const HMAC_SHA256_LEN: usize = 32;

/// HMAC-SHA256 over the concatenation of `parts`.
fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> Result<[u8; HMAC_SHA256_LEN]> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::Signing(format!("HMAC-SHA256 key init failed: {e}")))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().into())
}

/// HMAC-DRBG state from RFC 6979 section 3.2.
///
/// Seeded with int2octets(x) and bits2octets(h), both `rlen` bytes wide.
/// Each call to [`next_candidate`](Self::next_candidate) yields the next
/// V; the caller truncates it to qlen bits and decides whether it is in
/// range. One V always covers qlen since orders are at most 256 bits.
pub struct NonceGenerator {
    k: [u8; HMAC_SHA256_LEN],
    v: [u8; HMAC_SHA256_LEN],
    started: bool,
}

impl NonceGenerator {
    /// Steps (b) through (g): V = 0x01.., K = 0x00.., two keyed rounds.
    pub fn new(secret: &[u8], digest: &[u8]) -> Result<Self> {
        let mut drbg = Self {
            k: [0x00; HMAC_SHA256_LEN],
            v: [0x01; HMAC_SHA256_LEN],
            started: false,
        };
        for marker in [0x00u8, 0x01] {
            drbg.k = hmac_sha256(&drbg.k, &[&drbg.v, &[marker], secret, digest])?;
            drbg.v = hmac_sha256(&drbg.k, &[&drbg.v])?;
        }
        Ok(drbg)
    }

    /// Step (h): the next V. After the first candidate the state is
    /// reseeded with K = HMAC(K, V || 0x00), V = HMAC(K, V).
    pub fn next_candidate(&mut self) -> Result<[u8; HMAC_SHA256_LEN]> {
        if self.started {
            self.k = hmac_sha256(&self.k, &[&self.v, &[0x00]])?;
            self.v = hmac_sha256(&self.k, &[&self.v])?;
        }
        self.started = true;
        self.v = hmac_sha256(&self.k, &[&self.v])?;
        Ok(self.v)
    }
}

impl Drop for NonceGenerator {
    fn drop(&mut self) {
        self.k.zeroize();
        self.v.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_multipart() {
        // RFC 4231 test case 2, split across parts.
        let result = hmac_sha256(b"Jefe", &[b"what do ya want ", b"for nothing?"]).unwrap();
        assert_eq!(
            hex::encode(result),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_nonce_generator_deterministic() {
        let secret = [0x11u8; 32];
        let digest = [0x22u8; 32];
        let mut a = NonceGenerator::new(&secret, &digest).unwrap();
        let mut b = NonceGenerator::new(&secret, &digest).unwrap();
        let first = a.next_candidate().unwrap();
        assert_eq!(first, b.next_candidate().unwrap());
        assert_ne!(first, a.next_candidate().unwrap());
    }

    #[test]
    fn test_nonce_generator_seed_width() {
        // Short orders seed with shorter octet strings.
        let mut wide = NonceGenerator::new(&[0x11; 32], &[0x22; 32]).unwrap();
        let mut narrow = NonceGenerator::new(&[0x11; 21], &[0x22; 21]).unwrap();
        assert_ne!(wide.next_candidate().unwrap(), narrow.next_candidate().unwrap());
    }
}
