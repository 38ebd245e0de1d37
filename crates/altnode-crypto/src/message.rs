//! Magic-prefixed message signing.
//!
//! The signed digest is `sha256d(varstr(magic) ‖ varstr(message))`, where
//! `varstr` is a compact-size length followed by the bytes. Signatures are
//! 65-byte compact signatures, so the verifier only needs the signer's key
//! ID.

#![forbid(unsafe_code)]

use std::sync::Arc;

use altnode_core::Result;

use crate::ec::{
    Curve, KeyId, PrivateKey, PublicKey, RecoverableSignature, COMPACT_SIGNATURE_LEN,
};
use crate::hash::sha256d;

/// Append the compact-size encoding of `len`.
pub fn write_compact_size(out: &mut Vec<u8>, len: u64) {
    match len {
        0..=0xfc => out.push(len as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(len as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(len as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&len.to_le_bytes());
        }
    }
}

fn write_varstr(out: &mut Vec<u8>, bytes: &[u8]) {
    write_compact_size(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

/// Signs and checks messages under a network's magic string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageSigner {
    magic: String,
}

impl MessageSigner {
    pub fn new(magic: impl Into<String>) -> Self {
        Self {
            magic: magic.into(),
        }
    }

    pub fn magic(&self) -> &str {
        &self.magic
    }

    /// The digest a signature over `message` commits to.
    pub fn digest(&self, message: &[u8]) -> [u8; 32] {
        let mut buf = Vec::with_capacity(self.magic.len() + message.len() + 10);
        write_varstr(&mut buf, self.magic.as_bytes());
        write_varstr(&mut buf, message);
        sha256d(&buf)
    }

    /// Compact signature, flagged with the key's compression preference.
    pub fn sign(&self, key: &PrivateKey, message: &[u8]) -> Result<[u8; COMPACT_SIGNATURE_LEN]> {
        let digest = self.digest(message);
        Ok(key
            .sign_recoverable(&digest, key.is_compressed())?
            .to_compact())
    }

    /// Recover the signer's key on secp256k1.
    pub fn recover(&self, message: &[u8], signature: &[u8]) -> Result<PublicKey> {
        PublicKey::recover_compact(&self.digest(message), signature, Curve::secp256k1())
    }

    /// True if `signature` recovers to `pubkey`'s ID.
    pub fn verify(&self, pubkey: &PublicKey, message: &[u8], signature: &[u8]) -> Result<bool> {
        self.check(message, signature, Arc::clone(pubkey.curve()), &pubkey.id())
    }

    /// True if `signature` recovers to a key with ID `id`.
    pub fn verify_id(&self, id: &KeyId, message: &[u8], signature: &[u8]) -> Result<bool> {
        self.check(message, signature, Curve::secp256k1(), id)
    }

    fn check(
        &self,
        message: &[u8],
        signature: &[u8],
        curve: Arc<Curve>,
        id: &KeyId,
    ) -> Result<bool> {
        let rec = RecoverableSignature::from_compact(signature)?;
        let recovered = PublicKey::recover(&self.digest(message), &rec, curve)?;
        Ok(recovered.is_some_and(|key| key.id() == *id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bigint::U256;
    use altnode_core::Error;

    const MAGIC: &str = "DarkCoin Signed Message:\n";

    fn key(scalar: u64, compressed: bool) -> PrivateKey {
        PrivateKey::from_scalar(Curve::secp256k1(), U256::from_u64(scalar), compressed, 204)
            .unwrap()
    }

    #[test]
    fn test_compact_size() {
        let cases: &[(u64, &[u8])] = &[
            (0, &[0x00]),
            (0xfc, &[0xfc]),
            (0xfd, &[0xfd, 0xfd, 0x00]),
            (0xffff, &[0xfd, 0xff, 0xff]),
            (0x1_0000, &[0xfe, 0x00, 0x00, 0x01, 0x00]),
            (0x1_0000_0000, &[0xff, 0, 0, 0, 0, 1, 0, 0, 0]),
        ];
        for (len, expected) in cases {
            let mut out = Vec::new();
            write_compact_size(&mut out, *len);
            assert_eq!(out, *expected, "len {len}");
        }
    }

    #[test]
    fn test_digest_layout() {
        let signer = MessageSigner::new(MAGIC);
        let mut expected = vec![MAGIC.len() as u8];
        expected.extend_from_slice(MAGIC.as_bytes());
        expected.push(5);
        expected.extend_from_slice(b"hello");
        assert_eq!(signer.digest(b"hello"), sha256d(&expected));
    }

    #[test]
    fn test_sign_verify() {
        let signer = MessageSigner::new(MAGIC);
        for compressed in [true, false] {
            let k = key(0x4d4e, compressed);
            let sig = signer.sign(&k, b"masternode ping").unwrap();
            assert_eq!(signer.verify(k.public_key(), b"masternode ping", &sig), Ok(true));
            assert_eq!(signer.verify(k.public_key(), b"masternode pong", &sig), Ok(false));
            assert_eq!(
                signer.verify_id(&k.public_key().id(), b"masternode ping", &sig),
                Ok(true)
            );
            assert_eq!(
                signer.recover(b"masternode ping", &sig).unwrap().id(),
                k.public_key().id()
            );
        }
    }

    #[test]
    fn test_other_key_rejected() {
        let signer = MessageSigner::new(MAGIC);
        let sig = signer.sign(&key(1, true), b"msg").unwrap();
        assert_eq!(signer.verify(key(2, true).public_key(), b"msg", &sig), Ok(false));
    }

    #[test]
    fn test_magic_separates_domains() {
        let k = key(31337, true);
        let sig = MessageSigner::new(MAGIC).sign(&k, b"msg").unwrap();
        let other = MessageSigner::new("Bitcoin Signed Message:\n");
        assert_eq!(other.verify(k.public_key(), b"msg", &sig), Ok(false));
    }

    #[test]
    fn test_malformed_signature() {
        let signer = MessageSigner::new(MAGIC);
        assert!(matches!(
            signer.verify(key(1, true).public_key(), b"msg", &[0u8; 64]),
            Err(Error::SignatureFormat(_))
        ));
    }
}
