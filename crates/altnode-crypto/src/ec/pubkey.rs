//! Public keys: verification, compact-signature recovery and key IDs.
//!
//! SEC1 formats:
//! - compressed: `[0x02|0x03][x]`, prefix from y's parity
//! - uncompressed: `[0x04][x][y]`

#![forbid(unsafe_code)]

use std::fmt;
use std::sync::Arc;

use altnode_core::{Error, Result};

use super::curve::Curve;
use super::point::{encode_sec1, Point};
use super::signature::{RecoverableSignature, Signature};
use crate::bigint::U256;
use crate::hash::{hash160, sha256d, HASH160_LEN};

/// RIPEMD160(SHA256(serialized public key)).
///
/// Bytes are kept in hash order. `Display` prints them reversed, the way
/// the node shows 160-bit IDs.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId([u8; HASH160_LEN]);

impl KeyId {
    pub const fn from_bytes(bytes: [u8; HASH160_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH160_LEN] {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0.iter().rev() {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({self})")
    }
}

/// RFC 6979 bits2int: the leftmost `qlen` bits of `bytes`.
pub(crate) fn bits_to_int(bytes: &[u8; 32], qlen: usize) -> U256 {
    let value = U256::from_be_bytes(bytes);
    match 256usize.checked_sub(qlen) {
        Some(excess) if excess > 0 => value.shr(excess as u32),
        _ => value,
    }
}

/// The hash an ECDSA signature commits to, truncated to the bit length of
/// n and reduced mod n.
pub(crate) fn digest_scalar(curve: &Curve, digest: &[u8; 32]) -> U256 {
    let n = curve.order();
    n.reduce(&bits_to_int(digest, n.value().bits()))
}

/// sha256d(message), or `message` itself when it already is a digest.
pub(crate) fn message_digest(message: &[u8], is_digest: bool) -> Result<[u8; 32]> {
    if !is_digest {
        return Ok(sha256d(message));
    }
    message.try_into().map_err(|_| Error::Length {
        expected: 32,
        got: message.len(),
    })
}

/// A curve point that is never the identity, plus a compression preference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    curve: Arc<Curve>,
    x: U256,
    y: U256,
    compressed: bool,
}

impl PublicKey {
    /// Wrap a point. Fails for the point at infinity.
    pub fn from_point(point: &Point, compressed: bool) -> Result<Self> {
        match (point.x(), point.y()) {
            (Some(x), Some(y)) => Ok(Self {
                curve: Arc::clone(point.curve()),
                x: *x,
                y: *y,
                compressed,
            }),
            _ => Err(Error::PointAtInfinity),
        }
    }

    /// Decode a SEC1 key on secp256k1.
    pub fn from_binary(bytes: &[u8]) -> Result<Self> {
        Self::from_binary_on(Curve::secp256k1(), bytes)
    }

    /// Decode a SEC1 key on `curve`. The compression preference follows the
    /// encoding.
    pub fn from_binary_on(curve: Arc<Curve>, bytes: &[u8]) -> Result<Self> {
        let point = Point::from_sec1(curve, bytes)?;
        Self::from_point(&point, bytes.len() != 1 + 2 * point.curve().field_bytes())
    }

    pub fn point(&self) -> Point {
        Point::from_affine_unchecked(Arc::clone(&self.curve), self.x, self.y)
    }

    pub fn curve(&self) -> &Arc<Curve> {
        &self.curve
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub fn set_compressed(&mut self, compressed: bool) {
        self.compressed = compressed;
    }

    /// SEC1 encoding in the requested form.
    pub fn to_binary(&self, compressed: bool) -> Vec<u8> {
        encode_sec1(&self.curve, &self.x, &self.y, compressed)
    }

    /// SEC1 encoding in this key's own form.
    pub fn serialize(&self) -> Vec<u8> {
        self.to_binary(self.compressed)
    }

    /// ID of the key in this key's own form.
    pub fn id(&self) -> KeyId {
        self.id_with(self.compressed)
    }

    pub fn id_with(&self, compressed: bool) -> KeyId {
        KeyId(hash160(&self.to_binary(compressed)))
    }

    /// `version ‖ id`, the payload of a pay-to-pubkey-hash address.
    pub fn address_payload(&self, version: u8) -> [u8; 1 + HASH160_LEN] {
        self.address_payload_with(self.compressed, version)
    }

    /// Like [`address_payload`](Self::address_payload), for the given form.
    pub fn address_payload_with(&self, compressed: bool, version: u8) -> [u8; 1 + HASH160_LEN] {
        let mut out = [0u8; 1 + HASH160_LEN];
        out[0] = version;
        out[1..].copy_from_slice(self.id_with(compressed).as_bytes());
        out
    }

    /// Verify a DER signature over `message`.
    ///
    /// Malformed DER or r/s outside [1, n-1] is an error; a well-formed
    /// signature that does not match is `Ok(false)`.
    pub fn verify(&self, message: &[u8], der: &[u8], is_digest: bool) -> Result<bool> {
        let digest = message_digest(message, is_digest)?;
        let signature = Signature::from_der(der)?;
        self.verify_digest(&digest, &signature)
    }

    /// Verify (r, s) against a 32-byte digest.
    pub fn verify_digest(&self, digest: &[u8; 32], signature: &Signature) -> Result<bool> {
        signature.check_range(&self.curve)?;
        let n = self.curve.order();

        let e = digest_scalar(&self.curve, digest);
        let w = match n.inv(signature.s()) {
            Some(w) => w,
            None => return Ok(false),
        };
        let u1 = n.mul(&e, &w);
        let u2 = n.mul(signature.r(), &w);

        let point = Point::lincomb(&u1, &self.point(), &u2);
        Ok(match point.x() {
            Some(x) => n.reduce(x) == *signature.r(),
            None => false,
        })
    }

    /// Verify a 65-byte compact signature by recovering the signer and
    /// comparing key IDs.
    pub fn verify_compact(&self, message: &[u8], signature: &[u8]) -> Result<bool> {
        let rec = RecoverableSignature::from_compact(signature)?;
        let digest = sha256d(message);
        Ok(match Self::recover(&digest, &rec, Arc::clone(&self.curve))? {
            Some(key) => key.id() == self.id(),
            None => false,
        })
    }

    /// Recover the signer of `digest` from a 65-byte compact signature.
    pub fn recover_compact(digest: &[u8; 32], signature: &[u8], curve: Arc<Curve>) -> Result<Self> {
        let rec = RecoverableSignature::from_compact(signature)?;
        Self::recover(digest, &rec, curve)?
            .ok_or_else(|| Error::SignatureFormat("signature does not recover a key".into()))
    }

    /// Q = r⁻¹(s·R − e·G).
    ///
    /// `Ok(None)` means the signature is well formed but no key results:
    /// R.x does not fit the field, has no point, or Q is the identity.
    pub(crate) fn recover(
        digest: &[u8; 32],
        rec: &RecoverableSignature,
        curve: Arc<Curve>,
    ) -> Result<Option<Self>> {
        let sig = rec.signature();
        sig.check_range(&curve)?;

        let n = curve.order();
        let p = curve.field();
        let j = rec.recovery_id();

        let x = if j & 2 != 0 {
            let (x, carry) = sig.r().overflowing_add(n.value());
            if carry {
                return Ok(None);
            }
            x
        } else {
            *sig.r()
        };
        if !p.contains(&x) {
            return Ok(None);
        }
        let y = match curve.lift_x(&x, j & 1 == 1) {
            Some(y) => y,
            None => return Ok(None),
        };
        let big_r = Point::from_affine_unchecked(Arc::clone(&curve), x, y);

        let e = digest_scalar(&curve, digest);
        let r_inv = match n.inv(sig.r()) {
            Some(v) => v,
            None => return Ok(None),
        };
        let u1 = n.neg(&n.mul(&e, &r_inv));
        let u2 = n.mul(sig.s(), &r_inv);

        let q = Point::lincomb(&u1, &big_r, &u2);
        if q.is_infinity() {
            return Ok(None);
        }
        Self::from_point(&q, rec.is_compressed()).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec::curve::SECP256K1;

    const G_COMPRESSED: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    fn g() -> PublicKey {
        PublicKey::from_binary(&hex::decode(G_COMPRESSED).unwrap()).unwrap()
    }

    #[test]
    fn test_from_binary_compression_preference() {
        let compressed = g();
        assert!(compressed.is_compressed());

        let uncompressed = PublicKey::from_binary(&compressed.to_binary(false)).unwrap();
        assert!(!uncompressed.is_compressed());
        assert_eq!(uncompressed.point(), compressed.point());
        assert_eq!(hex::encode(uncompressed.to_binary(true)), G_COMPRESSED);
    }

    #[test]
    fn test_roundtrip_both_forms() {
        let key = PublicKey::from_point(&g().point().mul(&U256::from_u64(77)), true).unwrap();
        for compressed in [true, false] {
            let mut decoded = PublicKey::from_binary(&key.to_binary(compressed)).unwrap();
            decoded.set_compressed(true);
            assert_eq!(decoded, key);
        }
    }

    #[test]
    fn test_from_point_rejects_infinity() {
        let inf = Point::infinity(Curve::secp256k1());
        assert_eq!(PublicKey::from_point(&inf, true), Err(Error::PointAtInfinity));
    }

    #[test]
    fn test_rejects_64_byte_uncompressed() {
        let mut bytes = vec![0x04];
        bytes.extend_from_slice(&[0x11; 63]);
        assert!(matches!(
            PublicKey::from_binary(&bytes),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_id_of_generator() {
        let key = g();
        assert_eq!(
            hex::encode(key.id().as_bytes()),
            "751e76e8199196d454941c45d1b3a323f1433bd6"
        );
        assert_eq!(key.id().to_string(), "d63b43f123a3b3d1451c9454d4969119e8761e75");
        assert_ne!(key.id_with(false), key.id());
    }

    #[test]
    fn test_address_payload() {
        let payload = g().address_payload(0x4c);
        assert_eq!(payload[0], 0x4c);
        assert_eq!(&payload[1..], g().id().as_bytes());

        let uncompressed = g().address_payload_with(false, 0x4c);
        assert_eq!(uncompressed[0], 0x4c);
        assert_eq!(&uncompressed[1..], g().id_with(false).as_bytes());
        assert_eq!(g().address_payload_with(true, 0x4c), payload);
    }

    #[test]
    fn test_bits_to_int_truncates() {
        let mut digest = [0u8; 32];
        digest[0] = 0x80;
        digest[31] = 0xff;
        assert_eq!(bits_to_int(&digest, 256), U256::from_be_bytes(&digest));
        assert_eq!(bits_to_int(&digest, 161), U256::from_limbs([0, 0, 1 << 32, 0]));
        assert_eq!(bits_to_int(&digest, 1), U256::ONE);
    }

    #[test]
    fn test_verify_rejects_out_of_range() {
        let n = *SECP256K1.order().value();
        let der = Signature::new(n, U256::ONE).to_der();
        assert!(matches!(
            g().verify(b"msg", &der, false),
            Err(Error::SignatureFormat(_))
        ));
    }

    #[test]
    fn test_verify_digest_length() {
        let der = Signature::new(U256::ONE, U256::ONE).to_der();
        assert_eq!(
            g().verify(&[0u8; 31], &der, true),
            Err(Error::Length {
                expected: 32,
                got: 31
            })
        );
    }

    #[test]
    fn test_verify_wrong_signature_is_false() {
        let der = Signature::new(U256::from_u64(12345), U256::from_u64(678)).to_der();
        assert_eq!(g().verify(b"msg", &der, false), Ok(false));
    }

    #[test]
    fn test_recover_rejects_bad_header() {
        let mut sig = [0u8; 65];
        sig[0] = 43;
        sig[32] = 1;
        sig[64] = 1;
        assert!(matches!(
            PublicKey::recover_compact(&[0u8; 32], &sig, Curve::secp256k1()),
            Err(Error::SignatureFormat(_))
        ));
    }
}
