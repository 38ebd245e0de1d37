//! ECDSA signature values and their wire encodings.
//!
//! DER: `30 LL 02 Lr r 02 Ls s` with minimal integers.
//! Compact: `header ‖ r(32) ‖ s(32)`, header = 27 + recid + (4 if compressed).

#![forbid(unsafe_code)]

use altnode_core::{Error, Result};

use super::curve::Curve;
use crate::bigint::U256;
use crate::der;

/// Length of a compact recoverable signature.
pub const COMPACT_SIGNATURE_LEN: usize = 65;

/// Base value of the compact header byte.
pub const COMPACT_HEADER_BASE: u8 = 27;

/// Header bit marking a compressed public key.
const COMPACT_COMPRESSED_FLAG: u8 = 4;

fn format_error(e: Error) -> Error {
    match e {
        Error::Decode(msg) => Error::SignatureFormat(msg),
        other => other,
    }
}

/// An (r, s) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature {
    r: U256,
    s: U256,
}

impl Signature {
    pub fn new(r: U256, s: U256) -> Self {
        Self { r, s }
    }

    pub fn r(&self) -> &U256 {
        &self.r
    }

    pub fn s(&self) -> &U256 {
        &self.s
    }

    /// Parse `SEQUENCE { INTEGER r, INTEGER s }`.
    ///
    /// Only the structure is checked here; see [`check_range`](Self::check_range).
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let mut outer = der::Reader::new(bytes);
        let body = outer.read(der::TAG_SEQUENCE).map_err(format_error)?;
        outer.finish().map_err(format_error)?;

        let mut inner = der::Reader::new(body);
        let r = inner.read_integer().map_err(format_error)?;
        let s = inner.read_integer().map_err(format_error)?;
        inner.finish().map_err(format_error)?;

        Ok(Self { r, s })
    }

    pub fn to_der(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(70);
        der::write_integer(&mut body, &self.r);
        der::write_integer(&mut body, &self.s);
        der::sequence(&body)
    }

    /// Require r, s ∈ [1, n-1].
    pub fn check_range(&self, curve: &Curve) -> Result<()> {
        let n = curve.order();
        if self.r.is_zero() || !n.contains(&self.r) {
            return Err(Error::SignatureFormat("r out of range".into()));
        }
        if self.s.is_zero() || !n.contains(&self.s) {
            return Err(Error::SignatureFormat("s out of range".into()));
        }
        Ok(())
    }

    /// True if s ≤ n/2.
    pub fn is_low_s(&self, curve: &Curve) -> bool {
        self.s <= curve.order().half()
    }

    /// Replace s with n - s when s > n/2.
    pub fn normalize_s(&self, curve: &Curve) -> Self {
        if self.is_low_s(curve) {
            *self
        } else {
            Self {
                r: self.r,
                s: curve.order().neg(&self.s),
            }
        }
    }
}

/// A signature plus what is needed to recover the signer's key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoverableSignature {
    signature: Signature,
    recovery_id: u8,
    compressed: bool,
}

impl RecoverableSignature {
    /// `recovery_id` must be in 0..=3.
    pub fn new(signature: Signature, recovery_id: u8, compressed: bool) -> Result<Self> {
        if recovery_id > 3 {
            return Err(Error::SignatureFormat(format!(
                "recovery id {recovery_id} out of range"
            )));
        }
        Ok(Self {
            signature,
            recovery_id,
            compressed,
        })
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn recovery_id(&self) -> u8 {
        self.recovery_id
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub fn header(&self) -> u8 {
        let flag = if self.compressed {
            COMPACT_COMPRESSED_FLAG
        } else {
            0
        };
        COMPACT_HEADER_BASE + self.recovery_id + flag
    }

    pub fn from_compact(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != COMPACT_SIGNATURE_LEN {
            return Err(Error::SignatureFormat(format!(
                "compact signature must be {COMPACT_SIGNATURE_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let header = bytes[0]
            .checked_sub(COMPACT_HEADER_BASE)
            .filter(|&h| h <= 7)
            .ok_or_else(|| {
                Error::SignatureFormat(format!("invalid compact header {}", bytes[0]))
            })?;

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[1..33]);
        s.copy_from_slice(&bytes[33..65]);

        Ok(Self {
            signature: Signature::new(U256::from_be_bytes(&r), U256::from_be_bytes(&s)),
            recovery_id: header & 3,
            compressed: header & COMPACT_COMPRESSED_FLAG != 0,
        })
    }

    pub fn to_compact(&self) -> [u8; COMPACT_SIGNATURE_LEN] {
        let mut out = [0u8; COMPACT_SIGNATURE_LEN];
        out[0] = self.header();
        out[1..33].copy_from_slice(&self.signature.r.to_be_bytes());
        out[33..65].copy_from_slice(&self.signature.s.to_be_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bigint::u256_from_hex;
    use crate::ec::curve::SECP256K1;

    #[test]
    fn test_der_guard_bytes() {
        let sig = Signature::new(U256::from_u64(0x80), U256::from_u64(0x01));
        assert_eq!(
            sig.to_der(),
            vec![0x30, 0x07, 0x02, 0x02, 0x00, 0x80, 0x02, 0x01, 0x01]
        );
        assert_eq!(Signature::from_der(&sig.to_der()).unwrap(), sig);
    }

    #[test]
    fn test_der_full_width() {
        let r = u256_from_hex("f0000000000000000000000000000000000000000000000000000000000000ff");
        let s = u256_from_hex("00000000000000000000000000000000000000000000000000000000000000ff");
        let der = Signature::new(r, s).to_der();
        assert_eq!(der[0], 0x30);
        assert_eq!(der[3], 33);
        assert_eq!(Signature::from_der(&der).unwrap(), Signature::new(r, s));
    }

    #[test]
    fn test_der_rejects_bad_tags() {
        let mut der = Signature::new(U256::ONE, U256::ONE).to_der();
        der[0] = 0x31;
        assert!(matches!(
            Signature::from_der(&der),
            Err(Error::SignatureFormat(_))
        ));

        let mut der = Signature::new(U256::ONE, U256::ONE).to_der();
        der[2] = 0x03;
        assert!(matches!(
            Signature::from_der(&der),
            Err(Error::SignatureFormat(_))
        ));
    }

    #[test]
    fn test_der_rejects_trailing_bytes() {
        let mut der = Signature::new(U256::ONE, U256::ONE).to_der();
        der.push(0x01);
        assert!(Signature::from_der(&der).is_err());
    }

    #[test]
    fn test_range_check() {
        let n = *SECP256K1.order().value();
        assert!(Signature::new(U256::ZERO, U256::ONE)
            .check_range(&SECP256K1)
            .is_err());
        assert!(Signature::new(U256::ONE, n).check_range(&SECP256K1).is_err());
        assert!(Signature::new(U256::ONE, U256::ONE)
            .check_range(&SECP256K1)
            .is_ok());
    }

    #[test]
    fn test_normalize_s() {
        let n = SECP256K1.order();
        let high = n.value().wrapping_sub(&U256::ONE);
        let sig = Signature::new(U256::ONE, high);
        assert!(!sig.is_low_s(&SECP256K1));
        let low = sig.normalize_s(&SECP256K1);
        assert_eq!(*low.s(), U256::ONE);
        assert!(low.is_low_s(&SECP256K1));

        let half = Signature::new(U256::ONE, n.half());
        assert!(half.is_low_s(&SECP256K1));
    }

    #[test]
    fn test_compact_header() {
        let sig = Signature::new(U256::from_u64(5), U256::from_u64(6));
        let rec = RecoverableSignature::new(sig, 1, true).unwrap();
        let bytes = rec.to_compact();
        assert_eq!(bytes[0], 27 + 1 + 4);
        assert_eq!(RecoverableSignature::from_compact(&bytes).unwrap(), rec);

        assert!(RecoverableSignature::new(sig, 4, false).is_err());
    }

    #[test]
    fn test_compact_rejects_bad_input() {
        let mut bytes = [0u8; 65];
        bytes[0] = 26;
        assert!(RecoverableSignature::from_compact(&bytes).is_err());
        bytes[0] = 35;
        assert!(RecoverableSignature::from_compact(&bytes).is_err());
        bytes[0] = 34;
        assert!(RecoverableSignature::from_compact(&bytes).is_ok());
        assert!(matches!(
            RecoverableSignature::from_compact(&bytes[..64]),
            Err(Error::SignatureFormat(_))
        ));
    }
}
