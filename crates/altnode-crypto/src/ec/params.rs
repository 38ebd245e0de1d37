//! SEC1 `ECParameters`: the secp256k1 named-curve OID or an explicit
//! `SpecifiedECDomain` over a prime field.
//!
//! ```text
//! SpecifiedECDomain ::= SEQUENCE {
//!     version   INTEGER { ecdpVer1(1) },
//!     fieldID   SEQUENCE { prime-field OID, p INTEGER },
//!     curve     SEQUENCE { a OCTET STRING, b OCTET STRING, seed BIT STRING OPTIONAL },
//!     base      OCTET STRING,   -- SEC1 encoding of G
//!     order     INTEGER,
//!     cofactor  INTEGER OPTIONAL,
//!     hash      AlgorithmIdentifier OPTIONAL }
//! ```

#![forbid(unsafe_code)]

use altnode_core::{Error, Result};

use super::curve::{Curve, SECP256K1};
use super::point::encode_sec1;
use crate::bigint::U256;
use crate::der::{self, Reader, TAG_BIT_STRING, TAG_INTEGER, TAG_OCTET_STRING, TAG_OID, TAG_SEQUENCE};

/// 1.3.132.0.10
pub const SECP256K1_OID: &[u8] = &[0x2b, 0x81, 0x04, 0x00, 0x0a];

/// 1.2.840.10045.1.1
const PRIME_FIELD_OID: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x01, 0x01];

/// Decode one `ECParameters` TLV.
pub fn decode(bytes: &[u8]) -> Result<Curve> {
    let mut reader = Reader::new(bytes);
    let (tag, contents) = reader.read_any()?;
    reader.finish()?;

    match tag {
        TAG_OID if contents == SECP256K1_OID => Ok(SECP256K1),
        TAG_OID => Err(Error::Decode("unsupported named curve".into())),
        TAG_SEQUENCE => decode_specified(contents),
        other => Err(Error::Decode(format!(
            "unexpected EC parameters tag 0x{other:02x}"
        ))),
    }
}

fn decode_specified(body: &[u8]) -> Result<Curve> {
    let mut r = Reader::new(body);

    let version = r.read_small_integer()?;
    if !(1..=3).contains(&version) {
        return Err(Error::Decode(format!(
            "unsupported EC domain version {version}"
        )));
    }

    let mut field_id = Reader::new(r.read(TAG_SEQUENCE)?);
    if field_id.read(TAG_OID)? != PRIME_FIELD_OID {
        return Err(Error::Decode("only prime fields are supported".into()));
    }
    let p = field_id.read_integer()?;
    field_id.finish()?;

    let mut curve = Reader::new(r.read(TAG_SEQUENCE)?);
    let a = field_element(curve.read(TAG_OCTET_STRING)?)?;
    let b = field_element(curve.read(TAG_OCTET_STRING)?)?;
    curve.read_optional(TAG_BIT_STRING)?;
    curve.finish()?;

    let base = r.read(TAG_OCTET_STRING)?;
    let n = r.read_integer()?;
    let cofactor = match r.read_optional(TAG_INTEGER)? {
        Some(contents) => der::parse_unsigned(contents)?,
        None => U256::ONE,
    };
    r.read_optional(TAG_SEQUENCE)?;
    r.finish()?;

    Curve::with_encoded_generator(p, a, b, base, n, cofactor)
}

fn field_element(bytes: &[u8]) -> Result<U256> {
    U256::from_be_slice(bytes)
        .ok_or_else(|| Error::Decode("field element exceeds 256 bits".into()))
}

fn fixed_width(v: &U256, width: usize) -> Vec<u8> {
    v.to_be_bytes()[32 - width..].to_vec()
}

/// Encode `curve` as explicit parameters, with G in the requested form.
pub fn encode_explicit(curve: &Curve, compressed: bool) -> Vec<u8> {
    let width = curve.field_bytes();

    let mut field_id = Vec::with_capacity(48);
    der::write_tlv(&mut field_id, TAG_OID, PRIME_FIELD_OID);
    der::write_integer(&mut field_id, curve.field().value());

    let mut equation = Vec::with_capacity(2 * width + 4);
    der::write_tlv(&mut equation, TAG_OCTET_STRING, &fixed_width(curve.a(), width));
    der::write_tlv(&mut equation, TAG_OCTET_STRING, &fixed_width(curve.b(), width));

    let (gx, gy) = curve.generator_coords();
    let base = encode_sec1(curve, &gx, &gy, compressed);

    let mut body = Vec::with_capacity(256);
    der::write_integer(&mut body, &U256::ONE);
    der::write_tlv(&mut body, TAG_SEQUENCE, &field_id);
    der::write_tlv(&mut body, TAG_SEQUENCE, &equation);
    der::write_tlv(&mut body, TAG_OCTET_STRING, &base);
    der::write_integer(&mut body, curve.order().value());
    der::write_integer(&mut body, curve.cofactor());
    der::sequence(&body)
}

/// Encode the secp256k1 named-curve OID.
pub fn encode_named_secp256k1() -> Vec<u8> {
    let mut out = Vec::with_capacity(SECP256K1_OID.len() + 2);
    der::write_tlv(&mut out, TAG_OID, SECP256K1_OID);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_curve() {
        let encoded = encode_named_secp256k1();
        assert_eq!(hex::encode(&encoded), "06052b8104000a");
        assert_eq!(decode(&encoded).unwrap(), SECP256K1);
    }

    #[test]
    fn test_unknown_named_curve() {
        // prime256v1
        let bytes = hex::decode("06082a8648ce3d030107").unwrap();
        assert!(matches!(decode(&bytes), Err(Error::Decode(_))));
    }

    #[test]
    fn test_explicit_roundtrip() {
        for compressed in [true, false] {
            let encoded = encode_explicit(&SECP256K1, compressed);
            assert_eq!(decode(&encoded).unwrap(), SECP256K1);
        }
    }

    #[test]
    fn test_explicit_rejects_wrong_generator() {
        let mut encoded = encode_explicit(&SECP256K1, false);
        // last byte of Gy sits just before the order INTEGER
        let order_len = 2 + 33 + 3;
        let pos = encoded.len() - order_len - 1;
        encoded[pos] ^= 1;
        assert!(matches!(decode(&encoded), Err(Error::InvalidCurve(_))));
    }

    #[test]
    fn test_explicit_rejects_binary_field() {
        let mut encoded = encode_explicit(&SECP256K1, true);
        // characteristic-two-field is 1.2.840.10045.1.2
        let pos = encoded
            .windows(PRIME_FIELD_OID.len())
            .position(|w| w == PRIME_FIELD_OID)
            .unwrap();
        encoded[pos + PRIME_FIELD_OID.len() - 1] = 0x02;
        assert!(matches!(decode(&encoded), Err(Error::Decode(_))));
    }
}
