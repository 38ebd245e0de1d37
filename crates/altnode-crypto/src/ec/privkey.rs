//! Private keys: generation, WIF and SEC1 DER codecs, deterministic signing.
//!
//! ECPrivateKey (RFC 5915):
//! ```text
//! SEQUENCE {
//!     version     INTEGER (1),
//!     privateKey  OCTET STRING,
//!     parameters  [0] ECParameters OPTIONAL,
//!     publicKey   [1] BIT STRING OPTIONAL }
//! ```

#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use altnode_core::{Error, Result};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use tracing::{debug, trace, warn};
use zeroize::{Zeroize, Zeroizing};

use super::curve::Curve;
use super::params;
use super::point::Point;
use super::pubkey::{bits_to_int, digest_scalar, message_digest, PublicKey};
use super::signature::{RecoverableSignature, Signature, COMPACT_SIGNATURE_LEN};
use crate::base58;
use crate::bigint::U256;
use crate::der::{self, Reader, TAG_BIT_STRING, TAG_OCTET_STRING, TAG_SEQUENCE};
use crate::hash::sha256d;
use crate::hmac::NonceGenerator;

/// RFC 6979 candidates tried before giving up.
const MAX_NONCE_ATTEMPTS: usize = 1000;

/// Trailing WIF byte marking a compressed public key.
const WIF_COMPRESSED_FLAG: u8 = 0x01;

const SCALAR_LEN: usize = 32;

const EC_PRIVATE_KEY_VERSION: u64 = 1;

/// The secret scalar. Wiped on drop.
#[derive(Clone)]
struct SecretScalar(U256);

impl Drop for SecretScalar {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Output of [`PrivateKey::sign_internal`].
#[derive(Clone, Debug)]
pub struct SignatureParts {
    /// The low-S signature.
    pub signature: Signature,
    /// R = k·G for the nonce k.
    pub nonce_point: Point,
    /// True if s was replaced by n - s.
    pub s_negated: bool,
}

/// A scalar in [1, n-1] with its public key and WIF version byte.
#[derive(Clone)]
pub struct PrivateKey {
    secret: SecretScalar,
    public: PublicKey,
    version: u8,
}

impl PrivateKey {
    /// Fresh key from the operating system RNG.
    pub fn generate(curve: Arc<Curve>, compressed: bool, version: u8) -> Result<Self> {
        Self::generate_with(&mut OsRng, curve, compressed, version)
    }

    /// Fresh key from `rng`, uniform in [1, n-1] by rejection sampling.
    pub fn generate_with<R: RngCore + CryptoRng>(
        rng: &mut R,
        curve: Arc<Curve>,
        compressed: bool,
        version: u8,
    ) -> Result<Self> {
        let n = curve.order();
        let bits = n.value().bits();
        let mut buf = Zeroizing::new([0u8; SCALAR_LEN]);
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            rng.fill_bytes(&mut buf[..]);
            let excess = SCALAR_LEN * 8 - bits;
            if excess >= 8 {
                buf[..excess / 8].fill(0);
            }
            buf[excess / 8] &= 0xff >> (excess % 8);

            let candidate = U256::from_be_bytes(&buf);
            if !candidate.is_zero() && n.contains(&candidate) {
                trace!(attempts, "generated private key");
                return Self::from_valid_scalar(curve, candidate, compressed, version);
            }
        }
    }

    fn from_valid_scalar(
        curve: Arc<Curve>,
        scalar: U256,
        compressed: bool,
        version: u8,
    ) -> Result<Self> {
        let public = PublicKey::from_point(&Point::generator(&curve).mul(&scalar), compressed)?;
        Ok(Self {
            secret: SecretScalar(scalar),
            public,
            version,
        })
    }

    /// Key from a scalar; fails unless 1 ≤ scalar < n.
    pub fn from_scalar(
        curve: Arc<Curve>,
        scalar: U256,
        compressed: bool,
        version: u8,
    ) -> Result<Self> {
        if scalar.is_zero() || !curve.order().contains(&scalar) {
            return Err(Error::ScalarOutOfRange);
        }
        Self::from_valid_scalar(curve, scalar, compressed, version)
    }

    /// Key from a 32-byte big-endian scalar.
    pub fn from_binary_number(
        bytes: &[u8],
        curve: Arc<Curve>,
        compressed: bool,
        version: u8,
    ) -> Result<Self> {
        let bytes: &[u8; SCALAR_LEN] = bytes.try_into().map_err(|_| Error::Length {
            expected: SCALAR_LEN,
            got: bytes.len(),
        })?;
        Self::from_scalar(curve, U256::from_be_bytes(bytes), compressed, version)
    }

    /// Import `base58check(version ‖ scalar ‖ [0x01])` on secp256k1.
    pub fn from_wif(s: &str) -> Result<Self> {
        let payload = Zeroizing::new(base58::decode_check(s)?);
        let compressed = match payload.len() {
            33 => false,
            34 if payload[33] == WIF_COMPRESSED_FLAG => true,
            34 => {
                return Err(Error::Decode(format!(
                    "invalid WIF compression flag 0x{:02x}",
                    payload[33]
                )))
            }
            got => return Err(Error::Length { expected: 34, got }),
        };
        Self::from_binary_number(
            &payload[1..1 + SCALAR_LEN],
            Curve::secp256k1(),
            compressed,
            payload[0],
        )
    }

    /// Import a SEC1 `ECPrivateKey`.
    ///
    /// The curve comes from `curve` if given, else from the embedded
    /// parameters, else secp256k1. When both are present and disagree the
    /// caller's curve wins and a warning is logged. An embedded public key
    /// must match the scalar; its encoding sets the compression preference
    /// (compressed when absent).
    pub fn from_der(bytes: &[u8], curve: Option<Arc<Curve>>, version: u8) -> Result<Self> {
        let mut outer = Reader::new(bytes);
        let body = outer.read(TAG_SEQUENCE)?;
        outer.finish()?;

        let mut r = Reader::new(body);
        let key_version = r.read_small_integer()?;
        if key_version != EC_PRIVATE_KEY_VERSION {
            return Err(Error::Decode(format!(
                "unsupported EC private key version {key_version}"
            )));
        }
        let secret = r.read(TAG_OCTET_STRING)?;
        let parameters = r.read_optional(der::context(0))?;
        let public = r.read_optional(der::context(1))?;
        r.finish()?;

        let embedded = parameters.map(params::decode).transpose()?;
        let curve = match (curve, embedded) {
            (Some(given), Some(embedded)) => {
                if *given != embedded {
                    let mismatch = Error::CurveMismatch(
                        "embedded parameters differ from the requested curve".into(),
                    );
                    warn!(error = %mismatch, "using the requested curve");
                }
                given
            }
            (Some(given), None) => given,
            (None, Some(embedded)) => Arc::new(embedded),
            (None, None) => Curve::secp256k1(),
        };

        if secret.is_empty() || secret.len() > SCALAR_LEN {
            return Err(Error::Length {
                expected: curve.order_bytes(),
                got: secret.len(),
            });
        }
        let scalar = U256::from_be_slice(secret).ok_or(Error::ScalarOutOfRange)?;
        let mut key = Self::from_scalar(Arc::clone(&curve), scalar, true, version)?;

        if let Some(public) = public {
            let mut bits = Reader::new(public);
            let contents = bits.read(TAG_BIT_STRING)?;
            bits.finish()?;
            let encoded = match contents.split_first() {
                Some((&0, encoded)) => encoded,
                _ => return Err(Error::Decode("malformed public key bit string".into())),
            };
            let embedded = PublicKey::from_binary_on(curve, encoded)?;
            if embedded.point() != key.public.point() {
                return Err(Error::Decode(
                    "embedded public key does not match the private key".into(),
                ));
            }
            key.set_compressed(embedded.is_compressed());
        }

        Ok(key)
    }

    /// Export as a SEC1 `ECPrivateKey` with explicit curve parameters.
    pub fn to_der(&self) -> Vec<u8> {
        let curve = self.curve();
        let compressed = self.is_compressed();
        let secret = Zeroizing::new(self.secret.0.to_be_bytes());
        let width = curve.order_bytes();

        let mut public = vec![0x00];
        public.extend_from_slice(&self.public.serialize());
        let mut bit_string = Vec::with_capacity(public.len() + 3);
        der::write_tlv(&mut bit_string, TAG_BIT_STRING, &public);

        let mut body = Zeroizing::new(Vec::with_capacity(320));
        der::write_integer(&mut body, &U256::from_u64(EC_PRIVATE_KEY_VERSION));
        der::write_tlv(&mut body, TAG_OCTET_STRING, &secret[SCALAR_LEN - width..]);
        der::write_tlv(
            &mut body,
            der::context(0),
            &params::encode_explicit(curve, compressed),
        );
        der::write_tlv(&mut body, der::context(1), &bit_string);
        der::sequence(&body)
    }

    /// 32 big-endian bytes of the scalar.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; SCALAR_LEN]> {
        Zeroizing::new(self.secret.0.to_be_bytes())
    }

    /// `base58check(version ‖ scalar ‖ [0x01 if compressed])`.
    pub fn to_wif(&self) -> String {
        let mut payload = Zeroizing::new(Vec::with_capacity(SCALAR_LEN + 2));
        payload.push(self.version);
        payload.extend_from_slice(&self.secret_bytes()[..]);
        if self.is_compressed() {
            payload.push(WIF_COMPRESSED_FLAG);
        }
        base58::encode_check(&payload)
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn curve(&self) -> &Arc<Curve> {
        self.public.curve()
    }

    /// WIF version byte.
    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn is_compressed(&self) -> bool {
        self.public.is_compressed()
    }

    pub fn set_compressed(&mut self, compressed: bool) {
        self.public.set_compressed(compressed);
    }

    /// RFC 6979 nonce for `digest`, with HMAC-SHA256 and 0 < k < n.
    ///
    /// The key and reduced digest are seeded as `rlen`-byte octets and
    /// each candidate is truncated to the bit length of n.
    pub fn nonce(&self, digest: &[u8; 32]) -> Result<U256> {
        let curve = self.curve();
        let n = curve.order();
        let qlen = n.value().bits();
        let skip = SCALAR_LEN - curve.order_bytes();

        let secret = self.secret_bytes();
        let h = digest_scalar(curve, digest).to_be_bytes();
        let mut generator = NonceGenerator::new(&secret[skip..], &h[skip..])?;

        for attempt in 0..MAX_NONCE_ATTEMPTS {
            let candidate = Zeroizing::new(generator.next_candidate()?);
            let mut k = bits_to_int(&candidate, qlen);
            if !k.is_zero() && n.contains(&k) {
                return Ok(k);
            }
            k.zeroize();
            debug!(attempt, "nonce candidate out of range");
        }
        Err(Error::Signing(format!(
            "no valid nonce after {MAX_NONCE_ATTEMPTS} attempts"
        )))
    }

    /// Raw ECDSA over sha256d(message), or over `message` when `is_digest`.
    ///
    /// The returned signature is low-S.
    pub fn sign_internal(&self, message: &[u8], is_digest: bool) -> Result<SignatureParts> {
        let digest = message_digest(message, is_digest)?;
        self.sign_digest(&digest)
    }

    fn sign_digest(&self, digest: &[u8; 32]) -> Result<SignatureParts> {
        let curve = self.curve();
        let n = curve.order();
        let e = digest_scalar(curve, digest);

        let mut k = self.nonce(digest)?;
        let nonce_point = Point::generator(curve).mul(&k);
        let r = match nonce_point.x() {
            Some(x) => n.reduce(x),
            None => return Err(Error::Signing("nonce point is the identity".into())),
        };
        if r.is_zero() {
            return Err(Error::Signing("r is zero".into()));
        }

        let k_inv = n.inv(&k);
        k.zeroize();
        let mut k_inv = k_inv.ok_or_else(|| Error::Signing("nonce is not invertible".into()))?;

        // s = k⁻¹(e + r·d)
        let s = n.mul(&k_inv, &n.add(&e, &n.mul(&r, &self.secret.0)));
        k_inv.zeroize();
        if s.is_zero() {
            return Err(Error::Signing("s is zero".into()));
        }

        let raw = Signature::new(r, s);
        let signature = raw.normalize_s(curve);
        Ok(SignatureParts {
            signature,
            nonce_point,
            s_negated: signature != raw,
        })
    }

    /// DER-encoded low-S signature.
    pub fn sign(&self, message: &[u8], is_digest: bool) -> Result<Vec<u8>> {
        Ok(self.sign_internal(message, is_digest)?.signature.to_der())
    }

    /// 65-byte compact signature over sha256d(message).
    ///
    /// The header marks a compressed key if `force_compressed` is set or
    /// this key prefers compression.
    pub fn sign_compact(
        &self,
        message: &[u8],
        force_compressed: bool,
    ) -> Result<[u8; COMPACT_SIGNATURE_LEN]> {
        let compressed = force_compressed || self.is_compressed();
        let digest = sha256d(message);
        Ok(self.sign_recoverable(&digest, compressed)?.to_compact())
    }

    /// Sign `digest` and attach the recovery id that yields this key.
    pub fn sign_recoverable(
        &self,
        digest: &[u8; 32],
        compressed: bool,
    ) -> Result<RecoverableSignature> {
        let parts = self.sign_digest(digest)?;
        let n = self.curve().order();

        if let (Some(rx), Some(ry)) = (parts.nonce_point.x(), parts.nonce_point.y()) {
            let parity = u8::from(ry.is_odd() ^ parts.s_negated);
            let overflow = u8::from(!n.contains(rx));
            let derived = (overflow << 1) | parity;
            if let Some(rec) = self.try_recovery_id(digest, &parts.signature, derived, compressed)? {
                return Ok(rec);
            }
        }

        debug!("derived recovery id did not reproduce the key, searching");
        for id in 0..4 {
            if let Some(rec) = self.try_recovery_id(digest, &parts.signature, id, compressed)? {
                return Ok(rec);
            }
        }
        Err(Error::Signing("no recovery id reproduces the signing key".into()))
    }

    fn try_recovery_id(
        &self,
        digest: &[u8; 32],
        signature: &Signature,
        id: u8,
        compressed: bool,
    ) -> Result<Option<RecoverableSignature>> {
        let rec = RecoverableSignature::new(*signature, id, compressed)?;
        Ok(
            match PublicKey::recover(digest, &rec, Arc::clone(self.curve()))? {
                Some(key) if key.point() == self.public.point() => Some(rec),
                _ => None,
            },
        )
    }
}

impl FromStr for PrivateKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_wif(s)
    }
}

/// Prints the WIF encoding.
impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wif())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public", &hex::encode(self.public.serialize()))
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}
