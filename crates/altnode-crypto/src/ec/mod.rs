//! Elliptic-curve keys and ECDSA over short-Weierstrass curves.

#![forbid(unsafe_code)]

pub mod curve;
pub mod params;
pub mod point;
pub mod privkey;
pub mod pubkey;
pub mod signature;

pub use curve::{Curve, SECP256K1};
pub use point::Point;
pub use privkey::{PrivateKey, SignatureParts};
pub use pubkey::{KeyId, PublicKey};
pub use signature::{RecoverableSignature, Signature, COMPACT_SIGNATURE_LEN};
