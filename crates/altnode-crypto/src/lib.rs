//! Key and signature layer for altnode.
//!
//! Curve arithmetic, ECDSA and the key codecs are implemented here on top of
//! a fixed-width 256-bit integer. Hash primitives come from `sha2` and
//! `ripemd`.

#![forbid(unsafe_code)]

pub mod base58;
pub mod bigint;
pub mod der;
pub mod ec;
pub mod hash;
pub mod hmac;
pub mod message;
pub mod modular;

pub use bigint::U256;
pub use ec::{
    Curve, KeyId, Point, PrivateKey, PublicKey, RecoverableSignature, Signature, SECP256K1,
};
pub use message::MessageSigner;
