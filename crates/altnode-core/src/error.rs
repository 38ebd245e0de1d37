use thiserror::Error;

/// Failures raised while decoding, signing or checking keys.
///
/// Only malformed input is an error. A well-formed signature that does not
/// match its key is reported as `Ok(false)` by the verify functions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("decode error: {0}")]
    Decode(String),

    #[error("invalid length: expected {expected}, got {got}")]
    Length { expected: usize, got: usize },

    #[error("malformed signature: {0}")]
    SignatureFormat(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("curve parameters mismatch: {0}")]
    CurveMismatch(String),

    #[error("invalid curve parameters: {0}")]
    InvalidCurve(String),

    #[error("invalid checksum")]
    Checksum,

    #[error("invalid base58 string: {0}")]
    Base58(String),

    #[error("scalar out of range")]
    ScalarOutOfRange,

    #[error("point at infinity")]
    PointAtInfinity,
}
