use thiserror::Error;

/// Errors raised while parsing or validating Ed25519 key material.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("expected {expected} bytes, found {found}")]
    WrongLength { expected: usize, found: usize },

    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),

    #[error("invalid base64 encoding: {0}")]
    InvalidBase64(String),

    #[error("bytes do not encode a valid Ed25519 public key")]
    InvalidPublicKey,

    #[error("bytes do not encode a valid Ed25519 signature")]
    InvalidSignature,
}
