//! Ed25519 key and signature newtypes, plus the [`Signer`] capability that
//! `hmsc-manager` delegates signature verification to.

pub mod error;
pub mod keys;
pub mod pin;
pub mod signer;

pub use error::CryptoError;
pub use keys::{PublicKey, Signature};
pub use signer::{Ed25519Signer, Signer};
