//! Constant-time session PIN comparison.
//!
//! Hashing both sides to a fixed-width digest before comparing means the
//! comparison time depends neither on the position of the first differing
//! character nor on the relative lengths of the two inputs.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub fn pins_match(candidate: &str, expected: &str) -> bool {
    let candidate_digest = Sha256::digest(candidate.as_bytes());
    let expected_digest = Sha256::digest(expected.as_bytes());
    candidate_digest.ct_eq(&expected_digest).into()
}
