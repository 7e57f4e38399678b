//! SHA-256 digests for downloaded artifacts.

use sha2::{Digest, Sha256};
use std::fmt;

/// Lowercase hex SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hex256(String);

impl Hex256 {
    /// Get the hex representation
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Hex256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stateless digest computation and comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Digest of `bytes`.
    #[must_use]
    pub fn digest(bytes: &[u8]) -> Hex256 {
        Hex256(hex::encode(Sha256::digest(bytes)))
    }

    /// Compare two hex digests ignoring ASCII case.
    #[must_use]
    pub fn matches(expected: &str, actual: &Hex256) -> bool {
        expected.trim().eq_ignore_ascii_case(actual.as_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_digest() {
        let digest = ChecksumVerifier::digest(b"test");
        assert_eq!(
            digest.as_hex(),
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let digest = ChecksumVerifier::digest(b"test");
        assert!(ChecksumVerifier::matches(
            "9F86D081884C7D659A2FEAA0C55AD015A3BF4F1B2B0B822CD15D6C15B0F00A08",
            &digest
        ));
    }

    #[test]
    fn test_mismatch() {
        let digest = ChecksumVerifier::digest(b"test");
        assert!(!ChecksumVerifier::matches(
            &ChecksumVerifier::digest(b"other").to_string(),
            &digest
        ));
    }

    proptest! {
        #[test]
        fn prop_digest_matches_itself_in_any_case(
            data in proptest::collection::vec(any::<u8>(), 0..512)
        ) {
            let digest = ChecksumVerifier::digest(&data);
            prop_assert_eq!(digest.as_hex().len(), 64);
            prop_assert!(ChecksumVerifier::matches(&digest.as_hex().to_uppercase(), &digest));
        }

        #[test]
        fn prop_distinct_inputs_do_not_match(
            a in proptest::collection::vec(any::<u8>(), 1..64),
            b in proptest::collection::vec(any::<u8>(), 1..64),
        ) {
            prop_assume!(a != b);
            let da = ChecksumVerifier::digest(&a);
            let db = ChecksumVerifier::digest(&b);
            prop_assert!(!ChecksumVerifier::matches(da.as_hex(), &db));
        }
    }
}
