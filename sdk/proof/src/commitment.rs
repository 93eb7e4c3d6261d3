//! Voter Commitments
//!
//! A commitment is the SHA-256 digest of a voter identifier.
//!
//! ```text
//! Commitment = SHA-256(voter_id)
//! ```
//!
//! The roster tree and every proof only carry digests; the identifier
//! itself never appears in the public record. Commitments are derived,
//! never stored independently of their source identifier.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A voter commitment (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment(pub [u8; 32]);

impl Commitment {
    /// Derive the commitment for a voter identifier
    pub fn derive(voter_id: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(voter_id.as_bytes());
        Self(hasher.finalize().into())
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex encoding for API and log output
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for Commitment {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commitment_deterministic() {
        let c1 = Commitment::derive("voter-42");
        let c2 = Commitment::derive("voter-42");

        assert_eq!(c1, c2, "same identifier should produce same commitment");
    }

    #[test]
    fn test_commitment_binding() {
        let c1 = Commitment::derive("voter-42");
        let c2 = Commitment::derive("voter-43");

        assert_ne!(
            c1, c2,
            "different identifiers should produce different commitments"
        );
    }

    #[test]
    fn test_commitment_matches_plain_sha256() {
        let c = Commitment::derive("addr1");

        let mut hasher = Sha256::new();
        hasher.update(b"addr1");
        let expected: [u8; 32] = hasher.finalize().into();

        assert_eq!(c.0, expected);
    }
}
