//! Vote Proofs
//!
//! A vote proof binds Merkle inclusion of a voter commitment to one
//! specific vote payload:
//!
//! ```text
//! VoteProof = { root, sibling_path, commitment, payload, signature }
//! signature = SHA-256(canonical_json({ voter_id, vote_payload }))
//! ```
//!
//! The canonical encoding sorts object keys at every nesting level, so
//! recomputing the signature is independent of who produced the original
//! encoding. The voter identifier is never part of the public proof; the
//! verifier receives it out-of-band.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::commitment::Commitment;
use crate::merkle::MerkleProof;

/// Sanity bound on path depth: 2^64 leaves is already unrepresentable
const MAX_PATH_DEPTH: usize = 64;

/// Why a proof was rejected.
///
/// The variants distinguish shape faults from cryptographic mismatches
/// for observability; all of them collapse to a plain reject at the
/// boolean contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProofRejection {
    /// The proof's shape is inconsistent before any hashing happens
    #[error("malformed proof: {0}")]
    Malformed(&'static str),

    /// The sibling path does not reconstruct the claimed root
    #[error("merkle path does not reconstruct the claimed root")]
    RootMismatch,

    /// The payload signature does not match recomputation
    #[error("payload signature mismatch")]
    SignatureMismatch,
}

/// A membership proof bound to one vote payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteProof {
    /// Roster root the proof was derived against
    #[serde(with = "hex::serde")]
    pub root: [u8; 32],
    /// Sibling digests, leaf level to root, one per tree level
    pub siblings: Vec<[u8; 32]>,
    /// Leaf position of the voter's commitment
    pub index: u64,
    /// The voter's commitment
    pub commitment: Commitment,
    /// The vote payload the signature binds
    pub vote_payload: Value,
    /// Tamper-evident binding of (voter_id, vote_payload)
    #[serde(with = "hex::serde")]
    pub signature: [u8; 32],
}

/// Compute the signature digest binding a voter to a payload.
///
/// serde_json maps are BTree-backed, so keys sort at every nesting level
/// and the digest is stable across producers.
pub fn sign_payload(voter_id: &str, vote_payload: &Value) -> [u8; 32] {
    let envelope = serde_json::json!({
        "voter_id": voter_id,
        "vote_payload": vote_payload,
    });

    let bytes = serde_json::to_vec(&envelope).expect("signature envelope serialization");

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hasher.finalize().into()
}

impl VoteProof {
    /// Check the proof, reporting why it fails.
    ///
    /// Total: every fault maps to a [`ProofRejection`], nothing panics.
    /// The voter identifier is supplied by the caller since the proof
    /// does not carry it.
    pub fn check(&self, voter_id: &str) -> Result<(), ProofRejection> {
        if self.siblings.len() > MAX_PATH_DEPTH {
            return Err(ProofRejection::Malformed("sibling path too deep"));
        }

        // an index that does not reduce to position 0 over this many
        // levels cannot belong to any tree of this depth
        if self.siblings.len() < MAX_PATH_DEPTH && self.index >> self.siblings.len() != 0 {
            return Err(ProofRejection::Malformed("leaf index exceeds path depth"));
        }

        if !self.merkle_path().verify(self.commitment.as_bytes(), &self.root) {
            return Err(ProofRejection::RootMismatch);
        }

        if sign_payload(voter_id, &self.vote_payload) != self.signature {
            return Err(ProofRejection::SignatureMismatch);
        }

        Ok(())
    }

    /// Boolean contract: ambiguous or malformed input is always treated
    /// as non-membership, never accidentally accepted.
    pub fn verify(&self, voter_id: &str) -> bool {
        self.check(voter_id).is_ok()
    }

    /// The Merkle portion of the proof
    pub fn merkle_path(&self) -> MerkleProof {
        MerkleProof {
            siblings: self.siblings.clone(),
            index: self.index,
        }
    }
}
