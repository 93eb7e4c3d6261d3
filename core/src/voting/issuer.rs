//! Proof Issuer
//!
//! Produces vote proofs for eligible voters: locates the voter's
//! commitment in the roster, derives the sibling path from the cached
//! tree, and binds the vote payload with the signature digest.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use veilvote_proof::{MerkleProof, VoteProof, sign_payload};

use crate::errors::CastError;

use super::roster::RosterRegistry;
use super::tree_cache::TreeCache;

/// Issues membership proofs against the current roster snapshot
pub struct ProofIssuer {
    registry: Arc<RwLock<RosterRegistry>>,
    cache: Arc<TreeCache>,
}

impl ProofIssuer {
    pub fn new(registry: Arc<RwLock<RosterRegistry>>, cache: Arc<TreeCache>) -> Self {
        Self { registry, cache }
    }

    /// Issue a proof binding `voter_id`'s roster membership to `payload`
    pub async fn issue(&self, voter_id: &str, payload: &Value) -> Result<VoteProof, CastError> {
        let registry = self.registry.read().await;

        if registry.is_empty() {
            return Err(CastError::RosterNotInitialized);
        }

        let commitment = registry
            .commitment(voter_id)
            .ok_or(CastError::VoterNotEligible)?;
        let index = registry
            .position(voter_id)
            .ok_or(CastError::VoterNotEligible)?;

        let tree = self
            .cache
            .get_or_build(&registry)
            .await
            .map_err(|e| CastError::Internal(e.into()))?;
        let path = tree
            .proof(index)
            .map_err(|e| CastError::Internal(e.into()))?;

        Ok(VoteProof {
            root: tree.root(),
            siblings: path.siblings,
            index: path.index,
            commitment,
            signature: sign_payload(voter_id, payload),
            vote_payload: payload.clone(),
        })
    }

    /// Current root and bare inclusion path for a voter, for the
    /// eligibility query surface
    pub async fn membership(&self, voter_id: &str) -> Result<([u8; 32], MerkleProof), CastError> {
        let registry = self.registry.read().await;

        if registry.is_empty() {
            return Err(CastError::RosterNotInitialized);
        }

        let index = registry
            .position(voter_id)
            .ok_or(CastError::VoterNotEligible)?;

        let tree = self
            .cache
            .get_or_build(&registry)
            .await
            .map_err(|e| CastError::Internal(e.into()))?;
        let path = tree
            .proof(index)
            .map_err(|e| CastError::Internal(e.into()))?;

        Ok((tree.root(), path))
    }
}
