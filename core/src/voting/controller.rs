//! Vote Cast Controller
//!
//! Orchestrates the end-to-end vote submission protocol:
//!
//! ```text
//! Initiated → EligibilityConfirmed → ProofVerified → LedgerSubmitted → Recorded
//!      \______________\____________________\________________/
//!                          ↘ Rejected (first failing guard)
//! ```
//!
//! Guards run in order and each failure is a hard stop: later-stage
//! information is never computed once an earlier guard fails. The only
//! durable side effect is the final record step; a ledger failure
//! therefore leaves nothing behind and the whole attempt can be retried.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;

use veilvote_proof::Nullifier;

use crate::config::NullifierScope;
use crate::errors::CastError;
use crate::storage::{RocksDbStore, StoreError};

use super::election::VoteRecord;
use super::issuer::ProofIssuer;
use super::ledger::{LedgerClient, ProofContext};

/// Progress of a single cast attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CastState {
    Initiated,
    EligibilityConfirmed,
    ProofVerified,
    LedgerSubmitted,
    Recorded,
    Rejected,
}

/// One inbound cast attempt
#[derive(Debug, Clone)]
pub struct CastRequest {
    pub election_id: u64,
    pub voter_id: String,
    pub vote_payload: Value,
    pub nullifier: Nullifier,
}

/// Returned to the caller after a recorded vote
#[derive(Debug, Clone, Serialize)]
pub struct CastReceipt {
    /// BLAKE3(nullifier || commitment), hex
    pub receipt_id: String,
    /// Ledger transaction reference
    pub tx_ref: String,
    /// Roster root the proof was verified against, hex
    pub merkle_root: String,
    pub state: CastState,
}

/// Drives the vote submission protocol end to end.
///
/// Explicitly constructed and injected; concurrent tests build
/// independent instances with their own store and ledger.
pub struct VoteCastController<L: LedgerClient> {
    store: RocksDbStore,
    issuer: ProofIssuer,
    ledger: Arc<L>,
    nullifier_scope: NullifierScope,
}

impl<L: LedgerClient> VoteCastController<L> {
    pub fn new(
        store: RocksDbStore,
        issuer: ProofIssuer,
        ledger: Arc<L>,
        nullifier_scope: NullifierScope,
    ) -> Self {
        Self {
            store,
            issuer,
            ledger,
            nullifier_scope,
        }
    }

    /// Run one cast attempt through the protocol
    pub async fn cast(&self, request: CastRequest) -> Result<CastReceipt, CastError> {
        let election_id = request.election_id;

        let result = self.run_protocol(request).await;

        if let Err(err) = &result {
            let state = CastState::Rejected;
            warn!("cast attempt: election={election_id} state={state:?} reason={err}");
        }

        result
    }

    async fn run_protocol(&self, request: CastRequest) -> Result<CastReceipt, CastError> {
        let mut state = CastState::Initiated;
        debug!(
            "cast attempt: election={} state={state:?}",
            request.election_id
        );

        // 1. election must be inside its voting window and not finalized
        let election = self
            .store
            .get_election(request.election_id)?
            .ok_or(CastError::ElectionNotFound(request.election_id))?;

        if !election.is_active_at(Utc::now()) {
            return Err(CastError::ElectionNotActive(request.election_id));
        }

        // 2. no existing vote for (election, voter)
        if self.store.has_voted(request.election_id, &request.voter_id)? {
            return Err(CastError::AlreadyVoted(request.election_id));
        }

        // 3. nullifier unused within its scope
        let nullifier_key = self.store.nullifier_key(
            self.nullifier_scope,
            request.election_id,
            &request.nullifier,
        );
        if self.store.nullifier_exists(&nullifier_key)? {
            return Err(CastError::NullifierReused);
        }

        state = CastState::EligibilityConfirmed;
        debug!(
            "cast attempt: election={} state={state:?}",
            request.election_id
        );

        // 4. derive the proof against the current cached tree and verify it
        let proof = self
            .issuer
            .issue(&request.voter_id, &request.vote_payload)
            .await?;

        proof
            .check(&request.voter_id)
            .map_err(|r| CastError::ProofInvalid(r.to_string()))?;

        state = CastState::ProofVerified;
        debug!(
            "cast attempt: election={} state={state:?}",
            request.election_id
        );

        // 5. external ledger confirms the proof and executes the vote;
        //    nothing has been persisted if this fails
        let confirmed = self
            .ledger
            .verify_membership(
                &proof.root,
                proof.commitment.as_bytes(),
                request.nullifier.as_bytes(),
            )
            .await
            .map_err(|e| CastError::LedgerSubmissionFailed(e.to_string()))?;

        if !confirmed {
            return Err(CastError::LedgerSubmissionFailed(
                "ledger rejected the membership proof".to_string(),
            ));
        }

        let proof_context = ProofContext {
            merkle_root: hex::encode(proof.root),
            signal: proof.commitment.to_hex(),
            nullifier: request.nullifier.to_hex(),
        };

        let tx_ref = self
            .ledger
            .submit_vote(request.election_id, &request.vote_payload, &proof_context)
            .await
            .map_err(|e| CastError::LedgerSubmissionFailed(e.to_string()))?;

        state = CastState::LedgerSubmitted;
        debug!(
            "cast attempt: election={} state={state:?}",
            request.election_id
        );

        // 6. the one durable step: atomic insert of record + nullifier.
        //    a conflict here means a concurrent attempt won the race
        //    after our optimistic checks in 2-3 passed
        let merkle_root = proof_context.merkle_root.clone();
        let receipt_id = receipt_id(&request.nullifier, proof.commitment.as_bytes());

        let record = VoteRecord {
            election_id: request.election_id,
            voter_id: request.voter_id,
            vote_payload: request.vote_payload,
            proof,
            nullifier: request.nullifier,
            tx_ref: tx_ref.clone(),
            verified: true,
            recorded_at: Utc::now(),
        };

        match self.store.record_vote(&record, &nullifier_key) {
            Ok(()) => {}
            Err(StoreError::DuplicateVote { election_id }) => {
                return Err(CastError::AlreadyVoted(election_id));
            }
            Err(StoreError::DuplicateNullifier) => return Err(CastError::NullifierReused),
            Err(StoreError::Db(e)) => return Err(CastError::Internal(e)),
        }

        info!(
            "vote recorded: election={} receipt={receipt_id} tx={tx_ref}",
            record.election_id
        );

        Ok(CastReceipt {
            receipt_id,
            tx_ref,
            merkle_root,
            state: CastState::Recorded,
        })
    }
}

/// Receipt id = BLAKE3(nullifier || commitment), hex encoded
fn receipt_id(nullifier: &Nullifier, commitment: &[u8; 32]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(nullifier.as_bytes());
    hasher.update(commitment);
    hex::encode(hasher.finalize().as_bytes())
}
