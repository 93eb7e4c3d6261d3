//! API Handlers
//!
//! Request handlers for the HTTP API.

use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use log::{error, info, warn};
use tokio::sync::RwLock;

use veilvote_proof::Nullifier;

use super::types::*;
use crate::errors::CastError;
use crate::storage::RocksDbStore;
use crate::voting::{
    CastRequest, Ledger, ProofIssuer, RosterError, RosterRegistry, TreeCache, VoteCastController,
};

// ============================================================================
// Shared State
// ============================================================================

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub store: RocksDbStore,
    pub registry: Arc<RwLock<RosterRegistry>>,
    pub cache: Arc<TreeCache>,
    pub issuer: Arc<ProofIssuer>,
    pub controller: Arc<VoteCastController<Ledger>>,
    pub start_time: std::time::Instant,
}

/// Map a protocol error onto an HTTP response
fn cast_error_response(err: CastError) -> (StatusCode, axum::Json<ErrorResponse>) {
    let (status, code) = match &err {
        CastError::ElectionNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        CastError::ElectionNotActive(_) => (StatusCode::BAD_REQUEST, "ELECTION_NOT_ACTIVE"),
        CastError::AlreadyVoted(_) => (StatusCode::CONFLICT, "ALREADY_VOTED"),
        CastError::NullifierReused => (StatusCode::CONFLICT, "NULLIFIER_REUSED"),
        CastError::ProofInvalid(_) => (StatusCode::BAD_REQUEST, "PROOF_INVALID"),
        CastError::VoterNotEligible => (StatusCode::BAD_REQUEST, "VOTER_NOT_ELIGIBLE"),
        CastError::RosterNotInitialized => (StatusCode::BAD_REQUEST, "ROSTER_NOT_INITIALIZED"),
        CastError::LedgerSubmissionFailed(_) => {
            (StatusCode::BAD_GATEWAY, "LEDGER_SUBMISSION_FAILED")
        }
        CastError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("internal error: {err}");
    }

    (status, axum::Json(ErrorResponse::new(err.to_string(), code)))
}

// ============================================================================
// Health
// ============================================================================

/// Health check endpoint
pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();

    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: uptime,
    })
}

// ============================================================================
// Elections
// ============================================================================

/// Create an election
pub async fn create_election(
    State(state): State<ApiState>,
    Json(req): Json<CreateElectionRequest>,
) -> impl IntoResponse {
    if req.end_time <= req.start_time {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request(
                "end_time must be after start_time",
            )),
        )
            .into_response();
    }

    match state
        .store
        .create_election(&req.title, req.start_time, req.end_time)
    {
        Ok(election) => {
            info!("election created: id={} title={}", election.id, election.title);
            Json(ElectionResponse {
                active: election.is_active_at(Utc::now()),
                id: election.id,
                title: election.title,
                start_time: election.start_time,
                end_time: election.end_time,
                finalized: election.finalized,
                vote_count: 0,
            })
            .into_response()
        }
        Err(e) => {
            error!("failed to create election: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal("failed to create election")),
            )
                .into_response()
        }
    }
}

/// Get election state
pub async fn get_election(
    State(state): State<ApiState>,
    Path(election_id): Path<u64>,
) -> impl IntoResponse {
    let election = match state.store.get_election(election_id) {
        Ok(Some(e)) => e,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::not_found("election not found")),
            )
                .into_response();
        }
        Err(e) => {
            error!("failed to load election: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal("failed to load election")),
            )
                .into_response();
        }
    };

    let vote_count = state.store.count_votes(election_id).unwrap_or(0);

    Json(ElectionResponse {
        active: election.is_active_at(Utc::now()),
        id: election.id,
        title: election.title,
        start_time: election.start_time,
        end_time: election.end_time,
        finalized: election.finalized,
        vote_count,
    })
    .into_response()
}

/// Finalize an election; no further votes are accepted
pub async fn finalize_election(
    State(state): State<ApiState>,
    Path(election_id): Path<u64>,
) -> impl IntoResponse {
    match state.store.finalize_election(election_id) {
        Ok(Some(election)) => {
            info!("election finalized: id={election_id}");
            Json(ElectionResponse {
                active: false,
                id: election.id,
                title: election.title,
                start_time: election.start_time,
                end_time: election.end_time,
                finalized: true,
                vote_count: state.store.count_votes(election_id).unwrap_or(0),
            })
            .into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::not_found("election not found")),
        )
            .into_response(),
        Err(e) => {
            error!("failed to finalize election: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal("failed to finalize election")),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Vote Casting
// ============================================================================

/// Cast a vote in an election
pub async fn cast_vote(
    State(state): State<ApiState>,
    Path(election_id): Path<u64>,
    Json(req): Json<CastVoteRequest>,
) -> impl IntoResponse {
    let nullifier = match Nullifier::from_hex(&req.nullifier) {
        Ok(n) => n,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::bad_request("invalid nullifier format")),
            )
                .into_response();
        }
    };

    let request = CastRequest {
        election_id,
        voter_id: req.voter_id,
        vote_payload: req.vote_payload,
        nullifier,
    };

    match state.controller.cast(request).await {
        Ok(receipt) => Json(CastVoteResponse {
            receipt_id: receipt.receipt_id,
            tx_ref: receipt.tx_ref,
            merkle_root: receipt.merkle_root,
            state: receipt.state,
        })
        .into_response(),
        Err(err) => cast_error_response(err).into_response(),
    }
}

// ============================================================================
// Roster
// ============================================================================

/// Register an eligible voter.
///
/// The cache is invalidated before the response is observable, so no
/// later proof request can be served a tree missing this voter.
pub async fn register_voter(
    State(state): State<ApiState>,
    Json(req): Json<RosterMutationRequest>,
) -> impl IntoResponse {
    let mut registry = state.registry.write().await;

    let seq = match registry.register(&req.voter_id) {
        Ok(seq) => seq,
        Err(RosterError::AlreadyRegistered) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::bad_request("voter is already registered")),
            )
                .into_response();
        }
        Err(RosterError::NotRegistered) => unreachable!("register cannot report NotRegistered"),
    };

    if let Err(e) = state.store.persist_roster_add(seq, &req.voter_id) {
        error!("failed to persist roster entry: {e}");
        let _ = registry.remove(&req.voter_id);
        state.cache.invalidate().await;
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::internal("failed to persist roster entry")),
        )
            .into_response();
    }

    state.cache.invalidate().await;

    info!(
        "voter registered: generation={} total={}",
        registry.generation(),
        registry.len()
    );

    Json(RosterMutationResponse {
        generation: registry.generation(),
        total_voters: registry.len(),
    })
    .into_response()
}

/// Remove a voter from the roster
pub async fn remove_voter(
    State(state): State<ApiState>,
    Json(req): Json<RosterMutationRequest>,
) -> impl IntoResponse {
    let mut registry = state.registry.write().await;

    let seq = match registry.remove(&req.voter_id) {
        Ok(seq) => seq,
        Err(RosterError::NotRegistered) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::bad_request("voter is not registered")),
            )
                .into_response();
        }
        Err(RosterError::AlreadyRegistered) => {
            unreachable!("remove cannot report AlreadyRegistered")
        }
    };

    if let Err(e) = state.store.persist_roster_remove(seq) {
        error!("failed to remove persisted roster entry: {e}");
    }

    state.cache.invalidate().await;

    info!(
        "voter removed: generation={} total={}",
        registry.generation(),
        registry.len()
    );

    Json(RosterMutationResponse {
        generation: registry.generation(),
        total_voters: registry.len(),
    })
    .into_response()
}

/// Current roster root
pub async fn roster_root(State(state): State<ApiState>) -> impl IntoResponse {
    let registry = state.registry.read().await;

    if registry.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request("no registered voters")),
        )
            .into_response();
    }

    match state.cache.get_or_build(&registry).await {
        Ok(tree) => Json(RosterRootResponse {
            merkle_root: hex::encode(tree.root()),
            generation: registry.generation(),
            total_voters: registry.len(),
        })
        .into_response(),
        Err(e) => {
            error!("failed to build roster tree: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal("failed to build roster tree")),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Eligibility
// ============================================================================

/// Membership proof for a voter address against the current roster
pub async fn eligibility_proof(
    State(state): State<ApiState>,
    Json(req): Json<EligibilityProofRequest>,
) -> impl IntoResponse {
    match state.issuer.membership(&req.address).await {
        Ok((root, path)) => Json(EligibilityProofResponse {
            merkle_root: hex::encode(root),
            proof: path.siblings.iter().map(hex::encode).collect(),
            index: path.index,
        })
        .into_response(),
        Err(CastError::VoterNotEligible) => {
            warn!("eligibility proof refused: address not registered");
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::bad_request("address not found in roster")),
            )
                .into_response()
        }
        Err(err) => cast_error_response(err).into_response(),
    }
}
