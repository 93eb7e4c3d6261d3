//! API Types
//!
//! Request/response types for the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::voting::CastState;

// ============================================================================
// Elections
// ============================================================================

/// Request to create an election
#[derive(Debug, Deserialize)]
pub struct CreateElectionRequest {
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Election state as exposed to callers
#[derive(Debug, Serialize)]
pub struct ElectionResponse {
    pub id: u64,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub finalized: bool,
    pub active: bool,
    pub vote_count: u64,
}

// ============================================================================
// Vote Casting
// ============================================================================

/// Request to cast a vote
#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub voter_id: String,
    pub vote_payload: Value,
    /// Single-use nullifier, 64 hex chars
    pub nullifier: String,
}

/// Response after a recorded vote
#[derive(Debug, Serialize)]
pub struct CastVoteResponse {
    pub receipt_id: String,
    pub tx_ref: String,
    pub merkle_root: String,
    pub state: CastState,
}

// ============================================================================
// Roster
// ============================================================================

/// Request to register or remove a voter
#[derive(Debug, Deserialize)]
pub struct RosterMutationRequest {
    pub voter_id: String,
}

/// Response after a roster mutation
#[derive(Debug, Serialize)]
pub struct RosterMutationResponse {
    pub generation: u64,
    pub total_voters: usize,
}

/// Current roster root
#[derive(Debug, Serialize)]
pub struct RosterRootResponse {
    pub merkle_root: String,
    pub generation: u64,
    pub total_voters: usize,
}

// ============================================================================
// Eligibility
// ============================================================================

/// Request for a membership proof
#[derive(Debug, Deserialize)]
pub struct EligibilityProofRequest {
    pub address: String,
}

/// Membership proof for the current roster snapshot
#[derive(Debug, Serialize)]
pub struct EligibilityProofResponse {
    pub merkle_root: String,
    /// Sibling digests, leaf to root, hex encoded
    pub proof: Vec<String>,
    pub index: u64,
}

// ============================================================================
// Health
// ============================================================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
    pub uptime_secs: u64,
}

// ============================================================================
// Error Response
// ============================================================================

/// Standard error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(msg, "BAD_REQUEST")
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(msg, "INTERNAL_ERROR")
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(msg, "NOT_FOUND")
    }
}
