//! Election and vote record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use veilvote_proof::{Nullifier, VoteProof};

/// An election with a fixed voting window.
///
/// Tallying, results and dispute handling live outside this service;
/// only the window and the finalized flag gate vote casting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Election {
    pub id: u64,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub finalized: bool,
}

impl Election {
    /// Whether votes are accepted at the given instant
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.finalized && now >= self.start_time && now < self.end_time
    }
}

/// A durably recorded vote.
///
/// Created only after every protocol step succeeded; immutable
/// thereafter. Uniquely keyed by (election, voter) and separately
/// constrained by nullifier uniqueness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRecord {
    pub election_id: u64,
    pub voter_id: String,
    pub vote_payload: Value,
    pub proof: VoteProof,
    pub nullifier: Nullifier,
    /// Transaction reference returned by the external ledger
    pub tx_ref: String,
    pub verified: bool,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn election(start_offset_mins: i64, end_offset_mins: i64, finalized: bool) -> Election {
        let now = Utc::now();
        Election {
            id: 1,
            title: "test".to_string(),
            start_time: now + Duration::minutes(start_offset_mins),
            end_time: now + Duration::minutes(end_offset_mins),
            finalized,
        }
    }

    #[test]
    fn active_within_window() {
        assert!(election(-5, 5, false).is_active_at(Utc::now()));
    }

    #[test]
    fn inactive_before_start() {
        assert!(!election(5, 10, false).is_active_at(Utc::now()));
    }

    #[test]
    fn inactive_after_end() {
        assert!(!election(-10, -5, false).is_active_at(Utc::now()));
    }

    #[test]
    fn inactive_when_finalized() {
        assert!(!election(-5, 5, true).is_active_at(Utc::now()));
    }
}
