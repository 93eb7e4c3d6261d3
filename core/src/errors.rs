//! Protocol error types
//!
//! Every failure mode of the vote-casting protocol. Protocol rejections
//! are reported to the caller and never retried automatically; a ledger
//! failure leaves no durable state, so the caller may retry the whole
//! attempt.

use thiserror::Error;

/// Errors surfaced by the vote-casting protocol
#[derive(Error, Debug)]
pub enum CastError {
    /// No voter has ever been registered, so no roster tree exists
    #[error("voter roster has not been initialized")]
    RosterNotInitialized,

    /// The voter is not in the eligibility roster
    #[error("voter is not in the eligibility roster")]
    VoterNotEligible,

    /// The referenced election does not exist
    #[error("election {0} not found")]
    ElectionNotFound(u64),

    /// The election is outside its voting window or already finalized
    #[error("election {0} is not currently active")]
    ElectionNotActive(u64),

    /// A vote for this (election, voter) pair already exists
    #[error("voter has already cast a vote in election {0}")]
    AlreadyVoted(u64),

    /// The nullifier was already recorded within its uniqueness scope
    #[error("nullifier has already been used")]
    NullifierReused,

    /// The membership proof failed verification
    #[error("membership proof rejected: {0}")]
    ProofInvalid(String),

    /// The external ledger refused or failed the submission; nothing
    /// was persisted on this path
    #[error("ledger submission failed: {0}")]
    LedgerSubmissionFailed(String),

    /// Storage or other infrastructure fault
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
