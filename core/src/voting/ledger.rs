//! External Ledger Client
//!
//! The ledger is the opaque system of record that finally accepts and
//! executes a vote. This module defines the contract the controller
//! consumes, an HTTP implementation for a real ledger endpoint, and an
//! in-process mock for tests and dev mode.
//!
//! The contract the controller relies on: a failed `submit_vote` must
//! not have mutated ledger state, so the whole cast attempt can be
//! retried.

use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reference to the transaction the ledger executed
pub type TxRef = String;

/// Proof material shipped alongside a vote submission
#[derive(Debug, Clone, Serialize)]
pub struct ProofContext {
    /// Roster root the proof was derived against (hex)
    pub merkle_root: String,
    /// The voter's commitment acting as the anonymous signal (hex)
    pub signal: String,
    /// Single-use nullifier for this attempt (hex)
    pub nullifier: String,
}

/// Contract the vote-cast controller consumes.
///
/// Futures are `Send` so cast attempts can run on the multi-threaded
/// runtime.
pub trait LedgerClient: Send + Sync {
    /// Ask the ledger to confirm the membership proof
    fn verify_membership(
        &self,
        root: &[u8; 32],
        signal: &[u8; 32],
        nullifier: &[u8; 32],
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Submit the vote for execution; errors mean the ledger state is
    /// unchanged
    fn submit_vote(
        &self,
        election_id: u64,
        vote_payload: &Value,
        proof_context: &ProofContext,
    ) -> impl Future<Output = Result<TxRef>> + Send;
}

// ============================================================================
// HTTP Ledger
// ============================================================================

#[derive(Debug, Serialize)]
struct VerifyMembershipRequest<'a> {
    merkle_root: &'a str,
    signal: &'a str,
    nullifier: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifyMembershipResponse {
    valid: bool,
}

#[derive(Debug, Serialize)]
struct SubmitVoteRequest<'a> {
    election_id: u64,
    vote_payload: &'a Value,
    proof_context: &'a ProofContext,
}

#[derive(Debug, Deserialize)]
struct SubmitVoteResponse {
    tx_ref: String,
    accepted: bool,
}

/// JSON-over-HTTP ledger client
pub struct HttpLedger {
    base_url: String,
    client: reqwest::Client,
}

impl HttpLedger {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build ledger HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

impl LedgerClient for HttpLedger {
    async fn verify_membership(
        &self,
        root: &[u8; 32],
        signal: &[u8; 32],
        nullifier: &[u8; 32],
    ) -> Result<bool> {
        let request = VerifyMembershipRequest {
            merkle_root: &hex::encode(root),
            signal: &hex::encode(signal),
            nullifier: &hex::encode(nullifier),
        };

        let response: VerifyMembershipResponse = self
            .client
            .post(format!("{}/membership/verify", self.base_url))
            .json(&request)
            .send()
            .await
            .context("ledger verify_membership request failed")?
            .error_for_status()
            .context("ledger verify_membership rejected")?
            .json()
            .await
            .context("ledger verify_membership returned malformed body")?;

        Ok(response.valid)
    }

    async fn submit_vote(
        &self,
        election_id: u64,
        vote_payload: &Value,
        proof_context: &ProofContext,
    ) -> Result<TxRef> {
        let request = SubmitVoteRequest {
            election_id,
            vote_payload,
            proof_context,
        };

        let response: SubmitVoteResponse = self
            .client
            .post(format!("{}/votes", self.base_url))
            .json(&request)
            .send()
            .await
            .context("ledger submit_vote request failed")?
            .error_for_status()
            .context("ledger submit_vote rejected")?
            .json()
            .await
            .context("ledger submit_vote returned malformed body")?;

        if !response.accepted {
            bail!("ledger refused the vote");
        }

        Ok(response.tx_ref)
    }
}

// ============================================================================
// Mock Ledger
// ============================================================================

/// In-process ledger for tests and dev mode
#[derive(Default)]
pub struct MockLedger {
    reject_membership: AtomicBool,
    fail_submission: AtomicBool,
    counter: AtomicU64,
    submitted: Mutex<Vec<(u64, TxRef)>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent membership checks fail
    pub fn set_reject_membership(&self, reject: bool) {
        self.reject_membership.store(reject, Ordering::SeqCst);
    }

    /// Make subsequent submissions fail
    pub fn set_fail_submission(&self, fail: bool) {
        self.fail_submission.store(fail, Ordering::SeqCst);
    }

    /// Submissions the mock has executed
    pub fn submitted(&self) -> Vec<(u64, TxRef)> {
        self.submitted.lock().expect("mock ledger lock").clone()
    }
}

impl LedgerClient for MockLedger {
    async fn verify_membership(
        &self,
        _root: &[u8; 32],
        _signal: &[u8; 32],
        _nullifier: &[u8; 32],
    ) -> Result<bool> {
        Ok(!self.reject_membership.load(Ordering::SeqCst))
    }

    async fn submit_vote(
        &self,
        election_id: u64,
        _vote_payload: &Value,
        _proof_context: &ProofContext,
    ) -> Result<TxRef> {
        if self.fail_submission.load(Ordering::SeqCst) {
            bail!("mock ledger submission failure");
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let tx_ref = format!("mock_tx_{n:04}");

        self.submitted
            .lock()
            .expect("mock ledger lock")
            .push((election_id, tx_ref.clone()));

        Ok(tx_ref)
    }
}

/// Configured ledger backend, dispatched by config
pub enum Ledger {
    Http(HttpLedger),
    Mock(MockLedger),
}

impl LedgerClient for Ledger {
    async fn verify_membership(
        &self,
        root: &[u8; 32],
        signal: &[u8; 32],
        nullifier: &[u8; 32],
    ) -> Result<bool> {
        match self {
            Ledger::Http(l) => l.verify_membership(root, signal, nullifier).await,
            Ledger::Mock(l) => l.verify_membership(root, signal, nullifier).await,
        }
    }

    async fn submit_vote(
        &self,
        election_id: u64,
        vote_payload: &Value,
        proof_context: &ProofContext,
    ) -> Result<TxRef> {
        match self {
            Ledger::Http(l) => l.submit_vote(election_id, vote_payload, proof_context).await,
            Ledger::Mock(l) => l.submit_vote(election_id, vote_payload, proof_context).await,
        }
    }
}
