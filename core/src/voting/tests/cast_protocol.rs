//! End-to-end cast protocol tests against a real store and mock ledger

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::RwLock;

use veilvote_proof::Nullifier;

use crate::config::NullifierScope;
use crate::errors::CastError;
use crate::storage::RocksDbStore;
use crate::voting::controller::{CastRequest, CastState, VoteCastController};
use crate::voting::election::Election;
use crate::voting::issuer::ProofIssuer;
use crate::voting::ledger::MockLedger;
use crate::voting::roster::RosterRegistry;
use crate::voting::tree_cache::TreeCache;

struct TestRig {
    _dir: TempDir,
    store: RocksDbStore,
    registry: Arc<RwLock<RosterRegistry>>,
    cache: Arc<TreeCache>,
    ledger: Arc<MockLedger>,
    controller: VoteCastController<MockLedger>,
}

fn rig(voters: &[&str], scope: NullifierScope) -> TestRig {
    let dir = TempDir::new().unwrap();
    let store = RocksDbStore::open(dir.path()).unwrap();

    let mut registry = RosterRegistry::new();
    for voter in voters {
        registry.register(voter).unwrap();
    }
    let registry = Arc::new(RwLock::new(registry));

    let cache = Arc::new(TreeCache::new(StdDuration::from_secs(3600)));
    let ledger = Arc::new(MockLedger::new());

    let controller = VoteCastController::new(
        store.clone(),
        ProofIssuer::new(registry.clone(), cache.clone()),
        ledger.clone(),
        scope,
    );

    TestRig {
        _dir: dir,
        store,
        registry,
        cache,
        ledger,
        controller,
    }
}

fn active_election(store: &RocksDbStore) -> Election {
    store
        .create_election(
            "city council",
            Utc::now() - Duration::minutes(5),
            Utc::now() + Duration::minutes(5),
        )
        .unwrap()
}

fn nullifier(tag: u8) -> Nullifier {
    Nullifier([tag; 32])
}

fn request(election_id: u64, voter: &str, tag: u8) -> CastRequest {
    CastRequest {
        election_id,
        voter_id: voter.to_string(),
        vote_payload: json!({"candidate": "alice"}),
        nullifier: nullifier(tag),
    }
}

#[tokio::test]
async fn vote_recorded_end_to_end() {
    let rig = rig(&["a", "b", "c"], NullifierScope::Global);
    let election = active_election(&rig.store);

    let receipt = rig
        .controller
        .cast(request(election.id, "b", 1))
        .await
        .unwrap();

    assert_eq!(receipt.state, CastState::Recorded);
    assert_eq!(receipt.tx_ref, "mock_tx_0000");

    let record = rig.store.get_vote(election.id, "b").unwrap().unwrap();
    assert!(record.verified);
    assert_eq!(record.tx_ref, receipt.tx_ref);
    assert_eq!(record.vote_payload, json!({"candidate": "alice"}));
    assert!(record.proof.verify("b"));

    assert_eq!(rig.store.count_votes(election.id).unwrap(), 1);
    assert_eq!(rig.ledger.submitted().len(), 1);
}

#[tokio::test]
async fn second_vote_same_voter_rejected() {
    let rig = rig(&["a", "b"], NullifierScope::Global);
    let election = active_election(&rig.store);

    rig.controller
        .cast(request(election.id, "a", 1))
        .await
        .unwrap();

    // fresh nullifier, same (election, voter)
    let err = rig
        .controller
        .cast(request(election.id, "a", 2))
        .await
        .unwrap_err();

    assert!(matches!(err, CastError::AlreadyVoted(id) if id == election.id));
    assert_eq!(rig.store.count_votes(election.id).unwrap(), 1);
}

#[tokio::test]
async fn nullifier_reuse_rejected_across_voters() {
    let rig = rig(&["a", "b"], NullifierScope::Global);
    let election = active_election(&rig.store);

    rig.controller
        .cast(request(election.id, "a", 7))
        .await
        .unwrap();

    let err = rig
        .controller
        .cast(request(election.id, "b", 7))
        .await
        .unwrap_err();

    assert!(matches!(err, CastError::NullifierReused));
    assert_eq!(rig.store.count_votes(election.id).unwrap(), 1);
}

#[tokio::test]
async fn global_scope_spans_elections() {
    let rig = rig(&["a", "b"], NullifierScope::Global);
    let first = active_election(&rig.store);
    let second = active_election(&rig.store);

    rig.controller.cast(request(first.id, "a", 7)).await.unwrap();

    // same nullifier in a different election, different voter
    let err = rig
        .controller
        .cast(request(second.id, "b", 7))
        .await
        .unwrap_err();

    assert!(matches!(err, CastError::NullifierReused));
}

#[tokio::test]
async fn per_election_scope_allows_cross_election_reuse() {
    let rig = rig(&["a", "b"], NullifierScope::PerElection);
    let first = active_election(&rig.store);
    let second = active_election(&rig.store);

    rig.controller.cast(request(first.id, "a", 7)).await.unwrap();

    // same nullifier is fine in a different election
    rig.controller
        .cast(request(second.id, "b", 7))
        .await
        .unwrap();

    // but still unique within one election
    let err = rig
        .controller
        .cast(request(first.id, "b", 7))
        .await
        .unwrap_err();
    assert!(matches!(err, CastError::NullifierReused));
}

#[tokio::test]
async fn election_window_enforced() {
    let rig = rig(&["a"], NullifierScope::Global);

    let upcoming = rig
        .store
        .create_election(
            "not yet open",
            Utc::now() + Duration::minutes(5),
            Utc::now() + Duration::minutes(10),
        )
        .unwrap();

    let err = rig
        .controller
        .cast(request(upcoming.id, "a", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, CastError::ElectionNotActive(_)));

    let finalized = active_election(&rig.store);
    rig.store.finalize_election(finalized.id).unwrap();

    let err = rig
        .controller
        .cast(request(finalized.id, "a", 2))
        .await
        .unwrap_err();
    assert!(matches!(err, CastError::ElectionNotActive(_)));

    let err = rig
        .controller
        .cast(request(9999, "a", 3))
        .await
        .unwrap_err();
    assert!(matches!(err, CastError::ElectionNotFound(9999)));
}

#[tokio::test]
async fn ledger_failure_persists_nothing() {
    let rig = rig(&["a"], NullifierScope::Global);
    let election = active_election(&rig.store);

    rig.ledger.set_fail_submission(true);

    let err = rig
        .controller
        .cast(request(election.id, "a", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, CastError::LedgerSubmissionFailed(_)));

    // no vote record, no consumed nullifier
    assert!(!rig.store.has_voted(election.id, "a").unwrap());
    let key = rig
        .store
        .nullifier_key(NullifierScope::Global, election.id, &nullifier(1));
    assert!(!rig.store.nullifier_exists(&key).unwrap());

    // the whole attempt is retryable once the ledger recovers
    rig.ledger.set_fail_submission(false);
    let receipt = rig
        .controller
        .cast(request(election.id, "a", 1))
        .await
        .unwrap();
    assert_eq!(receipt.state, CastState::Recorded);
}

#[tokio::test]
async fn ledger_membership_rejection_blocks_vote() {
    let rig = rig(&["a"], NullifierScope::Global);
    let election = active_election(&rig.store);

    rig.ledger.set_reject_membership(true);

    let err = rig
        .controller
        .cast(request(election.id, "a", 1))
        .await
        .unwrap_err();

    assert!(matches!(err, CastError::LedgerSubmissionFailed(_)));
    assert!(!rig.store.has_voted(election.id, "a").unwrap());
}

#[tokio::test]
async fn stale_proof_fails_after_roster_mutation() {
    let rig = rig(&["a", "b", "c", "d"], NullifierScope::Global);
    let payload = json!({"candidate": "alice"});

    let issuer = ProofIssuer::new(rig.registry.clone(), rig.cache.clone());
    let old_proof = issuer.issue("a", &payload).await.unwrap();
    assert!(old_proof.verify("a"));

    // roster mutation: register voter e, invalidate synchronously
    {
        let mut registry = rig.registry.write().await;
        registry.register("e").unwrap();
    }
    rig.cache.invalidate().await;

    let registry = rig.registry.read().await;
    let new_tree = rig.cache.get_or_build(&registry).await.unwrap();
    drop(registry);

    // the old proof must not verify against the new root
    assert_ne!(old_proof.root, new_tree.root());
    assert!(
        !old_proof
            .merkle_path()
            .verify(old_proof.commitment.as_bytes(), &new_tree.root())
    );

    // a re-derived proof does
    let fresh = issuer.issue("a", &payload).await.unwrap();
    assert_eq!(fresh.root, new_tree.root());
    assert!(fresh.verify("a"));
}

#[tokio::test]
async fn ineligible_and_uninitialized_rosters_rejected() {
    let populated = rig(&["a"], NullifierScope::Global);
    let election = active_election(&populated.store);

    let err = populated
        .controller
        .cast(request(election.id, "stranger", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, CastError::VoterNotEligible));

    let empty = rig(&[], NullifierScope::Global);
    let election = active_election(&empty.store);

    let err = empty
        .controller
        .cast(request(election.id, "a", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, CastError::RosterNotInitialized));
}
