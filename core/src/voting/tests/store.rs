//! Durable store tests: uniqueness conflicts, scoping, restart behavior

use chrono::{Duration, Utc};
use serde_json::json;
use tempfile::TempDir;

use veilvote_proof::{Commitment, Nullifier, VoteProof, sign_payload};

use crate::config::NullifierScope;
use crate::storage::{RocksDbStore, StoreError};
use crate::voting::election::VoteRecord;

/// Create a temporary DB for each test
fn temp_db() -> (TempDir, RocksDbStore) {
    let dir = TempDir::new().unwrap();
    let store = RocksDbStore::open(dir.path()).unwrap();
    (dir, store)
}

fn record(election_id: u64, voter_id: &str, tag: u8) -> VoteRecord {
    let payload = json!({"candidate": "alice"});

    VoteRecord {
        election_id,
        voter_id: voter_id.to_string(),
        proof: VoteProof {
            root: [0u8; 32],
            siblings: vec![],
            index: 0,
            commitment: Commitment::derive(voter_id),
            signature: sign_payload(voter_id, &payload),
            vote_payload: payload.clone(),
        },
        vote_payload: payload,
        nullifier: Nullifier([tag; 32]),
        tx_ref: "0xabc".to_string(),
        verified: true,
        recorded_at: Utc::now(),
    }
}

#[test]
fn record_vote_roundtrip() {
    let (_dir, store) = temp_db();
    let record = record(1, "a", 1);
    let key = store.nullifier_key(NullifierScope::Global, 1, &record.nullifier);

    store.record_vote(&record, &key).unwrap();

    let loaded = store.get_vote(1, "a").unwrap().unwrap();
    assert_eq!(loaded.voter_id, "a");
    assert_eq!(loaded.vote_payload, record.vote_payload);
    assert_eq!(loaded.nullifier, record.nullifier);
    assert!(loaded.verified);

    assert!(store.has_voted(1, "a").unwrap());
    assert!(store.nullifier_exists(&key).unwrap());
}

#[test]
fn duplicate_vote_key_conflicts() {
    let (_dir, store) = temp_db();
    let first = record(1, "a", 1);
    let key = store.nullifier_key(NullifierScope::Global, 1, &first.nullifier);
    store.record_vote(&first, &key).unwrap();

    // same (election, voter), fresh nullifier
    let second = record(1, "a", 2);
    let key2 = store.nullifier_key(NullifierScope::Global, 1, &second.nullifier);

    let err = store.record_vote(&second, &key2).unwrap_err();
    assert!(matches!(err, StoreError::DuplicateVote { election_id: 1 }));

    // the losing attempt wrote nothing
    assert!(!store.nullifier_exists(&key2).unwrap());
}

#[test]
fn duplicate_nullifier_conflicts() {
    let (_dir, store) = temp_db();
    let first = record(1, "a", 7);
    let key = store.nullifier_key(NullifierScope::Global, 1, &first.nullifier);
    store.record_vote(&first, &key).unwrap();

    // different voter, same nullifier
    let second = record(1, "b", 7);
    let err = store.record_vote(&second, &key).unwrap_err();

    assert!(matches!(err, StoreError::DuplicateNullifier));
    assert!(!store.has_voted(1, "b").unwrap());
    assert_eq!(store.count_votes(1).unwrap(), 1);
}

#[test]
fn nullifier_key_scoping() {
    let (_dir, store) = temp_db();
    let nullifier = Nullifier([9u8; 32]);

    let global_a = store.nullifier_key(NullifierScope::Global, 1, &nullifier);
    let global_b = store.nullifier_key(NullifierScope::Global, 2, &nullifier);
    assert_eq!(global_a, global_b, "global scope ignores the election");

    let scoped_a = store.nullifier_key(NullifierScope::PerElection, 1, &nullifier);
    let scoped_b = store.nullifier_key(NullifierScope::PerElection, 2, &nullifier);
    assert_ne!(scoped_a, scoped_b, "per-election scope separates elections");
}

#[test]
fn election_ids_are_sequential() {
    let (_dir, store) = temp_db();
    let start = Utc::now();
    let end = start + Duration::hours(1);

    let first = store.create_election("one", start, end).unwrap();
    let second = store.create_election("two", start, end).unwrap();

    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);

    let loaded = store.get_election(2).unwrap().unwrap();
    assert_eq!(loaded.title, "two");
    assert!(store.get_election(3).unwrap().is_none());
}

#[test]
fn finalize_persists() {
    let (_dir, store) = temp_db();
    let start = Utc::now();
    let election = store
        .create_election("one", start, start + Duration::hours(1))
        .unwrap();

    let finalized = store.finalize_election(election.id).unwrap().unwrap();
    assert!(finalized.finalized);

    let loaded = store.get_election(election.id).unwrap().unwrap();
    assert!(loaded.finalized);

    assert!(store.finalize_election(999).unwrap().is_none());
}

#[test]
fn roster_persistence_survives_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let store = RocksDbStore::open(dir.path()).unwrap();
        store.persist_roster_add(0, "a").unwrap();
        store.persist_roster_add(1, "b").unwrap();
        store.persist_roster_add(2, "c").unwrap();
        store.persist_roster_remove(1).unwrap();
    }

    let store = RocksDbStore::open(dir.path()).unwrap();
    let entries = store.load_roster().unwrap();

    assert_eq!(
        entries,
        vec![(0, "a".to_string()), (2, "c".to_string())],
        "entries load in seq order with removals applied"
    );
}

#[test]
fn count_votes_is_per_election() {
    let (_dir, store) = temp_db();

    for (election, voter, tag) in [(1u64, "a", 1u8), (1, "b", 2), (2, "a", 3)] {
        let record = record(election, voter, tag);
        let key = store.nullifier_key(NullifierScope::Global, election, &record.nullifier);
        store.record_vote(&record, &key).unwrap();
    }

    assert_eq!(store.count_votes(1).unwrap(), 2);
    assert_eq!(store.count_votes(2).unwrap(), 1);
    assert_eq!(store.count_votes(3).unwrap(), 0);
}
