//! Durable vote store
//!
//! RocksDB-backed persistence for elections, vote records, nullifiers
//! and the voter roster. The store provides the atomic insert-if-absent
//! semantics the protocol depends on: a vote and its nullifier are
//! checked and written together under a single write lock, so of two
//! racing attempts exactly one commits and the other surfaces a typed
//! conflict.

use anyhow::{Context, Result};
use rocksdb::{ColumnFamilyDescriptor, DB, Options, WriteBatch};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use veilvote_proof::Nullifier;

use crate::config::NullifierScope;
use crate::voting::election::{Election, VoteRecord};

const CF_VOTES: &str = "votes";
const CF_NULLIFIERS: &str = "nullifiers";
const CF_ELECTIONS: &str = "elections";
const CF_ROSTER: &str = "roster";

/// Conflicts and faults surfaced by the store
#[derive(Error, Debug)]
pub enum StoreError {
    /// A vote for this (election, voter) key already exists
    #[error("vote already recorded for election {election_id}")]
    DuplicateVote { election_id: u64 },

    /// The nullifier key already exists
    #[error("nullifier already recorded")]
    DuplicateNullifier,

    #[error(transparent)]
    Db(#[from] anyhow::Error),
}

/// A thread-safe wrapper around RocksDB.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    /// Serializes check-then-write sections (vote insert, id allocation)
    write_lock: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens the database at the specified path, creating it if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = vec![
            ColumnFamilyDescriptor::new(CF_VOTES, Options::default()),
            ColumnFamilyDescriptor::new(CF_NULLIFIERS, Options::default()),
            ColumnFamilyDescriptor::new(CF_ELECTIONS, Options::default()),
            ColumnFamilyDescriptor::new(CF_ROSTER, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, families)
            .map_err(|e| anyhow::anyhow!("Failed to open RocksDB: {}", e))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn vote_key(election_id: u64, voter_id: &str) -> Vec<u8> {
        let mut key = election_id.to_be_bytes().to_vec();
        key.extend_from_slice(voter_id.as_bytes());
        key
    }

    /// Nullifier storage key under the configured uniqueness scope
    pub fn nullifier_key(
        &self,
        scope: NullifierScope,
        election_id: u64,
        nullifier: &Nullifier,
    ) -> Vec<u8> {
        match scope {
            NullifierScope::Global => nullifier.as_bytes().to_vec(),
            NullifierScope::PerElection => {
                let mut key = election_id.to_be_bytes().to_vec();
                key.extend_from_slice(nullifier.as_bytes());
                key
            }
        }
    }

    // =========================================================================
    // Votes & Nullifiers
    // =========================================================================

    /// Check if a nullifier key has already been recorded
    pub fn nullifier_exists(&self, key: &[u8]) -> Result<bool> {
        let cf = self
            .db
            .cf_handle(CF_NULLIFIERS)
            .context("nullifiers CF missing")?;

        Ok(self.db.get_cf(cf, key)?.is_some())
    }

    /// Check if a vote exists for (election, voter)
    pub fn has_voted(&self, election_id: u64, voter_id: &str) -> Result<bool> {
        let cf = self.db.cf_handle(CF_VOTES).context("votes CF missing")?;

        Ok(self
            .db
            .get_cf(cf, Self::vote_key(election_id, voter_id))?
            .is_some())
    }

    /// Get a recorded vote
    pub fn get_vote(&self, election_id: u64, voter_id: &str) -> Result<Option<VoteRecord>> {
        let cf = self.db.cf_handle(CF_VOTES).context("votes CF missing")?;

        match self.db.get_cf(cf, Self::vote_key(election_id, voter_id))? {
            Some(bytes) => {
                let record = serde_json::from_slice(&bytes).context("corrupt vote record")?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Number of votes recorded for an election
    pub fn count_votes(&self, election_id: u64) -> Result<u64> {
        let cf = self.db.cf_handle(CF_VOTES).context("votes CF missing")?;

        let prefix = election_id.to_be_bytes();
        let mut count = 0u64;

        for item in self.db.prefix_iterator_cf(cf, prefix) {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            count += 1;
        }

        Ok(count)
    }

    /// Atomically record a vote and consume its nullifier.
    ///
    /// Both existence checks and both writes happen under one write
    /// lock; of two racing attempts the second surfaces a typed
    /// conflict and writes nothing.
    pub fn record_vote(
        &self,
        record: &VoteRecord,
        nullifier_key: &[u8],
    ) -> Result<(), StoreError> {
        let votes_cf = self
            .db
            .cf_handle(CF_VOTES)
            .context("votes CF missing")
            .map_err(StoreError::Db)?;
        let nullifiers_cf = self
            .db
            .cf_handle(CF_NULLIFIERS)
            .context("nullifiers CF missing")
            .map_err(StoreError::Db)?;

        let vote_key = Self::vote_key(record.election_id, &record.voter_id);
        let value = serde_json::to_vec(record)
            .context("vote record serialization")
            .map_err(StoreError::Db)?;

        let _guard = self.write_lock.lock().expect("store write lock");

        if self
            .db
            .get_cf(votes_cf, &vote_key)
            .map_err(|e| StoreError::Db(e.into()))?
            .is_some()
        {
            return Err(StoreError::DuplicateVote {
                election_id: record.election_id,
            });
        }

        if self
            .db
            .get_cf(nullifiers_cf, nullifier_key)
            .map_err(|e| StoreError::Db(e.into()))?
            .is_some()
        {
            return Err(StoreError::DuplicateNullifier);
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(votes_cf, &vote_key, &value);
        batch.put_cf(nullifiers_cf, nullifier_key, []);

        self.db.write(batch).map_err(|e| StoreError::Db(e.into()))?;
        Ok(())
    }

    // =========================================================================
    // Elections
    // =========================================================================

    /// Create an election with the next available id
    pub fn create_election(
        &self,
        title: &str,
        start_time: chrono::DateTime<chrono::Utc>,
        end_time: chrono::DateTime<chrono::Utc>,
    ) -> Result<Election> {
        let cf = self
            .db
            .cf_handle(CF_ELECTIONS)
            .context("elections CF missing")?;

        let _guard = self.write_lock.lock().expect("store write lock");

        let mut iter = self.db.iterator_cf(cf, rocksdb::IteratorMode::End);
        let next_id = match iter.next() {
            Some(item) => {
                let (key, _) = item?;
                let id = u64::from_be_bytes(
                    key.as_ref()
                        .try_into()
                        .context("invalid election key length")?,
                );
                id + 1
            }
            None => 1,
        };

        let election = Election {
            id: next_id,
            title: title.to_string(),
            start_time,
            end_time,
            finalized: false,
        };

        let value = serde_json::to_vec(&election).context("election serialization")?;
        self.db.put_cf(cf, next_id.to_be_bytes(), value)?;

        Ok(election)
    }

    pub fn get_election(&self, election_id: u64) -> Result<Option<Election>> {
        let cf = self
            .db
            .cf_handle(CF_ELECTIONS)
            .context("elections CF missing")?;

        match self.db.get_cf(cf, election_id.to_be_bytes())? {
            Some(bytes) => {
                let election = serde_json::from_slice(&bytes).context("corrupt election")?;
                Ok(Some(election))
            }
            None => Ok(None),
        }
    }

    /// Mark an election finalized; no votes are accepted afterwards
    pub fn finalize_election(&self, election_id: u64) -> Result<Option<Election>> {
        let cf = self
            .db
            .cf_handle(CF_ELECTIONS)
            .context("elections CF missing")?;

        let _guard = self.write_lock.lock().expect("store write lock");

        let Some(bytes) = self.db.get_cf(cf, election_id.to_be_bytes())? else {
            return Ok(None);
        };

        let mut election: Election =
            serde_json::from_slice(&bytes).context("corrupt election")?;
        election.finalized = true;

        let value = serde_json::to_vec(&election).context("election serialization")?;
        self.db.put_cf(cf, election_id.to_be_bytes(), value)?;

        Ok(Some(election))
    }

    // =========================================================================
    // Roster persistence
    // =========================================================================

    /// Persist a roster entry under its monotonic seq
    pub fn persist_roster_add(&self, seq: u64, voter_id: &str) -> Result<()> {
        let cf = self.db.cf_handle(CF_ROSTER).context("roster CF missing")?;

        self.db
            .put_cf(cf, seq.to_be_bytes(), voter_id.as_bytes())?;
        Ok(())
    }

    /// Remove a persisted roster entry
    pub fn persist_roster_remove(&self, seq: u64) -> Result<()> {
        let cf = self.db.cf_handle(CF_ROSTER).context("roster CF missing")?;

        self.db.delete_cf(cf, seq.to_be_bytes())?;
        Ok(())
    }

    /// Load all roster entries in insertion (seq) order, for registry
    /// reconstruction on startup
    pub fn load_roster(&self) -> Result<Vec<(u64, String)>> {
        let cf = self.db.cf_handle(CF_ROSTER).context("roster CF missing")?;

        let mut entries = Vec::new();
        let iter = self.db.iterator_cf(cf, rocksdb::IteratorMode::Start);

        for item in iter {
            let (key, value) = item?;
            let seq = u64::from_be_bytes(
                key.as_ref()
                    .try_into()
                    .context("invalid roster key length")?,
            );
            let voter_id =
                String::from_utf8(value.to_vec()).context("invalid roster entry encoding")?;
            entries.push((seq, voter_id));
        }

        Ok(entries)
    }
}
