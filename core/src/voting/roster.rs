//! Voter Roster Registry
//!
//! Maintains the ordered set of eligible voter commitments. The order is
//! insertion order and stays stable within a roster generation, since
//! proof indices are positional. Every successful add or remove bumps
//! the generation counter consumed by the tree cache.

use std::collections::HashMap;

use thiserror::Error;
use veilvote_proof::Commitment;

/// Roster mutation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RosterError {
    #[error("voter is already registered")]
    AlreadyRegistered,

    #[error("voter is not registered")]
    NotRegistered,
}

#[derive(Debug, Clone)]
struct RosterEntry {
    /// Persistence key, monotonic across the roster's lifetime
    seq: u64,
    voter_id: String,
    commitment: Commitment,
}

/// Ordered eligible-voter registry.
///
/// Source of truth for roster tree construction. Positions shift on
/// removal, which is why proofs are always re-derived from the current
/// tree rather than stored.
#[derive(Debug, Default)]
pub struct RosterRegistry {
    entries: Vec<RosterEntry>,
    positions: HashMap<String, usize>,
    generation: u64,
    next_seq: u64,
}

impl RosterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from persisted (seq, voter_id) pairs, in
    /// ascending seq order. Does not bump the generation.
    pub fn restore(persisted: Vec<(u64, String)>) -> Self {
        let mut registry = Self::new();

        for (seq, voter_id) in persisted {
            let position = registry.entries.len();
            registry.positions.insert(voter_id.clone(), position);
            registry.entries.push(RosterEntry {
                seq,
                commitment: Commitment::derive(&voter_id),
                voter_id,
            });
            registry.next_seq = registry.next_seq.max(seq + 1);
        }

        registry
    }

    /// Register a voter. Returns the persistence seq for the new entry.
    pub fn register(&mut self, voter_id: &str) -> Result<u64, RosterError> {
        if self.positions.contains_key(voter_id) {
            return Err(RosterError::AlreadyRegistered);
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        let position = self.entries.len();
        self.positions.insert(voter_id.to_string(), position);
        self.entries.push(RosterEntry {
            seq,
            voter_id: voter_id.to_string(),
            commitment: Commitment::derive(voter_id),
        });

        self.generation += 1;
        Ok(seq)
    }

    /// Remove a voter. Returns the persistence seq of the removed entry.
    pub fn remove(&mut self, voter_id: &str) -> Result<u64, RosterError> {
        let position = self
            .positions
            .remove(voter_id)
            .ok_or(RosterError::NotRegistered)?;

        let removed = self.entries.remove(position);

        // later entries shifted down one position
        for (offset, entry) in self.entries[position..].iter().enumerate() {
            self.positions
                .insert(entry.voter_id.clone(), position + offset);
        }

        self.generation += 1;
        Ok(removed.seq)
    }

    /// Ordered commitments for tree construction
    pub fn snapshot(&self) -> Vec<Commitment> {
        self.entries.iter().map(|e| e.commitment).collect()
    }

    /// Positional index of a voter in the current snapshot
    pub fn position(&self, voter_id: &str) -> Option<usize> {
        self.positions.get(voter_id).copied()
    }

    /// The voter's commitment, if registered
    pub fn commitment(&self, voter_id: &str) -> Option<Commitment> {
        self.positions
            .get(voter_id)
            .map(|&p| self.entries[p].commitment)
    }

    pub fn contains(&self, voter_id: &str) -> bool {
        self.positions.contains_key(voter_id)
    }

    /// Generation counter; bumped by every successful mutation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
