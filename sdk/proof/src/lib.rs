//! Veilvote Proof SDK
//!
//! Hash-based membership primitives for anonymous vote casting.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Vote Proof                               │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐ │
//! │  │  Commitment  │  │ Sibling Path │  │  Payload Signature    │ │
//! │  │  (identity)  │  │  (inclusion) │  │  (tamper evidence)    │ │
//! │  └──────────────┘  └──────────────┘  └───────────────────────┘ │
//! │         │                 │                     │               │
//! │         ▼                 ▼                     ▼               │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │            Verification (total, never panics)            │   │
//! │  │  • Sibling path reconstructs the roster root             │   │
//! │  │  • Signature matches (voter_id, payload) recomputation   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This is a simplified membership + signature scheme (Merkle inclusion
//! plus hash-based binding), not a succinct zero-knowledge proof system.

pub mod commitment;
pub mod merkle;
pub mod nullifier;
pub mod proof;

pub use commitment::Commitment;
pub use merkle::{MerkleError, MerkleProof, MerkleTree, hash_leaf, hash_pair};
pub use nullifier::Nullifier;
pub use proof::{ProofRejection, VoteProof, sign_payload};
