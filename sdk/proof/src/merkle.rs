//! Roster Merkle Tree
//!
//! Implements a dense binary hash tree over an ordered sequence of voter
//! commitments. Used for proving roster membership without revealing which
//! voter.
//!
//! ```text
//!                    Root
//!                   /    \
//!                 H01    H23
//!                /  \   /   \
//!               H0  H1 H2   H3
//!               |   |   |    |
//!              C0  C1  C2   C3  (Voter Commitments)
//! ```
//!
//! Levels are built by pairing adjacent nodes left-to-right; a lone
//! trailing node at any level is paired with a duplicate of itself. The
//! same rule applies during proof derivation, so every leaf's proof
//! reconstructs the root.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from malformed tree usage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MerkleError {
    /// A tree cannot be built from zero leaves
    #[error("cannot build a merkle tree from zero leaves")]
    EmptyInput,

    /// Proof requested for a position past the leaf level
    #[error("leaf index {index} out of range for {leaf_count} leaves")]
    IndexOutOfRange { index: usize, leaf_count: usize },
}

/// Hash a raw leaf value into its leaf digest
pub fn hash_leaf(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash two children to get their parent
pub fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// A Merkle path proving inclusion of a leaf
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Sibling hashes from leaf level to root, one per level
    pub siblings: Vec<[u8; 32]>,
    /// The leaf position
    pub index: u64,
}

impl MerkleProof {
    /// Compute the root implied by this path for the given leaf digest.
    ///
    /// At each level the current node's parity decides concatenation
    /// order, matching construction: a left child hashes as
    /// `H(current || sibling)`, a right child as `H(sibling || current)`.
    pub fn compute_root(&self, leaf: &[u8; 32]) -> [u8; 32] {
        let mut current = *leaf;
        let mut index = self.index;

        for sibling in &self.siblings {
            let is_right = index & 1 == 1;

            current = if is_right {
                hash_pair(sibling, &current)
            } else {
                hash_pair(&current, sibling)
            };

            index /= 2;
        }

        current
    }

    /// Verify that this path proves inclusion of `leaf` in `root`
    pub fn verify(&self, leaf: &[u8; 32], root: &[u8; 32]) -> bool {
        &self.compute_root(leaf) == root
    }
}

/// Dense Merkle tree over an ordered sequence of commitments.
///
/// The root is a pure function of the ordered leaf sequence; any value
/// change or reordering anywhere changes the root.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// levels[0] = leaf digests, last level = [root]
    levels: Vec<Vec<[u8; 32]>>,
}

impl MerkleTree {
    /// Build a tree from raw leaf values, hashing each into its digest
    pub fn build<L: AsRef<[u8]>>(leaves: &[L]) -> Result<Self, MerkleError> {
        let digests = leaves.iter().map(|l| hash_leaf(l.as_ref())).collect();
        Self::from_leaf_digests(digests)
    }

    /// Build a tree from pre-hashed leaf digests (e.g. voter commitments)
    pub fn from_leaf_digests(digests: Vec<[u8; 32]>) -> Result<Self, MerkleError> {
        if digests.is_empty() {
            return Err(MerkleError::EmptyInput);
        }

        let mut levels = vec![digests];

        while levels[levels.len() - 1].len() > 1 {
            let prev = &levels[levels.len() - 1];
            let mut next = Vec::with_capacity(prev.len().div_ceil(2));

            for pair in prev.chunks(2) {
                // lone trailing node pairs with a duplicate of itself
                let right = pair.get(1).unwrap_or(&pair[0]);
                next.push(hash_pair(&pair[0], right));
            }

            levels.push(next);
        }

        Ok(Self { levels })
    }

    /// Get current root
    pub fn root(&self) -> [u8; 32] {
        self.levels[self.levels.len() - 1][0]
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Get the leaf digest at a position
    pub fn leaf(&self, index: usize) -> Option<[u8; 32]> {
        self.levels[0].get(index).copied()
    }

    /// Derive the inclusion proof for a leaf position.
    ///
    /// Walks leaf-to-root taking the `index ^ 1` sibling at each level;
    /// where that position does not exist (lone trailing node) the proof
    /// carries the node's own digest, the same duplicate used during
    /// construction.
    pub fn proof(&self, index: usize) -> Result<MerkleProof, MerkleError> {
        if index >= self.leaf_count() {
            return Err(MerkleError::IndexOutOfRange {
                index,
                leaf_count: self.leaf_count(),
            });
        }

        let mut siblings = Vec::with_capacity(self.levels.len() - 1);
        let mut current_index = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_index = current_index ^ 1;

            let sibling = level
                .get(sibling_index)
                .copied()
                .unwrap_or(level[current_index]);

            siblings.push(sibling);
            current_index /= 2;
        }

        Ok(MerkleProof {
            siblings,
            index: index as u64,
        })
    }
}
