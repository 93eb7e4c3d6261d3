//! Roster Tree Cache
//!
//! Memoizes the Merkle tree built from the current roster snapshot. The
//! cached entry is only served while its recorded generation matches the
//! registry and its age is inside the TTL window; any roster mutation
//! must call [`TreeCache::invalidate`] synchronously before the
//! mutation's response is observable, so a tree that omits or includes a
//! voter incorrectly is never served.
//!
//! Rebuilds are pure functions of the snapshot: concurrent rebuilds
//! racing each other converge to the same tree and the last writer's
//! entry is kept.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use veilvote_proof::{MerkleError, MerkleTree};

use super::roster::RosterRegistry;

struct CacheEntry {
    generation: u64,
    tree: Arc<MerkleTree>,
    built_at: Instant,
}

/// Generation- and TTL-keyed cache for the roster tree
pub struct TreeCache {
    ttl: Duration,
    entry: Mutex<Option<CacheEntry>>,
}

impl TreeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Return the cached tree, rebuilding from `registry.snapshot()` when
    /// the entry is missing, stale by generation, or past its TTL.
    pub async fn get_or_build(
        &self,
        registry: &RosterRegistry,
    ) -> Result<Arc<MerkleTree>, MerkleError> {
        let mut slot = self.entry.lock().await;

        if let Some(entry) = slot.as_ref() {
            if entry.generation == registry.generation() && entry.built_at.elapsed() < self.ttl {
                return Ok(entry.tree.clone());
            }
        }

        let digests = registry.snapshot().iter().map(|c| c.0).collect();
        let tree = Arc::new(MerkleTree::from_leaf_digests(digests)?);

        *slot = Some(CacheEntry {
            generation: registry.generation(),
            tree: tree.clone(),
            built_at: Instant::now(),
        });

        Ok(tree)
    }

    /// Force the next `get_or_build` to rebuild regardless of
    /// generation or TTL
    pub async fn invalidate(&self) {
        *self.entry.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(ids: &[&str]) -> RosterRegistry {
        let mut registry = RosterRegistry::new();
        for id in ids {
            registry.register(id).unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn cached_tree_reused_while_generation_matches() {
        let cache = TreeCache::new(Duration::from_secs(3600));
        let registry = registry(&["a", "b"]);

        let t1 = cache.get_or_build(&registry).await.unwrap();
        let t2 = cache.get_or_build(&registry).await.unwrap();

        assert!(Arc::ptr_eq(&t1, &t2), "unchanged roster should hit cache");
    }

    #[tokio::test]
    async fn generation_bump_forces_rebuild() {
        let cache = TreeCache::new(Duration::from_secs(3600));
        let mut registry = registry(&["a", "b"]);

        let t1 = cache.get_or_build(&registry).await.unwrap();

        registry.register("c").unwrap();
        cache.invalidate().await;

        let t2 = cache.get_or_build(&registry).await.unwrap();
        assert_ne!(t1.root(), t2.root(), "new voter must change the root");
    }

    #[tokio::test]
    async fn stale_generation_detected_without_invalidate() {
        // generation check alone catches a mutation even if the mutating
        // path forgot to invalidate
        let cache = TreeCache::new(Duration::from_secs(3600));
        let mut registry = registry(&["a", "b"]);

        let t1 = cache.get_or_build(&registry).await.unwrap();
        registry.register("c").unwrap();
        let t2 = cache.get_or_build(&registry).await.unwrap();

        assert_ne!(t1.root(), t2.root());
    }

    #[tokio::test]
    async fn expired_ttl_forces_rebuild() {
        let cache = TreeCache::new(Duration::ZERO);
        let registry = registry(&["a", "b"]);

        let t1 = cache.get_or_build(&registry).await.unwrap();
        let t2 = cache.get_or_build(&registry).await.unwrap();

        // same root, but the entry was rebuilt rather than served
        assert_eq!(t1.root(), t2.root());
        assert!(!Arc::ptr_eq(&t1, &t2));
    }

    #[tokio::test]
    async fn empty_roster_yields_empty_input() {
        let cache = TreeCache::new(Duration::from_secs(3600));
        let registry = RosterRegistry::new();

        let err = cache.get_or_build(&registry).await.unwrap_err();
        assert_eq!(err, MerkleError::EmptyInput);
    }
}
