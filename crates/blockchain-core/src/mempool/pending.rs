//! The pending-transaction pool: verified transactions awaiting inclusion
//! in a proposed block. Mutated by verifier tasks (insert) and by the
//! Chain finalization path (delete); access is serialized through a single
//! `RwLock`, satisfying the "insert/delete/iterate atomicity per call"
//! contract without requiring lock-free structures.

use blockchain_crypto::Id;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ledger::Transaction;

#[derive(Debug, thiserror::Error)]
pub enum PendingError {
    #[error("pending pool capacity exceeded: {requested} requested, {available} available")]
    CapacityExceeded { requested: usize, available: usize },
}

pub struct PendingPool {
    entries: RwLock<HashMap<Id, Arc<Transaction>>>,
    capacity: usize,
}

impl PendingPool {
    pub fn new(capacity: usize) -> Self {
        PendingPool {
            entries: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Check that `count` additional entries fit under the pool's
    /// capacity. Does not itself hold any slots — the caller is expected to
    /// follow a successful reservation promptly with `insert_all`. A
    /// shrinking window between the check and the insert is acceptable
    /// here because, per spec, the only concurrent mutators are batched
    /// verifier flushes (bounded by `max_batch_size`) and finalization
    /// (strictly removes), so reservation failures are a capacity signal,
    /// not a correctness requirement.
    pub async fn reserve(&self, count: usize) -> Result<(), PendingError> {
        let len = self.entries.read().await.len();
        if len + count > self.capacity {
            return Err(PendingError::CapacityExceeded {
                requested: count,
                available: self.capacity.saturating_sub(len),
            });
        }
        Ok(())
    }

    /// Insert a batch of accepted transactions, keyed by id. Duplicate ids
    /// overwrite the previous holder (last-write-wins), matching the
    /// source's `putAssumeCapacity` semantics.
    pub async fn insert_all(&self, txs: Vec<Arc<Transaction>>) {
        let mut entries = self.entries.write().await;
        for tx in txs {
            entries.insert(tx.id(), tx);
        }
    }

    /// Snapshot up to `max` ids in the map's current iteration order. No
    /// ordering guarantee is made beyond "stable within one call" — this
    /// mirrors the source's dependence on its hash map's internal slot
    /// order.
    pub async fn snapshot_ids(&self, max: usize) -> Vec<Id> {
        self.entries.read().await.keys().take(max).copied().collect()
    }

    /// Remove `id`. Returns an error-free `bool`: finalization treats a
    /// missing id as an invariant violation at the call site, not here —
    /// this method only reports whether removal occurred.
    pub async fn remove(&self, id: &Id) -> Option<Arc<Transaction>> {
        self.entries.write().await.remove(id)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, id: &Id) -> bool {
        self.entries.read().await.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockchain_crypto::Keypair;
    use crate::ledger::Tag;

    fn tx() -> Arc<Transaction> {
        let keypair = Keypair::generate();
        Arc::new(Transaction::new(&keypair, 0, 0, Tag::NoOp, Vec::new()))
    }

    #[tokio::test]
    async fn insert_and_remove_round_trip() {
        let pool = PendingPool::new(16);
        let tx = tx();
        pool.reserve(1).await.unwrap();
        pool.insert_all(vec![Arc::clone(&tx)]).await;
        assert_eq!(pool.len().await, 1);
        assert!(pool.contains(&tx.id()).await);

        let removed = pool.remove(&tx.id()).await;
        assert_eq!(removed.map(|t| t.id()), Some(tx.id()));
        assert_eq!(pool.len().await, 0);
    }

    #[tokio::test]
    async fn reservation_rejects_when_full() {
        let pool = PendingPool::new(1);
        pool.insert_all(vec![tx()]).await;
        assert!(pool.reserve(1).await.is_err());
    }

    #[tokio::test]
    async fn duplicate_insert_overwrites() {
        let pool = PendingPool::new(16);
        let a = tx();
        pool.insert_all(vec![Arc::clone(&a)]).await;
        pool.insert_all(vec![Arc::clone(&a)]).await;
        assert_eq!(pool.len().await, 1);
    }
}
