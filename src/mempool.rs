//! Pending transaction pool.

use crate::error::ChainError;
use crate::transaction::Transaction;

/// Maximum number of pending transactions held at once.
pub const MAX_POOL_SIZE: usize = 10_000;

/// Transactions accumulated since the last block was mined. The pool is
/// owned by the node engine, not the ledger; mining snapshots it and the
/// engine clears it exactly when the mined block is appended.
#[derive(Debug, Clone, Default)]
pub struct Mempool {
    pending: Vec<Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a transaction for the next mined block. No field validation
    /// happens here; malformed submissions are rejected at the API
    /// boundary before they reach the pool.
    pub fn push(&mut self, tx: Transaction) -> Result<(), ChainError> {
        if self.pending.len() >= MAX_POOL_SIZE {
            return Err(ChainError::MempoolFull);
        }
        self.pending.push(tx);
        Ok(())
    }

    /// Current pool contents, in submission order, without mutating the
    /// pool. Mining uses this to know what to seal.
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.pending.clone()
    }

    /// Empty the pool. Called only after a successful append.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_grows_pool_and_snapshot_preserves_order() {
        let mut pool = Mempool::new();
        pool.push(Transaction::new("alice", "bob", 1.0)).unwrap();
        pool.push(Transaction::new("bob", "carol", 2.0)).unwrap();
        assert_eq!(pool.len(), 2);

        let snapshot = pool.snapshot();
        assert_eq!(snapshot[0].sender, "alice");
        assert_eq!(snapshot[1].sender, "bob");
        // snapshot does not drain
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn clear_empties_pool() {
        let mut pool = Mempool::new();
        pool.push(Transaction::new("alice", "bob", 1.0)).unwrap();
        pool.clear();
        assert!(pool.is_empty());
    }

    #[test]
    fn full_pool_rejects_submission() {
        let mut pool = Mempool::new();
        for i in 0..MAX_POOL_SIZE {
            pool.push(Transaction::new(format!("s{i}"), "r", 1.0)).unwrap();
        }
        assert!(matches!(
            pool.push(Transaction::new("late", "r", 1.0)),
            Err(ChainError::MempoolFull)
        ));
    }
}
