//! Proof-of-work search and validity predicate.
//!
//! The search is a deliberately transparent linear scan: nonce 0, 1, 2,
//! ... until the content digest's hex prefix matches the difficulty
//! target. No threading, no randomized restarts; the predicate is the
//! point, not mining throughput.

use sha2::{Digest, Sha256};

use crate::error::{ChainError, Result};
use crate::transaction::Transaction;

/// Default difficulty: the content digest must start with four hex zeros.
pub const DEFAULT_DIFFICULTY_TARGET: &str = "0000";

/// Process-wide proof-of-work parameters. The target is fixed at
/// construction and never adjusted at runtime.
#[derive(Debug, Clone)]
pub struct ProofOfWork {
    target: String,
    max_attempts: Option<u64>,
}

impl ProofOfWork {
    /// Build an engine for the given textual hex target. An empty target
    /// makes every nonce valid, which the tests use for instant mining.
    pub fn new(target: impl Into<String>) -> Result<Self> {
        let target = target.into();
        if !target.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()) {
            return Err(ChainError::InvalidDifficultyTarget(target));
        }
        Ok(Self {
            target,
            max_attempts: None,
        })
    }

    /// Bound the nonce scan. The default search is unbounded; a capped
    /// engine fails with [`ChainError::SearchExhausted`] instead of
    /// spinning forever on an unreachable target.
    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Find the lowest nonce satisfying the validity predicate for the
    /// given block content. Scans linearly from 0. Potentially
    /// long-running; callers must not hold shared locks across it.
    pub fn solve(&self, index: u64, previous_hash: &str, transactions: &[Transaction]) -> Result<u64> {
        let mut nonce = 0u64;
        loop {
            if self.is_valid(index, previous_hash, transactions, nonce) {
                return Ok(nonce);
            }
            if let Some(cap) = self.max_attempts {
                if nonce + 1 >= cap {
                    return Err(ChainError::SearchExhausted { attempts: cap });
                }
            }
            nonce += 1;
        }
    }

    /// The difficulty predicate: hash the content sequence (index,
    /// previous hash, transactions, nonce) in that fixed order and check
    /// the digest's hex prefix against the target.
    pub fn is_valid(
        &self,
        index: u64,
        previous_hash: &str,
        transactions: &[Transaction],
        nonce: u64,
    ) -> bool {
        let mut hasher = Sha256::new();
        hasher.update(index.to_le_bytes());
        hasher.update(previous_hash.as_bytes());
        for tx in transactions {
            hasher.update(tx.digest());
        }
        hasher.update(nonce.to_le_bytes());
        let digest = hex::encode(hasher.finalize());
        digest.starts_with(&self.target)
    }
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self {
            target: DEFAULT_DIFFICULTY_TARGET.to_string(),
            max_attempts: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solve_finds_a_valid_nonce() {
        // Two hex zeros keeps the expected scan around 256 attempts.
        let pow = ProofOfWork::new("00").unwrap();
        let nonce = pow.solve(1, "abc123", &[]).unwrap();
        assert!(pow.is_valid(1, "abc123", &[], nonce));
    }

    #[test]
    fn empty_target_accepts_nonce_zero() {
        let pow = ProofOfWork::new("").unwrap();
        assert_eq!(pow.solve(0, "seed", &[]).unwrap(), 0);
    }

    #[test]
    fn solve_returns_the_lowest_valid_nonce() {
        let pow = ProofOfWork::new("00").unwrap();
        let txs = vec![Transaction::new("alice", "bob", 5.0)];
        let nonce = pow.solve(3, "prev", &txs).unwrap();

        assert!(pow.is_valid(3, "prev", &txs, nonce));
        for earlier in 0..nonce {
            assert!(!pow.is_valid(3, "prev", &txs, earlier));
        }
    }

    #[test]
    fn tampered_content_invalidates_the_nonce() {
        // Three hex zeros: a stale nonce survives a content change with
        // probability 2^-12, negligible for a test.
        let pow = ProofOfWork::new("000").unwrap();
        let txs = vec![Transaction::new("alice", "bob", 5.0)];
        let nonce = pow.solve(3, "prev", &txs).unwrap();

        let tampered = vec![Transaction::new("alice", "bob", 500.0)];
        assert!(!pow.is_valid(3, "prev", &tampered, nonce));
    }

    #[test]
    fn capped_search_reports_exhaustion() {
        let pow = ProofOfWork::new("ffffffffffffffff").unwrap().with_max_attempts(10);
        assert!(matches!(
            pow.solve(0, "seed", &[]),
            Err(ChainError::SearchExhausted { attempts: 10 })
        ));
    }

    #[test]
    fn uppercase_or_non_hex_target_is_rejected() {
        assert!(ProofOfWork::new("00ZZ").is_err());
        assert!(ProofOfWork::new("ABCD").is_err());
        assert!(ProofOfWork::new("0a1b").is_ok());
    }
}
