//! Candidate chain validation.
//!
//! Used on chains received from peers before they can replace the local
//! ledger. Failures are structured: they name the first offending block
//! index.

use crate::blockchain::core::chain::Block;
use crate::error::{ChainError, Result};
use crate::miner::ProofOfWork;

#[derive(Debug, Clone)]
pub struct ChainValidator {
    pow: ProofOfWork,
}

impl ChainValidator {
    pub fn new(pow: ProofOfWork) -> Self {
        Self { pow }
    }

    /// Check an arbitrary candidate chain for internal consistency.
    ///
    /// Genesis linkage is trusted as the anchor, but its proof-of-work is
    /// validated like every other block's. From index 1 onward each block
    /// must link to the digest of its predecessor in the same candidate
    /// sequence and satisfy the proof-of-work predicate. Stops at the
    /// first failing block.
    pub fn validate(&self, chain: &[Block]) -> Result<()> {
        let genesis = chain.first().ok_or(ChainError::EmptyChain)?;
        self.check_pow(genesis)?;

        for pair in chain.windows(2) {
            let (prev, cur) = (&pair[0], &pair[1]);
            if cur.previous_hash != prev.digest() {
                return Err(ChainError::InvalidLinkage { index: cur.index });
            }
            self.check_pow(cur)?;
        }
        Ok(())
    }

    /// Boolean convenience wrapper around [`validate`](Self::validate).
    pub fn is_valid(&self, chain: &[Block]) -> bool {
        self.validate(chain).is_ok()
    }

    fn check_pow(&self, block: &Block) -> Result<()> {
        if !self.pow.is_valid(
            block.index,
            &block.previous_hash,
            &block.transactions,
            block.nonce,
        ) {
            return Err(ChainError::InvalidProofOfWork { index: block.index });
        }
        Ok(())
    }
}
