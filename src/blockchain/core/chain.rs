use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::miner::ProofOfWork;
use crate::transaction::Transaction;

/// Seed string anchoring every chain. Its digest is the genesis block's
/// `previous_hash`.
pub const GENESIS_SEED: &str = "emberchain genesis seed";

/// Fixed genesis timestamp (2024-01-01T00:00:00Z, in ms) so that
/// independently constructed nodes produce identical genesis blocks.
pub const GENESIS_TIMESTAMP_MS: u64 = 1_704_067_200_000;

/// One proof-of-work-sealed unit of the ledger. Immutable once appended.
/// The struct declaration order is the canonical encoding schema: the
/// digest feeds fields to the hasher in exactly this order.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    /// 0-based, equal to the block's position in the sequence.
    pub index: u64,
    /// Creation time in ms since epoch. Informational, never validated.
    pub timestamp: u64,
    /// Pool contents at creation time; may be empty.
    pub transactions: Vec<Transaction>,
    /// Nonce satisfying the proof-of-work predicate for this block.
    pub nonce: u64,
    /// Hex digest of the previous block; for genesis, of [`GENESIS_SEED`].
    pub previous_hash: String,
}

impl Block {
    /// Canonical hex digest of this block. Fields are hashed in the fixed
    /// schema order, so two structurally equal blocks always hash
    /// identically no matter how they were produced or decoded.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.index.to_le_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        for tx in &self.transactions {
            hasher.update(tx.digest());
        }
        hasher.update(self.nonce.to_le_bytes());
        hasher.update(self.previous_hash.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Hex digest of the well-known genesis seed.
pub fn genesis_digest() -> String {
    crate::hashing::sha256_hex(GENESIS_SEED.as_bytes())
}

/// The ordered block sequence. Holds exactly one genesis block after
/// construction and is never empty thereafter.
#[derive(Debug, Clone)]
pub struct Ledger {
    blocks: Vec<Block>,
}

impl Ledger {
    /// Create a ledger with its genesis block, solving the genesis
    /// proof-of-work eagerly.
    pub fn new(pow: &ProofOfWork) -> Result<Self> {
        let previous_hash = genesis_digest();
        let nonce = pow.solve(0, &previous_hash, &[])?;

        let genesis = Block {
            index: 0,
            timestamp: GENESIS_TIMESTAMP_MS,
            transactions: Vec::new(),
            nonce,
            previous_hash,
        };

        Ok(Self {
            blocks: vec![genesis],
        })
    }

    /// Construct the next block from the current length and append it.
    /// Trusts its caller: the proof-of-work check happened before this
    /// call, and the validator is the gatekeeper for chains received
    /// from outside.
    pub fn append_block(
        &mut self,
        previous_hash: String,
        nonce: u64,
        transactions: Vec<Transaction>,
        timestamp: u64,
    ) -> &Block {
        let block = Block {
            index: self.blocks.len() as u64,
            timestamp,
            transactions,
            nonce,
            previous_hash,
        };
        self.blocks.push(block);
        self.head()
    }

    /// The most recently appended block.
    pub fn head(&self) -> &Block {
        self.blocks
            .last()
            .expect("ledger always contains at least the genesis block")
    }

    /// Atomically discard the current sequence and install a
    /// pre-validated candidate. The only mutation path used during
    /// consensus resolution. The candidate must be non-empty and must
    /// have passed [`ChainValidator::validate`](super::ChainValidator).
    pub fn replace(&mut self, candidate: Vec<Block>) {
        debug_assert!(!candidate.is_empty(), "validated candidates are never empty");
        if candidate.is_empty() {
            return;
        }
        self.blocks = candidate;
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
