//! Node engine and shared async wrapper.
//!
//! [`NodeEngine`] owns all mutable state: the ledger, the pending pool
//! and the peer set. There is exactly one mutation domain — [`Node`]
//! wraps the engine in a single `RwLock`, so `append`, `replace` and
//! pool updates never interleave. The proof-of-work search itself runs
//! with no lock held.

use std::sync::Arc;

use chrono::Utc;
use rand::RngCore;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::blockchain::{Block, ChainValidator, Ledger};
use crate::config::Config;
use crate::consensus::ConsensusResolver;
use crate::error::{ChainError, Result};
use crate::mempool::Mempool;
use crate::miner::ProofOfWork;
use crate::network::{canonical_peer_address, ChainFetcher, ChainSnapshot, HttpChainFetcher, PeerSet};
use crate::transaction::Transaction;

/// Everything mined from this node pays its reward to this identity,
/// generated once per engine.
fn generate_node_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// The ledger/consensus engine. No implicit globals: every instance is
/// fully isolated, so tests can run several nodes in one process.
#[derive(Debug)]
pub struct NodeEngine {
    node_id: String,
    pow: ProofOfWork,
    ledger: Ledger,
    mempool: Mempool,
    peers: PeerSet,
    reward_amount: f64,
}

/// State snapshotted under the lock before the proof-of-work search.
#[derive(Debug, Clone)]
pub struct MiningJob {
    pub index: u64,
    pub previous_hash: String,
    pub transactions: Vec<Transaction>,
}

impl NodeEngine {
    /// Create an engine, eagerly solving the genesis proof-of-work.
    pub fn new(pow: ProofOfWork, reward_amount: f64) -> Result<Self> {
        let ledger = Ledger::new(&pow)?;
        Ok(Self {
            node_id: generate_node_id(),
            pow,
            ledger,
            mempool: Mempool::new(),
            peers: PeerSet::new(),
            reward_amount,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn pow(&self) -> &ProofOfWork {
        &self.pow
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    pub fn peers(&self) -> &PeerSet {
        &self.peers
    }

    /// Queue a transaction and report the index of the block it will
    /// land in if a block is mined next.
    pub fn submit_transaction(&mut self, tx: Transaction) -> Result<u64> {
        self.mempool.push(tx)?;
        Ok(self.ledger.head().index + 1)
    }

    /// Register peer addresses in canonical `host:port` form. Returns an
    /// error on the first address that does not parse; earlier addresses
    /// in the list stay registered.
    pub fn register_peers<I, S>(&mut self, addresses: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in addresses {
            let canonical = canonical_peer_address(raw.as_ref())?;
            if self.peers.insert(canonical.clone()) {
                info!(peer = %canonical, "registered peer");
            }
        }
        Ok(self.peers.len())
    }

    /// First half of mining: submit the reward transaction and snapshot
    /// everything the proof-of-work search needs. The search itself runs
    /// outside the lock.
    pub fn begin_mining(&mut self) -> Result<MiningJob> {
        let reward = Transaction::reward(self.node_id.clone(), self.reward_amount);
        self.mempool.push(reward)?;

        let head = self.ledger.head();
        Ok(MiningJob {
            index: head.index + 1,
            previous_hash: head.digest(),
            transactions: self.mempool.snapshot(),
        })
    }

    /// Second half of mining: append the solved block and clear the
    /// pool. Fails with [`ChainError::StaleHead`] if the head moved
    /// while the nonce was being searched (a concurrent resolve swapped
    /// the chain); the pool is left untouched in that case.
    pub fn commit_mined_block(&mut self, job: MiningJob, nonce: u64) -> Result<Block> {
        if self.ledger.head().digest() != job.previous_hash {
            return Err(ChainError::StaleHead);
        }

        let timestamp = Utc::now().timestamp_millis() as u64;
        let block = self
            .ledger
            .append_block(job.previous_hash, nonce, job.transactions, timestamp)
            .clone();
        self.mempool.clear();

        info!(index = block.index, nonce = block.nonce, "sealed new block");
        Ok(block)
    }

    fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    /// The full chain in the peer exchange format.
    pub fn chain_snapshot(&self) -> ChainSnapshot {
        let chain = self.ledger.blocks().to_vec();
        let length = chain.len();
        ChainSnapshot { chain, length }
    }
}

/// Outcome of a consensus resolution round.
#[derive(Debug, Clone)]
pub struct ResolutionOutcome {
    pub updated: bool,
    pub snapshot: ChainSnapshot,
}

/// Shared handle driving the engine from async contexts. Clones observe
/// the same engine.
#[derive(Clone)]
pub struct Node {
    engine: Arc<RwLock<NodeEngine>>,
    resolver: Arc<ConsensusResolver>,
    fetcher: Arc<dyn ChainFetcher>,
}

impl Node {
    /// Build a node from configuration, talking HTTP to its peers.
    pub fn from_config(config: &Config) -> Result<Self> {
        let pow = config.proof_of_work()?;
        let mut engine = NodeEngine::new(pow, config.miner.reward_amount)?;
        if !config.network.bootstrap_peers.is_empty() {
            engine.register_peers(&config.network.bootstrap_peers)?;
        }
        Ok(Self::with_fetcher(engine, Arc::new(HttpChainFetcher::new())))
    }

    /// Build a node over an arbitrary fetcher. Tests use this to wire
    /// several in-process nodes together.
    pub fn with_fetcher(engine: NodeEngine, fetcher: Arc<dyn ChainFetcher>) -> Self {
        let resolver = ConsensusResolver::new(ChainValidator::new(engine.pow().clone()));
        Self {
            engine: Arc::new(RwLock::new(engine)),
            resolver: Arc::new(resolver),
            fetcher,
        }
    }

    pub async fn node_id(&self) -> String {
        self.engine.read().await.node_id().to_string()
    }

    pub async fn chain_snapshot(&self) -> ChainSnapshot {
        self.engine.read().await.chain_snapshot()
    }

    pub async fn pending_transactions(&self) -> Vec<Transaction> {
        self.engine.read().await.mempool().snapshot()
    }

    pub async fn peers(&self) -> PeerSet {
        self.engine.read().await.peers().clone()
    }

    pub async fn submit_transaction(&self, tx: Transaction) -> Result<u64> {
        self.engine.write().await.submit_transaction(tx)
    }

    pub async fn register_peers(&self, addresses: Vec<String>) -> Result<usize> {
        self.engine.write().await.register_peers(addresses)
    }

    /// Mine one block: reward submission and snapshot under the write
    /// lock, the potentially long-running nonce search on a blocking
    /// thread with no lock held, then append-and-clear under the write
    /// lock again.
    pub async fn mine(&self) -> Result<Block> {
        let (job, pow) = {
            let mut engine = self.engine.write().await;
            let job = engine.begin_mining()?;
            (job, engine.pow().clone())
        };

        let solved = {
            let job = job.clone();
            tokio::task::spawn_blocking(move || {
                pow.solve(job.index, &job.previous_hash, &job.transactions)
            })
            .await
            .map_err(|e| ChainError::Internal(format!("mining task failed: {e}")))??
        };

        self.engine.write().await.commit_mined_block(job, solved)
    }

    /// Run one consensus round against all registered peers, replacing
    /// the local chain if a strictly longer valid one was observed.
    pub async fn resolve_conflicts(&self) -> ResolutionOutcome {
        let (peers, local_len) = {
            let engine = self.engine.read().await;
            (engine.peers().clone(), engine.ledger().len())
        };

        let candidate = self
            .resolver
            .find_longer_chain(&peers, local_len, self.fetcher.as_ref())
            .await;

        let mut engine = self.engine.write().await;
        let updated = match candidate {
            // Re-check against the current length: the local chain may
            // have grown while peers were being queried.
            Some(chain) if chain.len() > engine.ledger().len() => {
                info!(new_len = chain.len(), old_len = engine.ledger().len(), "replacing chain");
                engine.ledger_mut().replace(chain);
                true
            }
            Some(_) => {
                warn!("discarding candidate: local chain grew during resolution");
                false
            }
            None => false,
        };

        ResolutionOutcome {
            updated,
            snapshot: engine.chain_snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> NodeEngine {
        NodeEngine::new(ProofOfWork::new("").unwrap(), 1.0).unwrap()
    }

    #[test]
    fn submit_reports_the_next_block_index() {
        let mut engine = engine();
        let index = engine
            .submit_transaction(Transaction::new("alice", "bob", 4.0))
            .unwrap();
        assert_eq!(index, 1);
        assert_eq!(engine.mempool().len(), 1);
    }

    #[test]
    fn mining_seals_the_pool_and_clears_it() {
        let mut engine = engine();
        engine
            .submit_transaction(Transaction::new("alice", "bob", 4.0))
            .unwrap();

        let job = engine.begin_mining().unwrap();
        // snapshot holds the submitted transaction plus the reward
        assert_eq!(job.transactions.len(), 2);
        assert!(job.transactions[1].is_reward());

        let nonce = engine
            .pow()
            .solve(job.index, &job.previous_hash, &job.transactions)
            .unwrap();
        let block = engine.commit_mined_block(job, nonce).unwrap();

        assert_eq!(block.index, 1);
        assert_eq!(block.transactions.len(), 2);
        assert!(engine.mempool().is_empty());
    }

    #[test]
    fn stale_head_is_rejected_and_pool_survives() {
        let mut engine = engine();
        let job = engine.begin_mining().unwrap();

        // A concurrent resolve swapped the chain before commit.
        let other = NodeEngine::new(ProofOfWork::new("").unwrap(), 1.0).unwrap();
        let mut replacement = other.ledger().blocks().to_vec();
        let prev = replacement[0].digest();
        replacement.push(Block {
            index: 1,
            timestamp: 9,
            transactions: Vec::new(),
            nonce: 0,
            previous_hash: prev,
        });
        engine.ledger_mut().replace(replacement);

        assert!(matches!(
            engine.commit_mined_block(job, 0),
            Err(ChainError::StaleHead)
        ));
        // reward transaction is still pending for the next attempt
        assert_eq!(engine.mempool().len(), 1);
    }

    #[test]
    fn register_peers_canonicalizes_and_deduplicates() {
        let mut engine = engine();
        let total = engine
            .register_peers(["127.0.0.1:5001", "http://127.0.0.1:5001", "node-b:5002"])
            .unwrap();
        assert_eq!(total, 2);
        assert!(engine.peers().contains("127.0.0.1:5001"));
        assert!(engine.peers().contains("node-b:5002"));
    }

    #[test]
    fn bad_peer_address_is_an_error() {
        let mut engine = engine();
        assert!(engine.register_peers(["   "]).is_err());
    }
}
