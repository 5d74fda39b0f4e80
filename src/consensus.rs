//! Longest-valid-chain consensus resolution.
//!
//! The resolver queries every registered peer for its reported chain,
//! validates each candidate, and tracks the longest one that strictly
//! exceeds the local chain's length. Equal-length chains are never
//! adopted, which keeps the replacement rule irreflexive and avoids
//! oscillation between equal-length forks.
//!
//! This converges only under an honest-majority assumption: difficulty
//! is fixed, so nothing stops a peer from fabricating an arbitrarily
//! long self-consistent chain given enough compute.

use tracing::{debug, warn};

use crate::blockchain::{Block, ChainValidator};
use crate::network::{ChainFetcher, PeerSet};

#[derive(Debug, Clone)]
pub struct ConsensusResolver {
    validator: ChainValidator,
}

impl ConsensusResolver {
    pub fn new(validator: ChainValidator) -> Self {
        Self { validator }
    }

    /// Scan all peers and return the longest valid chain strictly longer
    /// than `local_len`, or `None` if no peer beats the local chain.
    ///
    /// Unreachable peers and malformed or invalid candidates are skipped
    /// with a log line; a single bad peer never blocks resolution. The
    /// selection is a sequential reduction over the ordered peer set, so
    /// the outcome is deterministic for a given set of peer responses.
    pub async fn find_longer_chain(
        &self,
        peers: &PeerSet,
        local_len: usize,
        fetcher: &dyn ChainFetcher,
    ) -> Option<Vec<Block>> {
        let mut best: Option<Vec<Block>> = None;

        for peer in peers {
            let snapshot = match fetcher.fetch_chain(peer).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(peer = %peer, error = %e, "skipping unreachable peer");
                    continue;
                }
            };

            let best_len = best.as_ref().map_or(local_len, Vec::len);
            if snapshot.chain.len() <= best_len {
                debug!(
                    peer = %peer,
                    peer_len = snapshot.chain.len(),
                    best_len,
                    "peer chain is not strictly longer"
                );
                continue;
            }

            match self.validator.validate(&snapshot.chain) {
                Ok(()) => {
                    debug!(peer = %peer, peer_len = snapshot.chain.len(), "new best candidate");
                    best = Some(snapshot.chain);
                }
                Err(e) => {
                    warn!(peer = %peer, error = %e, "ignoring invalid peer chain");
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::blockchain::Ledger;
    use crate::error::{ChainError, Result};
    use crate::miner::ProofOfWork;
    use crate::network::ChainSnapshot;
    use crate::transaction::Transaction;

    const TARGET: &str = "00";

    /// Serves fixed snapshots per peer address; absent peers fail.
    struct StaticFetcher {
        chains: HashMap<String, Vec<Block>>,
    }

    #[async_trait]
    impl ChainFetcher for StaticFetcher {
        async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot> {
            self.chains
                .get(peer)
                .map(|chain| ChainSnapshot {
                    chain: chain.clone(),
                    length: chain.len(),
                })
                .ok_or_else(|| ChainError::Network(format!("{peer}: unreachable")))
        }
    }

    fn pow() -> ProofOfWork {
        ProofOfWork::new(TARGET).unwrap()
    }

    fn resolver() -> ConsensusResolver {
        ConsensusResolver::new(ChainValidator::new(pow()))
    }

    fn mine_chain(blocks: usize, tag: &str) -> Vec<Block> {
        let pow = pow();
        let mut ledger = Ledger::new(&pow).unwrap();
        for i in 0..blocks {
            let head = ledger.head();
            let prev = head.digest();
            let index = head.index + 1;
            let txs = vec![Transaction::new(tag, "recipient", i as f64)];
            let nonce = pow.solve(index, &prev, &txs).unwrap();
            ledger.append_block(prev, nonce, txs, 2_000 + i as u64);
        }
        ledger.blocks().to_vec()
    }

    fn peers(addrs: &[&str]) -> PeerSet {
        addrs.iter().map(|a| a.to_string()).collect()
    }

    #[tokio::test]
    async fn adopts_a_strictly_longer_valid_chain() {
        let remote = mine_chain(3, "b");
        let fetcher = StaticFetcher {
            chains: HashMap::from([("b:5000".to_string(), remote.clone())]),
        };

        let found = resolver()
            .find_longer_chain(&peers(&["b:5000"]), 1, &fetcher)
            .await;
        assert_eq!(found, Some(remote));
    }

    #[tokio::test]
    async fn never_adopts_equal_length_chains() {
        // Two divergent valid chains of the same length as each other
        // and the local ledger: neither may win.
        let fetcher = StaticFetcher {
            chains: HashMap::from([
                ("a:5000".to_string(), mine_chain(2, "a")),
                ("b:5000".to_string(), mine_chain(2, "b")),
            ]),
        };

        let found = resolver()
            .find_longer_chain(&peers(&["a:5000", "b:5000"]), 3, &fetcher)
            .await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn never_adopts_an_invalid_chain_even_if_longer() {
        let mut forged = mine_chain(4, "b");
        forged[2].transactions[0].amount = 1_000_000.0;

        let fetcher = StaticFetcher {
            chains: HashMap::from([("b:5000".to_string(), forged)]),
        };

        let found = resolver()
            .find_longer_chain(&peers(&["b:5000"]), 1, &fetcher)
            .await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn unreachable_peers_are_skipped() {
        let remote = mine_chain(2, "b");
        let fetcher = StaticFetcher {
            chains: HashMap::from([("b:5000".to_string(), remote.clone())]),
        };

        let found = resolver()
            .find_longer_chain(&peers(&["a:5000", "b:5000", "c:5000"]), 1, &fetcher)
            .await;
        assert_eq!(found, Some(remote));
    }

    #[tokio::test]
    async fn longest_of_several_valid_chains_wins() {
        let fetcher = StaticFetcher {
            chains: HashMap::from([
                ("a:5000".to_string(), mine_chain(2, "a")),
                ("b:5000".to_string(), mine_chain(4, "b")),
                ("c:5000".to_string(), mine_chain(3, "c")),
            ]),
        };

        let found = resolver()
            .find_longer_chain(&peers(&["a:5000", "b:5000", "c:5000"]), 1, &fetcher)
            .await
            .unwrap();
        assert_eq!(found.len(), 5);
    }
}
