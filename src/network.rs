//! Peer set and peer chain fetching.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::blockchain::Block;
use crate::error::{ChainError, Result};

/// How long a single peer fetch may take before it counts as
/// unreachable.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Registered peers, kept as canonical `host:port` strings. Ordered so
/// that consensus resolution scans peers deterministically.
pub type PeerSet = BTreeSet<String>;

/// Parse a peer address into canonical `host:port` form. Accepts bare
/// `host:port` as well as full URLs; the scheme and any path are
/// discarded.
pub fn canonical_peer_address(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ChainError::InvalidPeerAddress(raw.to_string()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let url = Url::parse(&with_scheme)
        .map_err(|e| ChainError::InvalidPeerAddress(format!("{raw}: {e}")))?;

    let host = url
        .host_str()
        .ok_or_else(|| ChainError::InvalidPeerAddress(raw.to_string()))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| ChainError::InvalidPeerAddress(raw.to_string()))?;

    Ok(format!("{host}:{port}"))
}

/// The chain exchange format peers serve at `GET /blockchain`. Anything
/// that does not decode into this shape, or whose `length` disagrees
/// with the block count, is treated as a fetch failure for that peer.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub length: usize,
}

/// Fetches a peer's reported chain. Seam between the consensus resolver
/// and the transport, so tests can resolve against in-process chains.
#[async_trait]
pub trait ChainFetcher: Send + Sync {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot>;
}

/// HTTP implementation querying `http://{peer}/blockchain`.
#[derive(Debug, Clone)]
pub struct HttpChainFetcher {
    client: reqwest::Client,
}

impl HttpChainFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self { client }
    }
}

impl Default for HttpChainFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainFetcher for HttpChainFetcher {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot> {
        let url = format!("http://{peer}/blockchain");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChainError::Network(format!("{peer}: {e}")))?;

        if !response.status().is_success() {
            return Err(ChainError::Network(format!(
                "{peer}: status {}",
                response.status()
            )));
        }

        let snapshot: ChainSnapshot = response
            .json()
            .await
            .map_err(|e| ChainError::Network(format!("{peer}: malformed chain: {e}")))?;

        if snapshot.length != snapshot.chain.len() {
            return Err(ChainError::Network(format!(
                "{peer}: reported length {} does not match {} blocks",
                snapshot.length,
                snapshot.chain.len()
            )));
        }

        Ok(snapshot)
    }
}
