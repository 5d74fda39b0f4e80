//! Error types for Emberchain

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("invalid difficulty target {0:?}: must be lowercase hex")]
    InvalidDifficultyTarget(String),
    #[error("chain is empty")]
    EmptyChain,
    #[error("invalid previous-hash linkage at block {index}")]
    InvalidLinkage { index: u64 },
    #[error("invalid proof of work at block {index}")]
    InvalidProofOfWork { index: u64 },
    #[error("chain head changed while mining; discarding solved block")]
    StaleHead,
    #[error("proof-of-work search exhausted after {attempts} attempts")]
    SearchExhausted { attempts: u64 },
    #[error("mempool is full")]
    MempoolFull,
    #[error("invalid peer address: {0}")]
    InvalidPeerAddress(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
