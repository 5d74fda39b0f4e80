//! Configuration management for Emberchain

use serde::Deserialize;
use std::fs;

use crate::error::{ChainError, Result};
use crate::miner::{ProofOfWork, DEFAULT_DIFFICULTY_TARGET};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub miner: MinerConfig,
}

#[derive(Debug, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_difficulty_target")]
    pub difficulty_target: String,
    /// Optional cap on the nonce scan. Unset keeps the search unbounded.
    #[serde(default)]
    pub max_nonce_attempts: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MinerConfig {
    #[serde(default = "default_reward_amount")]
    pub reward_amount: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            bootstrap_peers: Vec::new(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty_target: default_difficulty_target(),
            max_nonce_attempts: None,
        }
    }
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            reward_amount: default_reward_amount(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            chain: ChainConfig::default(),
            miner: MinerConfig::default(),
        }
    }
}

impl Config {
    /// Build the proof-of-work engine described by this configuration.
    pub fn proof_of_work(&self) -> Result<ProofOfWork> {
        let pow = ProofOfWork::new(self.chain.difficulty_target.clone())?;
        Ok(match self.chain.max_nonce_attempts {
            Some(cap) => pow.with_max_attempts(cap),
            None => pow,
        })
    }
}

fn default_api_port() -> u16 {
    5000
}

fn default_difficulty_target() -> String {
    DEFAULT_DIFFICULTY_TARGET.to_string()
}

fn default_reward_amount() -> f64 {
    1.0
}

/// Load configuration from the given path, falling back to defaults
/// when the file is absent.
pub fn load_config(path: &str) -> Result<Config> {
    let config_str = fs::read_to_string(path).unwrap_or_default();
    let config: Config = if config_str.is_empty() {
        Config::default()
    } else {
        toml::from_str(&config_str)
            .map_err(|e| ChainError::Config(format!("{path}: {e}")))?
    };

    // Validate critical values up front: a bad difficulty target should
    // fail startup, not the first mining request.
    config.proof_of_work()?;

    Ok(config)
}
