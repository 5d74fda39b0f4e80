//! Transaction value object.

use sha2::{Digest, Sha256};

/// Sentinel sender marking a mining reward.
pub const REWARD_SENDER: &str = "0";

/// A transfer recorded in a block. Pure value object: two transactions
/// with the same fields are interchangeable. Amounts are never checked
/// against balances.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: f64) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }

    /// The mining reward paid to this node when it seals a block.
    pub fn reward(recipient: impl Into<String>, amount: f64) -> Self {
        Self::new(REWARD_SENDER, recipient, amount)
    }

    pub fn is_reward(&self) -> bool {
        self.sender == REWARD_SENDER
    }

    /// Calculate the digest of this transaction. Fields are fed to the
    /// hasher length-prefixed so adjacent strings cannot alias.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update((self.sender.len() as u64).to_le_bytes());
        hasher.update(self.sender.as_bytes());
        hasher.update((self.recipient.len() as u64).to_le_bytes());
        hasher.update(self.recipient.as_bytes());
        hasher.update(self.amount.to_bits().to_le_bytes());
        hasher.finalize().into()
    }
}
