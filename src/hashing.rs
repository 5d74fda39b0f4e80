//! Canonical SHA-256 digests.
//!
//! Every digest in the chain is computed over an explicit, fixed field
//! order. Nothing hashes a serialized container, so structurally equal
//! values always produce the same digest regardless of how they were
//! built or decoded.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a raw byte sequence.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Length of every hex digest produced by this module.
pub const DIGEST_HEX_LEN: usize = 64;
