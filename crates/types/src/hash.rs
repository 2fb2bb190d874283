//! SHA-256 helpers.
//!
//! Refresh-token secrets are never stored. The ledger keys every token by the
//! SHA-256 digest of its secret, so a lookup is a point read on the digest.

use sha2::{Digest, Sha256};

/// SHA-256 hash output (32 bytes).
pub type Hash = [u8; 32];

/// Compute SHA-256 hash of arbitrary data.
#[inline]
pub fn sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Formats the first bytes of a hash for log output.
///
/// Never log a full token hash; eight hex characters are enough to correlate
/// log lines without handing out a lookup key.
pub fn short_hex(hash: &Hash) -> String {
    hash[..4].iter().map(|b| format!("{b:02x}")).collect()
}
