//! Index key encoding.
//!
//! All multi-part keys are fixed-width big-endian so that byte order equals
//! logical order. Timestamps are stored as microseconds since the Unix epoch
//! with the sign bit flipped, so pre-epoch values still sort first.

use campus_ledger_types::{FamilyId, StudentId, TokenHash, UserId};
use chrono::{DateTime, Utc};

/// Width of an encoded timestamp.
pub const TIMESTAMP_LEN: usize = 8;

/// Width of a token hash.
pub const TOKEN_HASH_LEN: usize = 32;

/// Encodes a timestamp as 8 sortable bytes.
#[inline]
pub fn encode_timestamp(at: DateTime<Utc>) -> [u8; TIMESTAMP_LEN] {
    let micros = at.timestamp_micros();
    ((micros as u64) ^ (1 << 63)).to_be_bytes()
}

/// Referrer listing key: `{referrer:8}{created_at:8}{referee:8}`.
pub fn referrer_key(referrer: StudentId, created_at: DateTime<Utc>, referee: StudentId) -> [u8; 24] {
    let mut key = [0u8; 24];
    key[..8].copy_from_slice(&referrer.value().to_be_bytes());
    key[8..16].copy_from_slice(&encode_timestamp(created_at));
    key[16..].copy_from_slice(&referee.value().to_be_bytes());
    key
}

/// Inclusive key bounds covering every referral made by `referrer`.
pub fn referrer_bounds(referrer: StudentId) -> ([u8; 24], [u8; 24]) {
    let prefix = referrer.value().to_be_bytes();
    let mut lo = [0u8; 24];
    let mut hi = [0xFFu8; 24];
    lo[..8].copy_from_slice(&prefix);
    hi[..8].copy_from_slice(&prefix);
    (lo, hi)
}

/// Extracts the referee id from a referrer listing key.
pub fn referee_from_referrer_key(key: &[u8]) -> Option<StudentId> {
    let bytes: [u8; 8] = key.get(16..24)?.try_into().ok()?;
    Some(StudentId::new(u64::from_be_bytes(bytes)))
}

/// User index key: `{user:8}{token_hash:32}`.
pub fn user_token_key(user: UserId, hash: &TokenHash) -> [u8; 40] {
    let mut key = [0u8; 40];
    key[..8].copy_from_slice(&user.value().to_be_bytes());
    key[8..].copy_from_slice(hash);
    key
}

/// Inclusive key bounds covering every token of `user`.
pub fn user_token_bounds(user: UserId) -> ([u8; 40], [u8; 40]) {
    let prefix = user.value().to_be_bytes();
    let mut lo = [0u8; 40];
    let mut hi = [0xFFu8; 40];
    lo[..8].copy_from_slice(&prefix);
    hi[..8].copy_from_slice(&prefix);
    (lo, hi)
}

/// Family index key: `{family:16}{token_hash:32}`.
pub fn family_token_key(family: &FamilyId, hash: &TokenHash) -> [u8; 48] {
    let mut key = [0u8; 48];
    key[..16].copy_from_slice(family.as_bytes());
    key[16..].copy_from_slice(hash);
    key
}

/// Inclusive key bounds covering every token of `family`.
pub fn family_token_bounds(family: &FamilyId) -> ([u8; 48], [u8; 48]) {
    let mut lo = [0u8; 48];
    let mut hi = [0xFFu8; 48];
    lo[..16].copy_from_slice(family.as_bytes());
    hi[..16].copy_from_slice(family.as_bytes());
    (lo, hi)
}

/// Expiry index key: `{expires_at:8}{token_hash:32}`.
pub fn expiry_key(expires_at: DateTime<Utc>, hash: &TokenHash) -> [u8; 40] {
    let mut key = [0u8; 40];
    key[..TIMESTAMP_LEN].copy_from_slice(&encode_timestamp(expires_at));
    key[TIMESTAMP_LEN..].copy_from_slice(hash);
    key
}

/// Upper bound (inclusive) of expiry keys for tokens with `expires_at <= now`.
pub fn expiry_upper_bound(now: DateTime<Utc>) -> [u8; 40] {
    let mut key = [0xFFu8; 40];
    key[..TIMESTAMP_LEN].copy_from_slice(&encode_timestamp(now));
    key
}

/// Extracts the trailing token hash from a user, family, or expiry index key.
pub fn trailing_token_hash(key: &[u8]) -> Option<TokenHash> {
    let start = key.len().checked_sub(TOKEN_HASH_LEN)?;
    key[start..].try_into().ok()
}
