//! Refresh token storage.
//!
//! Tokens are keyed by the SHA-256 of their secret. Three secondary indexes
//! (user, family, expiry) are maintained alongside every insert and delete.

use campus_ledger_types::{FamilyId, RefreshToken, TokenHash, UserId, decode, encode};
use chrono::{DateTime, Utc};
use redb::{ReadableTable, WriteTransaction};
use snafu::ResultExt;

use crate::engine::ReadScope;
use crate::error::{CodecSnafu, Result, StorageSnafu, TableSnafu};
use crate::keys::{
    expiry_key, expiry_upper_bound, family_token_bounds, family_token_key, trailing_token_hash,
    user_token_bounds, user_token_key,
};
use crate::tables::Tables;

/// Refresh token storage operations.
pub struct RefreshTokenStore;

impl RefreshTokenStore {
    /// Gets a token by the hash of its secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the record cannot be decoded.
    pub fn get(txn: &impl ReadScope, hash: &TokenHash) -> Result<Option<RefreshToken>> {
        let table = txn.open_readable(Tables::REFRESH_TOKENS)?;
        match table.get(hash.as_slice()).context(StorageSnafu)? {
            Some(data) => Ok(Some(decode(data.value()).context(CodecSnafu)?)),
            None => Ok(None),
        }
    }

    /// Inserts a new token and all of its index entries.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or any write fails.
    pub fn insert(txn: &WriteTransaction, token: &RefreshToken) -> Result<()> {
        Self::put(txn, token)?;

        let hash = &token.token_hash;
        {
            let mut by_user = txn.open_table(Tables::TOKENS_BY_USER).context(TableSnafu)?;
            by_user
                .insert(user_token_key(token.user, hash).as_slice(), ())
                .context(StorageSnafu)?;
        }
        {
            let mut by_family = txn.open_table(Tables::TOKENS_BY_FAMILY).context(TableSnafu)?;
            by_family
                .insert(family_token_key(&token.family, hash).as_slice(), ())
                .context(StorageSnafu)?;
        }
        {
            let mut by_expiry = txn.open_table(Tables::TOKENS_BY_EXPIRY).context(TableSnafu)?;
            by_expiry
                .insert(expiry_key(token.expires_at, hash).as_slice(), ())
                .context(StorageSnafu)?;
        }
        Ok(())
    }

    /// Overwrites a token record. Owner, family, and expiry must not change.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    pub fn put(txn: &WriteTransaction, token: &RefreshToken) -> Result<()> {
        let encoded = encode(token).context(CodecSnafu)?;
        let mut table = txn.open_table(Tables::REFRESH_TOKENS).context(TableSnafu)?;
        table.insert(token.token_hash.as_slice(), encoded.as_slice()).context(StorageSnafu)?;
        Ok(())
    }

    /// Deletes a token and its index entries.
    ///
    /// Returns `false` if no token with this hash exists.
    ///
    /// # Errors
    ///
    /// Returns an error if any read or write fails.
    pub fn delete(txn: &WriteTransaction, hash: &TokenHash) -> Result<bool> {
        let Some(token) = Self::get(txn, hash)? else {
            return Ok(false);
        };

        {
            let mut table = txn.open_table(Tables::REFRESH_TOKENS).context(TableSnafu)?;
            table.remove(hash.as_slice()).context(StorageSnafu)?;
        }
        {
            let mut by_user = txn.open_table(Tables::TOKENS_BY_USER).context(TableSnafu)?;
            by_user.remove(user_token_key(token.user, hash).as_slice()).context(StorageSnafu)?;
        }
        {
            let mut by_family = txn.open_table(Tables::TOKENS_BY_FAMILY).context(TableSnafu)?;
            by_family
                .remove(family_token_key(&token.family, hash).as_slice())
                .context(StorageSnafu)?;
        }
        {
            let mut by_expiry = txn.open_table(Tables::TOKENS_BY_EXPIRY).context(TableSnafu)?;
            by_expiry
                .remove(expiry_key(token.expires_at, hash).as_slice())
                .context(StorageSnafu)?;
        }
        Ok(true)
    }

    /// Hashes of every token owned by `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index read fails.
    pub fn hashes_by_user(txn: &impl ReadScope, user: UserId) -> Result<Vec<TokenHash>> {
        let index = txn.open_readable(Tables::TOKENS_BY_USER)?;
        let (lo, hi) = user_token_bounds(user);
        let mut hashes = Vec::new();
        for entry in index.range(lo.as_slice()..=hi.as_slice()).context(StorageSnafu)? {
            let (key, _) = entry.context(StorageSnafu)?;
            if let Some(hash) = trailing_token_hash(key.value()) {
                hashes.push(hash);
            }
        }
        Ok(hashes)
    }

    /// Hashes of every token in `family`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index read fails.
    pub fn hashes_by_family(txn: &impl ReadScope, family: &FamilyId) -> Result<Vec<TokenHash>> {
        let index = txn.open_readable(Tables::TOKENS_BY_FAMILY)?;
        let (lo, hi) = family_token_bounds(family);
        let mut hashes = Vec::new();
        for entry in index.range(lo.as_slice()..=hi.as_slice()).context(StorageSnafu)? {
            let (key, _) = entry.context(StorageSnafu)?;
            if let Some(hash) = trailing_token_hash(key.value()) {
                hashes.push(hash);
            }
        }
        Ok(hashes)
    }

    /// Tokens owned by `user`, decoded.
    ///
    /// # Errors
    ///
    /// Returns an error if any read fails or a record cannot be decoded.
    pub fn list_by_user(txn: &impl ReadScope, user: UserId) -> Result<Vec<RefreshToken>> {
        let hashes = Self::hashes_by_user(txn, user)?;
        let mut tokens = Vec::with_capacity(hashes.len());
        for hash in &hashes {
            if let Some(token) = Self::get(txn, hash)? {
                tokens.push(token);
            }
        }
        Ok(tokens)
    }

    /// Hashes of up to `limit` tokens with `expires_at <= now`, earliest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the index read fails.
    pub fn expired_hashes(
        txn: &impl ReadScope,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TokenHash>> {
        let index = txn.open_readable(Tables::TOKENS_BY_EXPIRY)?;
        let upper = expiry_upper_bound(now);
        let mut hashes = Vec::new();
        for entry in index.range(..=upper.as_slice()).context(StorageSnafu)? {
            if hashes.len() >= limit {
                break;
            }
            let (key, _) = entry.context(StorageSnafu)?;
            if let Some(hash) = trailing_token_hash(key.value()) {
                hashes.push(hash);
            }
        }
        Ok(hashes)
    }

    /// Total number of stored tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn count(txn: &impl ReadScope) -> Result<u64> {
        use redb::ReadableTableMetadata;

        let table = txn.open_readable(Tables::REFRESH_TOKENS)?;
        table.len().context(StorageSnafu)
    }
}
