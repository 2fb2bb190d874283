//! Refresh token session manager.
//!
//! Issues, rotates, and revokes long-lived refresh tokens. Tokens descended
//! from one login form a family; presenting a token that was already rotated
//! is treated as theft and revokes the whole family.
//!
//! Secrets are 32 random bytes, base64url-encoded without padding. Only their
//! SHA-256 is stored. Each rotation runs in one write transaction, and redb
//! serializes writers, so of two concurrent rotations of the same token the
//! second one observes `is_used` and takes the reuse path.

use std::time::Instant;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use campus_ledger_storage::{RefreshTokenStore, StorageEngine, StorageError, WriteTransaction};
use campus_ledger_types::config::SessionConfig;
use campus_ledger_types::validation::sanitize_device_field;
use campus_ledger_types::{
    DeviceMeta, ErrorCode, FamilyId, IssuedToken, RefreshToken, SessionInfo, TokenHash,
    TokenState, UserId, sha256, short_hex,
};
use chrono::{DateTime, SubsecRound, Utc};
use rand::RngCore;
use snafu::{Location, ResultExt, Snafu};
use tracing::{debug, info, warn};

use crate::metrics;

/// Length of a refresh-token secret in bytes.
pub const SECRET_LEN: usize = 32;

/// Session manager error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SessionError {
    /// The presented token is unknown or malformed.
    #[snafu(display("Refresh token not found"))]
    TokenNotFound,

    /// The presented token exists but is revoked or expired.
    #[snafu(display("Refresh token is {state}"))]
    TokenInvalid { state: TokenState },

    /// An already rotated token was presented again. The family has been
    /// revoked by the time this is returned.
    #[snafu(display("Refresh token reuse detected for {user} in {family}"))]
    TokenReuseDetected { user: UserId, family: FamilyId },

    /// Underlying storage failure.
    #[snafu(display("Storage error: {source}"))]
    Storage {
        source: StorageError,
        #[snafu(implicit)]
        location: Location,
    },
}

impl SessionError {
    /// Returns the machine-readable error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::TokenNotFound => ErrorCode::SessionTokenNotFound,
            Self::TokenInvalid { .. } => ErrorCode::SessionTokenInvalid,
            Self::TokenReuseDetected { .. } => ErrorCode::SessionTokenReuseDetected,
            Self::Storage { source, .. } => source.code(),
        }
    }
}

/// Result type for session operations.
pub type Result<T, E = SessionError> = std::result::Result<T, E>;

/// The refresh token session manager.
///
/// Cheap to clone; clones share the underlying database.
#[derive(Clone)]
pub struct SessionManager {
    engine: StorageEngine,
    config: SessionConfig,
}

impl SessionManager {
    /// Creates a session manager over `engine`.
    pub fn new(engine: StorageEngine, config: SessionConfig) -> Self {
        Self { engine, config }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Issues a token in a fresh family. Called by the front door on login.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] on storage failure.
    pub fn issue(&self, user: UserId, device: DeviceMeta) -> Result<IssuedToken> {
        self.issue_at(user, device, Utc::now())
    }

    /// [`Self::issue`] with an explicit clock reading.
    ///
    /// # Errors
    ///
    /// See [`Self::issue`].
    pub fn issue_at(
        &self,
        user: UserId,
        device: DeviceMeta,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken> {
        let txn = self.engine.begin_write().context(StorageSnafu)?;
        let family = FamilyId::generate();
        let (issued, _) = self.mint(&txn, user, family, sanitize_device(device), now)?;
        StorageEngine::commit(txn).context(StorageSnafu)?;

        metrics::record_token_issued();
        info!(user = %user, family = %family, "Issued refresh token");
        Ok(issued)
    }

    /// Exchanges a token for its successor in the same family.
    ///
    /// Client metadata on the successor comes from `device`, falling back
    /// field by field to the presented token's metadata.
    ///
    /// # Errors
    ///
    /// - [`SessionError::TokenNotFound`] if the token is unknown or malformed
    /// - [`SessionError::TokenReuseDetected`] if the token was already rotated;
    ///   every token of the family is revoked first
    /// - [`SessionError::TokenInvalid`] if the token is revoked or expired
    pub fn rotate(&self, presented: &str, device: DeviceMeta) -> Result<IssuedToken> {
        self.rotate_at(presented, device, Utc::now())
    }

    /// [`Self::rotate`] with an explicit clock reading.
    ///
    /// # Errors
    ///
    /// See [`Self::rotate`].
    pub fn rotate_at(
        &self,
        presented: &str,
        device: DeviceMeta,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken> {
        let start = Instant::now();
        let result = self.try_rotate(presented, device, now);
        metrics::record_token_rotated(result.is_ok(), start.elapsed().as_secs_f64());
        result
    }

    fn try_rotate(
        &self,
        presented: &str,
        device: DeviceMeta,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken> {
        let hash = parse_token(presented).ok_or(SessionError::TokenNotFound)?;

        let txn = self.engine.begin_write().context(StorageSnafu)?;
        let Some(mut token) = RefreshTokenStore::get(&txn, &hash).context(StorageSnafu)? else {
            metrics::record_token_rejected("not_found");
            return Err(SessionError::TokenNotFound);
        };

        match token.state(now) {
            TokenState::Rotated => {
                let revoked = revoke_family_in(&txn, &token.family)?;
                StorageEngine::commit(txn).context(StorageSnafu)?;

                metrics::record_token_reuse_detected();
                metrics::record_tokens_revoked("reuse", revoked);
                warn!(
                    user = %token.user,
                    family = %token.family,
                    token = %short_hex(&hash),
                    revoked,
                    "Refresh token reuse detected, family revoked"
                );
                return Err(SessionError::TokenReuseDetected {
                    user: token.user,
                    family: token.family,
                });
            },
            state @ (TokenState::Revoked | TokenState::Expired) => {
                metrics::record_token_rejected(state_label(state));
                debug!(user = %token.user, token = %short_hex(&hash), %state, "Rotation rejected");
                return Err(SessionError::TokenInvalid { state });
            },
            TokenState::Active => {},
        }

        let device = DeviceMeta {
            user_agent: sanitize_device_field(device.user_agent)
                .or_else(|| token.device.user_agent.clone()),
            ip_address: sanitize_device_field(device.ip_address)
                .or_else(|| token.device.ip_address.clone()),
        };
        let (issued, successor) = self.mint(&txn, token.user, token.family, device, now)?;

        token.is_used = true;
        token.used_at = Some(now);
        token.replaced_by = Some(successor);
        RefreshTokenStore::put(&txn, &token).context(StorageSnafu)?;
        StorageEngine::commit(txn).context(StorageSnafu)?;

        debug!(user = %token.user, family = %token.family, "Rotated refresh token");
        Ok(issued)
    }

    /// Checks a token without changing any state.
    ///
    /// A rotated token reports [`SessionError::TokenInvalid`] here; reuse
    /// handling only happens in [`Self::rotate`].
    ///
    /// # Errors
    ///
    /// - [`SessionError::TokenNotFound`] if the token is unknown or malformed
    /// - [`SessionError::TokenInvalid`] if the token is not active
    pub fn validate(&self, presented: &str) -> Result<RefreshToken> {
        self.validate_at(presented, Utc::now())
    }

    /// [`Self::validate`] with an explicit clock reading.
    ///
    /// # Errors
    ///
    /// See [`Self::validate`].
    pub fn validate_at(&self, presented: &str, now: DateTime<Utc>) -> Result<RefreshToken> {
        let hash = parse_token(presented).ok_or(SessionError::TokenNotFound)?;
        let txn = self.engine.begin_read().context(StorageSnafu)?;
        let token = RefreshTokenStore::get(&txn, &hash)
            .context(StorageSnafu)?
            .ok_or(SessionError::TokenNotFound)?;

        match token.state(now) {
            TokenState::Active => Ok(token),
            state => Err(SessionError::TokenInvalid { state }),
        }
    }

    /// Revokes a single token (logout of one session). Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::TokenNotFound`] if the token is unknown.
    pub fn revoke(&self, presented: &str) -> Result<()> {
        let hash = parse_token(presented).ok_or(SessionError::TokenNotFound)?;
        let txn = self.engine.begin_write().context(StorageSnafu)?;
        let mut token = RefreshTokenStore::get(&txn, &hash)
            .context(StorageSnafu)?
            .ok_or(SessionError::TokenNotFound)?;

        if token.is_revoked {
            return Ok(());
        }
        token.is_revoked = true;
        RefreshTokenStore::put(&txn, &token).context(StorageSnafu)?;
        StorageEngine::commit(txn).context(StorageSnafu)?;

        metrics::record_tokens_revoked("logout", 1);
        info!(user = %token.user, family = %token.family, "Revoked refresh token");
        Ok(())
    }

    /// Revokes every token owned by `user`.
    ///
    /// Returns the number of tokens that were not already revoked.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] on storage failure.
    pub fn revoke_all_user_tokens(&self, user: UserId) -> Result<usize> {
        let txn = self.engine.begin_write().context(StorageSnafu)?;
        let hashes = RefreshTokenStore::hashes_by_user(&txn, user).context(StorageSnafu)?;
        let revoked = revoke_hashes_in(&txn, &hashes)?;
        StorageEngine::commit(txn).context(StorageSnafu)?;

        metrics::record_tokens_revoked("logout_all", revoked);
        info!(user = %user, revoked, "Revoked all refresh tokens for user");
        Ok(revoked)
    }

    /// Revokes every token in `family`.
    ///
    /// Returns the number of tokens that were not already revoked.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] on storage failure.
    pub fn revoke_token_family(&self, family: &FamilyId) -> Result<usize> {
        let txn = self.engine.begin_write().context(StorageSnafu)?;
        let revoked = revoke_family_in(&txn, family)?;
        StorageEngine::commit(txn).context(StorageSnafu)?;

        metrics::record_tokens_revoked("family", revoked);
        info!(family = %family, revoked, "Revoked refresh token family");
        Ok(revoked)
    }

    /// Lists the active sessions of `user`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] on storage failure.
    pub fn list_active_sessions(&self, user: UserId) -> Result<Vec<SessionInfo>> {
        self.list_active_sessions_at(user, Utc::now())
    }

    /// [`Self::list_active_sessions`] with an explicit clock reading.
    ///
    /// # Errors
    ///
    /// See [`Self::list_active_sessions`].
    pub fn list_active_sessions_at(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionInfo>> {
        let txn = self.engine.begin_read().context(StorageSnafu)?;
        let mut active: Vec<RefreshToken> = RefreshTokenStore::list_by_user(&txn, user)
            .context(StorageSnafu)?
            .into_iter()
            .filter(|t| t.state(now) == TokenState::Active)
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(active.iter().map(SessionInfo::from).collect())
    }

    /// Mints a token in `family` inside `txn`, returning it with its hash.
    fn mint(
        &self,
        txn: &WriteTransaction,
        user: UserId,
        family: FamilyId,
        device: DeviceMeta,
        now: DateTime<Utc>,
    ) -> Result<(IssuedToken, TokenHash)> {
        let mut secret = [0u8; SECRET_LEN];
        rand::rng().fill_bytes(&mut secret);

        // The expiry index has microsecond resolution; storing the same
        // precision keeps index order and `is_expired` in agreement.
        let expires_at = (now + self.config.token_ttl_chrono()).trunc_subsecs(6);
        let token_hash = sha256(&secret);
        let token = RefreshToken {
            user,
            token_hash,
            family,
            created_at: now,
            expires_at,
            is_revoked: false,
            is_used: false,
            used_at: None,
            replaced_by: None,
            device,
        };
        RefreshTokenStore::insert(txn, &token).context(StorageSnafu)?;

        Ok((IssuedToken { token: URL_SAFE_NO_PAD.encode(secret), family, expires_at }, token_hash))
    }
}

/// Decodes a presented token into its lookup hash.
///
/// Returns `None` for anything that is not base64url of exactly
/// [`SECRET_LEN`] bytes.
fn parse_token(presented: &str) -> Option<TokenHash> {
    let secret = URL_SAFE_NO_PAD.decode(presented.trim()).ok()?;
    (secret.len() == SECRET_LEN).then(|| sha256(&secret))
}

fn sanitize_device(device: DeviceMeta) -> DeviceMeta {
    DeviceMeta {
        user_agent: sanitize_device_field(device.user_agent),
        ip_address: sanitize_device_field(device.ip_address),
    }
}

fn revoke_family_in(txn: &WriteTransaction, family: &FamilyId) -> Result<usize> {
    let hashes = RefreshTokenStore::hashes_by_family(txn, family).context(StorageSnafu)?;
    revoke_hashes_in(txn, &hashes)
}

fn revoke_hashes_in(txn: &WriteTransaction, hashes: &[TokenHash]) -> Result<usize> {
    let mut revoked = 0;
    for hash in hashes {
        let Some(mut token) = RefreshTokenStore::get(txn, hash).context(StorageSnafu)? else {
            continue;
        };
        if token.is_revoked {
            continue;
        }
        token.is_revoked = true;
        RefreshTokenStore::put(txn, &token).context(StorageSnafu)?;
        revoked += 1;
    }
    Ok(revoked)
}

const fn state_label(state: TokenState) -> &'static str {
    match state {
        TokenState::Active => "active",
        TokenState::Rotated => "rotated",
        TokenState::Revoked => "revoked",
        TokenState::Expired => "expired",
    }
}
