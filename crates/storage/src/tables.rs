//! Table definitions for redb storage.
//!
//! Record tables hold postcard-encoded values. Index tables carry all of
//! their information in the key and store `()`. Key encoding is handled by
//! the keys module.

use redb::TableDefinition;

/// Table definitions for ledger storage.
pub struct Tables;

impl Tables {
    // =========================================================================
    // Referral Tables
    // =========================================================================

    /// Student records: student_id → serialized Student
    pub const STUDENTS: TableDefinition<'static, u64, &'static [u8]> =
        TableDefinition::new("students");

    /// Referral code ownership: normalized code → student_id
    /// Enforces code uniqueness.
    pub const REFERRAL_CODES: TableDefinition<'static, &'static str, u64> =
        TableDefinition::new("referral_codes");

    /// Referral records: referee student_id → serialized ReferralRecord
    /// One row per referee enforces "at most one code per student".
    pub const REFERRALS: TableDefinition<'static, u64, &'static [u8]> =
        TableDefinition::new("referrals");

    /// Referrer listing index: {referrer:8BE}{created_at:8BE}{referee:8BE} → ()
    pub const REFERRALS_BY_REFERRER: TableDefinition<'static, &'static [u8], ()> =
        TableDefinition::new("referrals_by_referrer");

    // =========================================================================
    // Session Tables
    // =========================================================================

    /// Refresh tokens: sha256(secret) → serialized RefreshToken
    pub const REFRESH_TOKENS: TableDefinition<'static, &'static [u8], &'static [u8]> =
        TableDefinition::new("refresh_tokens");

    /// Tokens per user: {user:8BE}{token_hash:32} → ()
    pub const TOKENS_BY_USER: TableDefinition<'static, &'static [u8], ()> =
        TableDefinition::new("tokens_by_user");

    /// Tokens per family: {family:16}{token_hash:32} → ()
    pub const TOKENS_BY_FAMILY: TableDefinition<'static, &'static [u8], ()> =
        TableDefinition::new("tokens_by_family");

    /// Expiry index: {expires_at:8BE}{token_hash:32} → ()
    /// Scanned in key order by the expiry sweep.
    pub const TOKENS_BY_EXPIRY: TableDefinition<'static, &'static [u8], ()> =
        TableDefinition::new("tokens_by_expiry");

    // =========================================================================
    // Metadata Tables
    // =========================================================================

    /// Named monotonic sequences: name → last allocated value
    pub const SEQUENCES: TableDefinition<'static, &'static str, u64> =
        TableDefinition::new("sequences");
}
