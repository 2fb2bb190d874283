//! Core type definitions for the Campus ledger.
//!
//! - Identifier types (StudentId, UserId, FamilyId)
//! - Stored records (Student, ReferralRecord, RefreshToken)
//! - Read projections (ReferralInfo, SessionInfo, IssuedToken)

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::Hash;

// ============================================================================
// Identifier Types
// ============================================================================

/// Generates a newtype wrapper around a numeric type for type-safe identifiers.
///
/// Each generated type provides:
/// - Standard derives: Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord
/// - Serde with `#[serde(transparent)]` for wire format compatibility
/// - `From<inner>` and `Into<inner>` conversions
/// - `Display` with a semantic prefix (e.g., `student:123`)
/// - `new()` constructor and `value()` accessor
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident, $inner:ty, $prefix:expr
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Creates a new identifier from a raw value.
            #[inline]
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// Returns the raw numeric value.
            #[inline]
            pub const fn value(self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            #[inline]
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $inner {
            #[inline]
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", $prefix, self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = <$inner as std::str::FromStr>::Err;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                s.parse::<$inner>().map(Self)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a student enrolled in the LMS.
    ///
    /// Allocated from a persistent sequence when the student registers.
    ///
    /// # Display
    ///
    /// Formats with `student:` prefix: `student:42`.
    StudentId, u64, "student"
);

define_id!(
    /// Identifier of the account that owns a refresh token.
    ///
    /// Issued by the authentication front door; the ledger treats it as opaque.
    ///
    /// # Display
    ///
    /// Formats with `user:` prefix: `user:7`.
    UserId, u64, "user"
);

/// Token family identifier (UUIDv4).
///
/// A family is the chain of tokens descended from one login via rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FamilyId(Uuid);

impl FamilyId {
    /// Generates a fresh random family identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps raw UUID bytes, as stored in index keys.
    #[inline]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Returns the raw 16 bytes used in index keys.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl fmt::Display for FamilyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "family:{}", self.0)
    }
}

/// SHA-256 digest of a refresh-token secret; the primary key of a token.
pub type TokenHash = Hash;

// ============================================================================
// Referral Records
// ============================================================================

/// A student as seen by the referral ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Student identifier.
    pub id: StudentId,
    /// Display name shown in referral listings.
    pub name: String,
    /// This student's own referral code (unique across students).
    pub referral_code: String,
    /// Code this student applied, if any. Set at most once, never cleared.
    pub referred_by: Option<String>,
    /// Number of students who applied this student's code.
    pub referral_count: u32,
    /// Premium flag. Set to true at most once and never reset.
    pub is_premium_unlocked: bool,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl Student {
    /// Whether this student has already applied a referral code.
    #[inline]
    pub fn has_been_referred(&self) -> bool {
        self.referred_by.is_some()
    }
}

/// One successful referral-code application.
///
/// Keyed by referee: a student appears as referee in at most one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralRecord {
    /// Owner of the applied code.
    pub referrer: StudentId,
    /// Student who applied the code.
    pub referee: StudentId,
    /// Code as it was applied.
    pub referral_code: String,
    /// Whether the referrer has been credited for this referral.
    pub credited: bool,
    /// Time of application.
    pub created_at: DateTime<Utc>,
}

/// One entry in a referrer's referral listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralEntry {
    /// Name of the referred student.
    pub referee_name: String,
    /// When the referee applied the code.
    pub joined_at: DateTime<Utc>,
    /// Whether the referral has been credited.
    pub credited: bool,
}

/// Read-only projection of a student's referral standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralInfo {
    /// The student's own code.
    pub referral_code: String,
    /// Number of successful referrals.
    pub referral_count: u32,
    /// Premium flag.
    pub is_premium_unlocked: bool,
    /// Referrals, most recent first.
    pub referrals: Vec<ReferralEntry>,
}

// ============================================================================
// Refresh Tokens
// ============================================================================

/// Client metadata captured when a token is minted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMeta {
    /// `User-Agent` header of the client.
    pub user_agent: Option<String>,
    /// Client IP address as reported by the front door.
    pub ip_address: Option<String>,
}

/// Lifecycle state of a refresh token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenState {
    /// Issued, unused, unrevoked, unexpired.
    Active,
    /// Exchanged for a successor. Terminal.
    Rotated,
    /// Revoked by logout, password reset, or reuse detection. Terminal.
    Revoked,
    /// Past `expires_at`. Derived from time at read, never stored.
    Expired,
}

impl fmt::Display for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Rotated => "rotated",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// A stored refresh token. The secret itself is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    /// Owning account.
    pub user: UserId,
    /// SHA-256 of the secret.
    pub token_hash: TokenHash,
    /// Rotation chain this token belongs to.
    pub family: FamilyId,
    /// Mint time.
    pub created_at: DateTime<Utc>,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
    /// Set on logout, password reset, or reuse detection.
    pub is_revoked: bool,
    /// Set exactly once, when the token is rotated.
    pub is_used: bool,
    /// Rotation time.
    pub used_at: Option<DateTime<Utc>>,
    /// Hash of the successor minted by rotation.
    pub replaced_by: Option<TokenHash>,
    /// Client metadata.
    pub device: DeviceMeta,
}

impl RefreshToken {
    /// Whether the token is past its expiry at `now`.
    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Lifecycle state at `now`.
    ///
    /// Rotation takes precedence over revocation: a used token that was later
    /// revoked along with its family still reports `Rotated`, which is what
    /// routes a second presentation into reuse handling.
    pub fn state(&self, now: DateTime<Utc>) -> TokenState {
        if self.is_used {
            TokenState::Rotated
        } else if self.is_revoked {
            TokenState::Revoked
        } else if self.is_expired(now) {
            TokenState::Expired
        } else {
            TokenState::Active
        }
    }
}

/// A freshly minted token as handed back to the caller.
///
/// Holds the plaintext secret; `Debug` redacts it.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    /// Opaque secret (base64url, no padding).
    pub token: String,
    /// Family the token belongs to.
    pub family: FamilyId,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"<redacted>")
            .field("family", &self.family)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// An active session as listed to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Family of the current token.
    pub family: FamilyId,
    /// When the current token was minted.
    pub created_at: DateTime<Utc>,
    /// When the current token expires.
    pub expires_at: DateTime<Utc>,
    /// Client user agent.
    pub user_agent: Option<String>,
    /// Client IP address.
    pub ip_address: Option<String>,
}

impl From<&RefreshToken> for SessionInfo {
    fn from(token: &RefreshToken) -> Self {
        Self {
            family: token.family,
            created_at: token.created_at,
            expires_at: token.expires_at,
            user_agent: token.device.user_agent.clone(),
            ip_address: token.device.ip_address.clone(),
        }
    }
}
