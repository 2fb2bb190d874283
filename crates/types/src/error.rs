//! Machine-readable error codes for the Campus ledger.
//!
//! Error enums live next to the code that raises them (storage errors in the
//! storage crate, referral and session errors in the state crate). Every
//! variant maps to one [`ErrorCode`] here, so callers and HTTP clients get a
//! stable numeric identifier, a retryability flag and a recovery hint
//! regardless of which layer failed.

use core::fmt;

/// Machine-readable error codes for programmatic error handling.
///
/// Codes are organized into ranges:
///
/// | Range       | Domain      | Examples                                   |
/// |-------------|-------------|--------------------------------------------|
/// | 1000–1099   | Storage     | Database open, transaction, table, codec   |
/// | 3000–3099   | Referral    | Invalid code, self referral, already used  |
/// | 3100–3199   | Session     | Token not found, invalid, reuse detected   |
/// | 3200–3299   | Application | Invalid argument, config, internal         |
///
/// # Wire Format
///
/// Codes are rendered as their numeric value (e.g., `"3102"`) in the `code`
/// field of error response bodies. Use [`ErrorCode::as_u16`] for
/// serialization and [`ErrorCode::from_u16`] for deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // --- Storage errors (1000–1099) ---
    /// Database file could not be opened or created.
    StorageDatabaseOpen = 1000,
    /// Transaction begin or commit failed.
    StorageTransaction = 1001,
    /// Table open or table operation failed.
    StorageTableOperation = 1002,
    /// Stored record could not be encoded or decoded.
    StorageCodec = 1003,

    // --- Referral errors (3000–3099) ---
    /// No student owns the presented referral code.
    ReferralInvalidCode = 3000,
    /// The presented code belongs to the applying student.
    ReferralSelfReferral = 3001,
    /// The applying student already used a referral code.
    ReferralAlreadyReferred = 3002,
    /// Student does not exist.
    ReferralStudentNotFound = 3003,
    /// Student was never referred, so there is no record to act on.
    ReferralNotFound = 3004,

    // --- Session errors (3100–3199) ---
    /// No stored token matches the presented secret.
    SessionTokenNotFound = 3100,
    /// Token is revoked or expired.
    SessionTokenInvalid = 3101,
    /// An already-rotated token was presented again.
    SessionTokenReuseDetected = 3102,

    // --- Application errors (3200–3299) ---
    /// Invalid request argument.
    AppInvalidArgument = 3200,
    /// Configuration error.
    AppConfig = 3201,
    /// Internal error (unexpected state, invariant violation).
    AppInternal = 3202,
    /// Caller identity missing or malformed.
    AppUnauthenticated = 3203,
    /// No route matches the request.
    AppNotFound = 3204,
}

impl ErrorCode {
    /// Returns the numeric code value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Converts a numeric code to an `ErrorCode`, returning `None` for unknown values.
    #[must_use]
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            1000 => Some(Self::StorageDatabaseOpen),
            1001 => Some(Self::StorageTransaction),
            1002 => Some(Self::StorageTableOperation),
            1003 => Some(Self::StorageCodec),
            3000 => Some(Self::ReferralInvalidCode),
            3001 => Some(Self::ReferralSelfReferral),
            3002 => Some(Self::ReferralAlreadyReferred),
            3003 => Some(Self::ReferralStudentNotFound),
            3004 => Some(Self::ReferralNotFound),
            3100 => Some(Self::SessionTokenNotFound),
            3101 => Some(Self::SessionTokenInvalid),
            3102 => Some(Self::SessionTokenReuseDetected),
            3200 => Some(Self::AppInvalidArgument),
            3201 => Some(Self::AppConfig),
            3202 => Some(Self::AppInternal),
            3203 => Some(Self::AppUnauthenticated),
            3204 => Some(Self::AppNotFound),
            _ => None,
        }
    }

    /// Whether this error is retryable.
    ///
    /// Only transient storage failures qualify. Every referral and session
    /// error is a final answer: in particular a reuse detection has already
    /// revoked the token family and must never be retried.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::StorageTransaction)
    }

    /// Whether the error terminates every session of the affected user.
    #[must_use]
    pub const fn is_session_termination(self) -> bool {
        matches!(self, Self::SessionTokenReuseDetected)
    }

    /// Suggested recovery action for this error code.
    ///
    /// Stable, human-readable guidance that is safe to display in UIs or log
    /// to operator dashboards.
    #[must_use]
    pub const fn suggested_action(self) -> &'static str {
        match self {
            Self::StorageDatabaseOpen => {
                "Verify the data directory exists with correct permissions and is not locked by another process."
            },
            Self::StorageTransaction => {
                "Retry the request. Write transactions are serialized and may be briefly unavailable."
            },
            Self::StorageTableOperation => {
                "Check database health. Restore from backup if the file is damaged."
            },
            Self::StorageCodec => {
                "Stored record could not be decoded. Report as an issue with the record key."
            },
            Self::ReferralInvalidCode => "Check the referral code for typos and try again.",
            Self::ReferralSelfReferral => "Ask another student for their referral code.",
            Self::ReferralAlreadyReferred => {
                "Not recoverable. A student may apply only one referral code."
            },
            Self::ReferralStudentNotFound => "Verify the student identifier.",
            Self::ReferralNotFound => "The student was never referred; nothing to credit.",
            Self::SessionTokenNotFound | Self::SessionTokenInvalid => {
                "Sign in again to obtain a new session."
            },
            Self::SessionTokenReuseDetected => {
                "All sessions were terminated. Sign in again and review account security."
            },
            Self::AppInvalidArgument => "Fix the request parameters and resubmit.",
            Self::AppConfig => "Fix the configuration value and restart the server.",
            Self::AppInternal => {
                "Unexpected state or invariant violation. Collect context and report as an issue."
            },
            Self::AppUnauthenticated => "Authenticate through the front door and retry.",
            Self::AppNotFound => "Check the request method and path.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}
