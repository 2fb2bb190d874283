//! Request and response bodies.
//!
//! All JSON field names are camelCase. Request bodies implement
//! [`Validate`](super::extract::Validate) and are checked before any ledger
//! call.

use campus_ledger_types::validation::{ValidationError, validate_student_name};
use campus_ledger_types::{FamilyId, IssuedToken, ReferralRecord, Student};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::extract::Validate;

/// Success envelope: `{ success: true, message?, data? }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always `true`.
    pub success: bool,
    /// Optional human-readable message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Optional payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Envelope carrying `data`.
    pub fn data(data: T) -> Self {
        Self { success: true, message: None, data: Some(data) }
    }

    /// Envelope carrying a message and `data`.
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self { success: true, message: Some(message.into()), data: Some(data) }
    }
}

impl ApiResponse<()> {
    /// Envelope with neither message nor data.
    pub fn ok() -> Self {
        Self { success: true, message: None, data: None }
    }

    /// Envelope with only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self { success: true, message: Some(message.into()), data: None }
    }
}

fn require_non_blank(field: &str, value: &str) -> Option<ValidationError> {
    value.trim().is_empty().then(|| ValidationError::new(field, "must not be empty"))
}

fn require_positive(field: &str, value: u64) -> Option<ValidationError> {
    (value == 0).then(|| ValidationError::new(field, "must be a positive integer"))
}

fn collect(errors: impl IntoIterator<Item = Option<ValidationError>>) -> Result<(), Vec<ValidationError>> {
    let errors: Vec<_> = errors.into_iter().flatten().collect();
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

// ============================================================================
// Requests
// ============================================================================

/// `POST /students`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStudentRequest {
    pub name: String,
}

impl Validate for RegisterStudentRequest {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        validate_student_name(&self.name).map_err(|e| vec![e])
    }
}

/// `POST /referral/apply`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReferralRequest {
    pub code: String,
}

impl Validate for ApplyReferralRequest {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        collect([require_non_blank("code", &self.code)])
    }
}

/// `POST /auth/sessions`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueSessionRequest {
    pub user_id: u64,
}

impl Validate for IssueSessionRequest {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        collect([require_positive("userId", self.user_id)])
    }
}

/// `POST /auth/refresh` and `POST /auth/logout`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

impl Validate for RefreshTokenRequest {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        collect([require_non_blank("refreshToken", &self.refresh_token)])
    }
}

/// `POST /auth/logout-all`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutAllRequest {
    pub user_id: u64,
}

impl Validate for LogoutAllRequest {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        collect([require_positive("userId", self.user_id)])
    }
}

// ============================================================================
// Responses
// ============================================================================

/// A student as returned by the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResponse {
    pub id: u64,
    pub name: String,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub referral_count: u32,
    pub is_premium_unlocked: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Student> for StudentResponse {
    fn from(student: Student) -> Self {
        Self {
            id: student.id.value(),
            name: student.name,
            referral_code: student.referral_code,
            referred_by: student.referred_by,
            referral_count: student.referral_count,
            is_premium_unlocked: student.is_premium_unlocked,
            created_at: student.created_at,
        }
    }
}

/// Result of applying a referral code.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReferralResponse {
    pub is_premium_unlocked: bool,
}

/// A referral record as returned by the credit endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralRecordResponse {
    pub referrer_id: u64,
    pub referee_id: u64,
    pub referral_code: String,
    pub credited: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ReferralRecord> for ReferralRecordResponse {
    fn from(record: ReferralRecord) -> Self {
        Self {
            referrer_id: record.referrer.value(),
            referee_id: record.referee.value(),
            referral_code: record.referral_code,
            credited: record.credited,
            created_at: record.created_at,
        }
    }
}

/// A freshly minted refresh token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub family: FamilyId,
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self { refresh_token: issued.token, expires_at: issued.expires_at, family: issued.family }
    }
}

/// Number of tokens a bulk revocation affected.
#[derive(Debug, Serialize)]
pub struct RevokedResponse {
    pub revoked: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_use_camel_case() {
        let req: RefreshTokenRequest = serde_json::from_str(r#"{"refreshToken":"abc"}"#).unwrap();
        assert_eq!(req.refresh_token, "abc");

        let req: IssueSessionRequest = serde_json::from_str(r#"{"userId":7}"#).unwrap();
        assert_eq!(req.user_id, 7);

        assert!(serde_json::from_str::<IssueSessionRequest>(r#"{"user_id":7}"#).is_err());
    }

    #[test]
    fn test_blank_code_rejected() {
        let errors = ApplyReferralRequest { code: "   ".into() }.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "code");
        assert!(ApplyReferralRequest { code: "abc123".into() }.validate().is_ok());
    }

    #[test]
    fn test_zero_user_id_rejected() {
        assert!(IssueSessionRequest { user_id: 0 }.validate().is_err());
        assert!(LogoutAllRequest { user_id: 0 }.validate().is_err());
        assert!(LogoutAllRequest { user_id: 3 }.validate().is_ok());
    }

    #[test]
    fn test_envelope_skips_absent_fields() {
        let json = serde_json::to_value(ApiResponse::ok()).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true }));

        let json = serde_json::to_value(ApiResponse::with_message(
            "Applied",
            ApplyReferralResponse { is_premium_unlocked: true },
        ))
        .unwrap();
        assert_eq!(json["message"], "Applied");
        assert_eq!(json["data"]["isPremiumUnlocked"], true);
    }
}
