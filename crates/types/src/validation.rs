//! Input validation for request fields.
//!
//! Used at the HTTP boundary (typed request DTOs) and again inside the ledger
//! operations, so a caller that bypasses the HTTP layer gets the same checks.
//!
//! ## Character Whitelists
//!
//! - Referral codes: `[A-Z0-9]`, compared after trimming and upper-casing.
//! - Student names: any printable characters, no control characters.

use std::fmt;

use serde::Serialize;

/// Maximum student name length in characters.
pub const MAX_NAME_CHARS: usize = 128;

/// Maximum referral code length accepted from callers.
pub const MAX_CODE_CHARS: usize = 32;

/// Maximum stored length of client metadata strings (user agent, IP).
pub const MAX_DEVICE_FIELD_CHARS: usize = 256;

/// Validation error with structured context.
///
/// Contains the specific constraint that was violated and the field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the violated constraint.
    pub constraint: String,
}

impl ValidationError {
    /// Creates a validation error for `field`.
    pub fn new(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self { field: field.into(), constraint: constraint.into() }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.constraint)
    }
}

impl std::error::Error for ValidationError {}

/// Validates a student display name.
///
/// Names must:
/// - Be non-empty after trimming
/// - Not exceed [`MAX_NAME_CHARS`] characters
/// - Contain no control characters
///
/// # Errors
///
/// Returns [`ValidationError`] describing the first violated rule.
pub fn validate_student_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("name", "must not be empty"));
    }
    let chars = trimmed.chars().count();
    if chars > MAX_NAME_CHARS {
        return Err(ValidationError::new(
            "name",
            format!("length {chars} characters exceeds maximum {MAX_NAME_CHARS}"),
        ));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(ValidationError::new("name", "must not contain control characters"));
    }
    Ok(())
}

/// Normalizes a caller-supplied referral code for lookup.
///
/// Trims surrounding whitespace and upper-cases ASCII letters.
///
/// # Errors
///
/// Returns [`ValidationError`] if the code is empty, longer than
/// [`MAX_CODE_CHARS`], or contains characters outside `[A-Za-z0-9]`.
pub fn normalize_referral_code(code: &str) -> Result<String, ValidationError> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("code", "must not be empty"));
    }
    if trimmed.len() > MAX_CODE_CHARS {
        return Err(ValidationError::new(
            "code",
            format!("length {} exceeds maximum {MAX_CODE_CHARS}", trimmed.len()),
        ));
    }
    if let Some(c) = trimmed.chars().find(|c| !c.is_ascii_alphanumeric()) {
        return Err(ValidationError::new(
            "code",
            format!("contains invalid character {c:?}; allowed: [A-Z0-9]"),
        ));
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Truncates client metadata to [`MAX_DEVICE_FIELD_CHARS`] and drops empty values.
pub fn sanitize_device_field(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_DEVICE_FIELD_CHARS).collect())
}
