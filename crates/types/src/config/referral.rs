//! Referral ledger configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Shortest referral code we will mint.
const MIN_CODE_LENGTH: usize = 6;

/// Longest referral code we will mint.
const MAX_CODE_LENGTH: usize = 32;

/// Referral ledger configuration.
///
/// # Validation Rules
///
/// - `premium_unlock_threshold` must be >= 1
/// - `code_length` must be 6-32
/// - `max_code_attempts` must be >= 1
///
/// # Example
///
/// ```no_run
/// # use campus_ledger_types::config::ReferralConfig;
/// let config = ReferralConfig::builder()
///     .premium_unlock_threshold(5)
///     .build()
///     .expect("valid referral config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReferralConfig {
    /// Referral count at which the referrer's premium flag is set.
    #[serde(default = "default_premium_unlock_threshold")]
    pub premium_unlock_threshold: u32,
    /// Length of generated referral codes.
    #[serde(default = "default_code_length")]
    pub code_length: usize,
    /// Attempts at minting a code that is not already taken.
    #[serde(default = "default_max_code_attempts")]
    pub max_code_attempts: u32,
}

#[bon::bon]
impl ReferralConfig {
    /// Creates a new referral configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    #[builder]
    pub fn new(
        #[builder(default = default_premium_unlock_threshold())] premium_unlock_threshold: u32,
        #[builder(default = default_code_length())] code_length: usize,
        #[builder(default = default_max_code_attempts())] max_code_attempts: u32,
    ) -> Result<Self, ConfigError> {
        let config = Self { premium_unlock_threshold, code_length, max_code_attempts };
        config.validate()?;
        Ok(config)
    }
}

impl ReferralConfig {
    /// Validates the configuration values.
    ///
    /// Call after deserialization to ensure values are within valid ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.premium_unlock_threshold == 0 {
            return Err(ConfigError::Validation {
                message: "premium_unlock_threshold must be >= 1".to_string(),
            });
        }
        if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&self.code_length) {
            return Err(ConfigError::Validation {
                message: format!(
                    "code_length must be {}-{}, got {}",
                    MIN_CODE_LENGTH, MAX_CODE_LENGTH, self.code_length
                ),
            });
        }
        if self.max_code_attempts == 0 {
            return Err(ConfigError::Validation {
                message: "max_code_attempts must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            premium_unlock_threshold: default_premium_unlock_threshold(),
            code_length: default_code_length(),
            max_code_attempts: default_max_code_attempts(),
        }
    }
}

fn default_premium_unlock_threshold() -> u32 {
    3
}

fn default_code_length() -> usize {
    8
}

fn default_max_code_attempts() -> u32 {
    16
}
