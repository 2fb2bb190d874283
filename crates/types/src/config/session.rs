//! Refresh-token session and expiry sweep configuration.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Shortest allowed refresh-token lifetime.
const MIN_TOKEN_TTL: Duration = Duration::from_secs(60);

/// Longest allowed refresh-token lifetime.
const MAX_TOKEN_TTL: Duration = Duration::from_secs(366 * 24 * 60 * 60);

/// Shortest allowed sweep interval.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Session manager configuration.
///
/// # Validation Rules
///
/// - `token_ttl` must be between 1 minute and 366 days
/// - `sweep_interval` must be >= 1 second
/// - `sweep_batch_size` must be > 0
///
/// # Example
///
/// ```no_run
/// # use std::time::Duration;
/// # use campus_ledger_types::config::SessionConfig;
/// let config = SessionConfig::builder()
///     .token_ttl(Duration::from_secs(30 * 24 * 3600))
///     .sweep_batch_size(500)
///     .build()
///     .expect("valid session config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SessionConfig {
    /// Lifetime of each minted refresh token, counted from mint time.
    #[serde(default = "default_token_ttl")]
    #[serde(with = "super::humantime_serde")]
    #[schemars(with = "String")]
    pub token_ttl: Duration,
    /// Interval between expiry sweep cycles.
    #[serde(default = "default_sweep_interval")]
    #[serde(with = "super::humantime_serde")]
    #[schemars(with = "String")]
    pub sweep_interval: Duration,
    /// Maximum tokens deleted per sweep cycle.
    #[serde(default = "default_sweep_batch_size")]
    pub sweep_batch_size: usize,
}

#[bon::bon]
impl SessionConfig {
    /// Creates a new session configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    #[builder]
    pub fn new(
        #[builder(default = default_token_ttl())] token_ttl: Duration,
        #[builder(default = default_sweep_interval())] sweep_interval: Duration,
        #[builder(default = default_sweep_batch_size())] sweep_batch_size: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self { token_ttl, sweep_interval, sweep_batch_size };
        config.validate()?;
        Ok(config)
    }
}

impl SessionConfig {
    /// Validates the configuration values.
    ///
    /// Call after deserialization to ensure values are within valid ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_ttl < MIN_TOKEN_TTL || self.token_ttl > MAX_TOKEN_TTL {
            return Err(ConfigError::Validation {
                message: format!(
                    "token_ttl must be {}-{}, got {}",
                    humantime::format_duration(MIN_TOKEN_TTL),
                    humantime::format_duration(MAX_TOKEN_TTL),
                    humantime::format_duration(self.token_ttl)
                ),
            });
        }
        if self.sweep_interval < MIN_SWEEP_INTERVAL {
            return Err(ConfigError::Validation {
                message: format!(
                    "sweep_interval must be >= {}, got {}",
                    humantime::format_duration(MIN_SWEEP_INTERVAL),
                    humantime::format_duration(self.sweep_interval)
                ),
            });
        }
        if self.sweep_batch_size == 0 {
            return Err(ConfigError::Validation {
                message: "sweep_batch_size must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// Token lifetime as a chrono duration, for timestamp arithmetic.
    ///
    /// Validated TTLs always fit; an unvalidated out-of-range TTL is clamped
    /// to the maximum.
    pub fn token_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.token_ttl.min(MAX_TOKEN_TTL))
            .unwrap_or_else(|_| chrono::Duration::days(366))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_ttl: default_token_ttl(),
            sweep_interval: default_sweep_interval(),
            sweep_batch_size: default_sweep_batch_size(),
        }
    }
}

fn default_token_ttl() -> Duration {
    Duration::from_secs(7 * 24 * 60 * 60) // 7 days
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_sweep_batch_size() -> usize {
    1000
}
