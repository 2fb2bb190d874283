//! Test configuration helpers.
//!
//! Centralizes the values tests use instead of production defaults.

// Test utilities are expected to panic on failure
#![allow(clippy::expect_used)]

use std::time::Duration;

use campus_ledger_types::config::{ReferralConfig, SessionConfig};

/// Referral configuration for tests: production defaults (threshold 3).
#[must_use]
pub fn test_referral_config() -> ReferralConfig {
    ReferralConfig::default()
}

/// Session configuration for tests.
///
/// Uses small values so expiry and sweeping are quick to exercise:
/// - `token_ttl`: 1 minute (the minimum)
/// - `sweep_interval`: 1 second
/// - `sweep_batch_size`: 100
#[must_use]
pub fn test_session_config() -> SessionConfig {
    SessionConfig::builder()
        .token_ttl(Duration::from_secs(60))
        .sweep_interval(Duration::from_secs(1))
        .sweep_batch_size(100)
        .build()
        .expect("test session config is valid")
}
