//! Shared test utilities for Campus ledger crates.
//!
//! This crate provides common test helpers to reduce boilerplate across test modules:
//!
//! - [`TestDir`] - Managed temporary data directory that can open the ledger store
//! - [`assert_eventually`] - Poll a condition until it's true or timeout
//! - [`in_memory_ledger`] / [`on_disk_ledger`] - Ledger, sessions, and sweeper over one store
//! - [`test_referral_config`] / [`test_session_config`] - Configuration for tests
//! - [`strategies`] - Proptest generators for ledger inputs

#![deny(unsafe_code)]
// Test utilities are allowed to use unwrap for simplicity
#![cfg_attr(test, allow(clippy::disallowed_methods))]

mod test_dir;
pub use test_dir::{DATABASE_FILE, TestDir};

mod assertions;
pub use assertions::{assert_eventually, stored_token_count, wait_for_token_count};

mod config;
pub use config::{test_referral_config, test_session_config};

mod fixtures;
pub use fixtures::{TestLedger, in_memory_ledger, on_disk_ledger};

pub mod strategies;
