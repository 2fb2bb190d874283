//! Storage engine for the Campus ledger.
//!
//! This crate provides:
//! - redb-based persistent (or in-memory) storage
//! - Table definitions and sortable index key encoding
//! - Per-record stores for students, referrals, and refresh tokens
//!
//! Stores are stateless: every operation takes the transaction it runs in,
//! so callers compose multi-record changes into one atomic commit.

#![deny(unsafe_code)]

mod engine;
mod error;
pub mod keys;
mod referral;
mod refresh_token;
mod student;
mod tables;

pub use engine::{ReadScope, StorageEngine};
pub use error::{Result, StorageError};
pub use referral::ReferralStore;
pub use refresh_token::RefreshTokenStore;
pub use student::StudentStore;
pub use tables::Tables;

/// Re-exported so dependents can name transaction types without a direct redb dependency.
pub use redb::{ReadTransaction, WriteTransaction};
