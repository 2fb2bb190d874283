//! Ledger state for the Campus service.
//!
//! This crate provides:
//! - [`ReferralLedger`]: referral code application, counters, premium unlock
//! - [`SessionManager`]: refresh token issue, rotation, reuse detection,
//!   revocation
//! - [`ExpirySweeper`]: background deletion of expired tokens
//! - Prometheus-style metrics for all of the above
//!
//! All operations are synchronous and run redb transactions directly; async
//! callers should move them onto a blocking thread.

#![deny(unsafe_code)]

pub mod metrics;
pub mod referral;
pub mod session;
mod sweeper;

pub use referral::{ReferralError, ReferralLedger};
pub use session::{SECRET_LEN, SessionError, SessionManager};
pub use sweeper::ExpirySweeper;
