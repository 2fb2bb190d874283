//! Core types, errors, and configuration for the Campus ledger.
//!
//! This crate provides the foundational types shared by every other crate:
//! - Type-safe identifiers (StudentId, UserId, FamilyId)
//! - Student, referral, and refresh-token records as stored
//! - Read projections returned to callers (ReferralInfo, SessionInfo)
//! - The machine-readable error code catalog
//! - Postcard codec and SHA-256 helpers
//! - Validated configuration structs and request field validation

#![deny(unsafe_code)]

pub mod codec;
pub mod config;
pub mod error;
pub mod hash;
pub mod types;
pub mod validation;

// Re-export commonly used types at crate root
pub use codec::{CodecError, decode, encode};
pub use error::ErrorCode;
pub use hash::{Hash, sha256, short_hex};
pub use types::*;
