//! Proptest strategies for Campus ledger inputs.
//!
//! Generators for names, codes, identifiers, and client metadata, covering
//! both inputs the ledger accepts and inputs it must reject.
//!
//! # Usage
//!
//! ```no_run
//! use campus_ledger_test_utils::strategies;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn names_register(name in strategies::arb_student_name()) {
//!         // register and check the stored name
//!     }
//! }
//! ```

use campus_ledger_types::{DeviceMeta, StudentId, UserId};
use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

/// Generates a valid student name: 1-64 printable characters, not all blank.
pub fn arb_student_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z '.-]{0,63}"
}

/// Generates a string the ledger rejects as a student name.
pub fn arb_invalid_student_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[ \t]{1,8}",
        "[a-z]{1,8}\u{0007}[a-z]{0,8}",
        "[a-z]{129,160}",
    ]
}

/// Generates a code in the format `register_student` mints: `[A-Z0-9]{8}`.
pub fn arb_referral_code() -> impl Strategy<Value = String> {
    "[A-Z0-9]{8}"
}

/// Generates a code as a user might type it: mixed case, padded with spaces.
pub fn arb_sloppy_referral_code() -> impl Strategy<Value = (String, String)> {
    (arb_referral_code(), " {0,3}", " {0,3}", any::<bool>()).prop_map(
        |(code, pre, post, lower)| {
            let typed = if lower { code.to_lowercase() } else { code.clone() };
            (format!("{pre}{typed}{post}"), code)
        },
    )
}

/// Generates a code containing at least one character outside `[A-Za-z0-9]`.
pub fn arb_malformed_referral_code() -> impl Strategy<Value = String> {
    "[A-Z0-9]{0,4}[-_!@#$%/][A-Z0-9]{0,4}"
}

/// Generates a student identifier.
pub fn arb_student_id() -> impl Strategy<Value = StudentId> {
    (1u64..1_000_000).prop_map(StudentId::new)
}

/// Generates a user identifier.
pub fn arb_user_id() -> impl Strategy<Value = UserId> {
    (1u64..1_000_000).prop_map(UserId::new)
}

/// Generates client metadata, each field optionally present.
pub fn arb_device_meta() -> impl Strategy<Value = DeviceMeta> {
    (
        proptest::option::of("(Mozilla|curl|okhttp)/[0-9]\\.[0-9]{1,2}"),
        proptest::option::of("(10|172|192)\\.[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}"),
    )
        .prop_map(|(user_agent, ip_address)| DeviceMeta { user_agent, ip_address })
}

/// Generates a timestamp between 2020 and 2030 with second precision.
pub fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (1_577_836_800i64..1_893_456_000)
        .prop_map(|secs| Utc.timestamp_opt(secs, 0).single().unwrap_or_default())
}
