//! Property tests over the ledger and session manager behind the API.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]

use campus_ledger_state::{ReferralError, SessionError};
use campus_ledger_test_utils::{in_memory_ledger, strategies};
use campus_ledger_types::TokenState;
use chrono::Duration;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_registered_name_is_trimmed(name in strategies::arb_student_name()) {
        let ledger = in_memory_ledger();
        let student = ledger.referrals.register_student(&format!("  {name} ")).unwrap();
        prop_assert_eq!(student.name, name.trim());
        prop_assert_eq!(student.referral_code.len(), 8);
    }

    #[test]
    fn prop_invalid_name_is_rejected(name in strategies::arb_invalid_student_name()) {
        let ledger = in_memory_ledger();
        let result = ledger.referrals.register_student(&name);
        prop_assert!(matches!(result, Err(ReferralError::InvalidArgument { .. })), "unexpected {result:?}");
    }

    #[test]
    fn prop_unowned_code_is_invalid(code in strategies::arb_referral_code()) {
        let ledger = in_memory_ledger();
        let owner = ledger.student("Owner");
        prop_assume!(owner.referral_code != code);
        let applicant = ledger.student("Applicant");

        let result = ledger.referrals.apply_referral_code(applicant.id, &code);
        prop_assert!(matches!(result, Err(ReferralError::InvalidCode { .. })), "unexpected {result:?}");
        prop_assert!(!ledger.referrals.get_student(applicant.id).unwrap().has_been_referred());
    }

    #[test]
    fn prop_malformed_code_is_invalid(code in strategies::arb_malformed_referral_code()) {
        let ledger = in_memory_ledger();
        let applicant = ledger.student("Applicant");
        let result = ledger.referrals.apply_referral_code(applicant.id, &code);
        prop_assert!(matches!(result, Err(ReferralError::InvalidCode { .. })), "unexpected {result:?}");
    }

    #[test]
    fn prop_sloppy_code_is_normalized_before_lookup(
        (typed, canonical) in strategies::arb_sloppy_referral_code(),
    ) {
        let ledger = in_memory_ledger();
        let owner = ledger.student("Owner");
        prop_assume!(owner.referral_code != canonical);
        let applicant = ledger.student("Applicant");

        match ledger.referrals.apply_referral_code(applicant.id, &typed) {
            Err(ReferralError::InvalidCode { code }) => prop_assert_eq!(code, canonical),
            other => prop_assert!(false, "unexpected {other:?}"),
        }
    }

    #[test]
    fn prop_unknown_student_is_not_found(id in strategies::arb_student_id()) {
        let ledger = in_memory_ledger();
        let result = ledger.referrals.get_referral_info(id);
        prop_assert!(matches!(result, Err(ReferralError::StudentNotFound { .. })), "unexpected {result:?}");
    }

    #[test]
    fn prop_issued_session_lists_its_device(
        user in strategies::arb_user_id(),
        device in strategies::arb_device_meta(),
    ) {
        let ledger = in_memory_ledger();
        let issued = ledger.sessions.issue(user, device.clone()).unwrap();

        let sessions = ledger.sessions.list_active_sessions(user).unwrap();
        prop_assert_eq!(sessions.len(), 1);
        prop_assert_eq!(sessions[0].family, issued.family);
        prop_assert_eq!(&sessions[0].user_agent, &device.user_agent);
        prop_assert_eq!(&sessions[0].ip_address, &device.ip_address);
    }

    #[test]
    fn prop_token_expires_exactly_at_ttl(
        user in strategies::arb_user_id(),
        issued_at in strategies::arb_timestamp(),
    ) {
        let ledger = in_memory_ledger();
        let issued = ledger.sessions.issue_at(user, Default::default(), issued_at).unwrap();
        let ttl = Duration::from_std(ledger.sessions.config().token_ttl).unwrap();
        prop_assert_eq!(issued.expires_at, issued_at + ttl);

        let just_before = issued.expires_at - Duration::seconds(1);
        prop_assert!(ledger.sessions.validate_at(&issued.token, just_before).is_ok());
        let result = ledger.sessions.validate_at(&issued.token, issued.expires_at);
        prop_assert!(
            matches!(result, Err(SessionError::TokenInvalid { state: TokenState::Expired })),
            "{result:?}"
        );
    }
}
