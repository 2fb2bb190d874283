//! Referral ledger.
//!
//! Records who referred whom, keeps per-referrer counters, and unlocks
//! premium access. Every mutation runs in a single redb write transaction, so
//! a partially applied referral is never observable and two concurrent
//! applications are serialized.

use campus_ledger_storage::{
    ReferralStore, StorageEngine, StorageError, StudentStore, WriteTransaction,
};
use campus_ledger_types::config::ReferralConfig;
use campus_ledger_types::validation::{
    ValidationError, normalize_referral_code, validate_student_name,
};
use campus_ledger_types::{
    ErrorCode, ReferralEntry, ReferralInfo, ReferralRecord, Student, StudentId,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use snafu::{Location, ResultExt, Snafu};
use tracing::{debug, info};

use crate::metrics;

/// Characters used in generated referral codes.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Referral ledger error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ReferralError {
    /// A request field failed validation.
    #[snafu(display("Invalid argument: {source}"))]
    InvalidArgument {
        source: ValidationError,
        #[snafu(implicit)]
        location: Location,
    },

    /// No student with this id exists.
    #[snafu(display("Student {id} not found"))]
    StudentNotFound { id: StudentId },

    /// No student owns the presented code.
    #[snafu(display("Invalid referral code"))]
    InvalidCode { code: String },

    /// The applicant presented their own code.
    #[snafu(display("You cannot use your own referral code"))]
    SelfReferral { id: StudentId },

    /// The applicant has already applied a code.
    #[snafu(display("You have already used a referral code"))]
    AlreadyReferred { id: StudentId },

    /// The student was never referred, so there is no record to credit.
    #[snafu(display("No referral record for {referee}"))]
    ReferralNotFound { referee: StudentId },

    /// Every generated code collided with an existing one.
    #[snafu(display("Could not allocate a unique referral code after {attempts} attempts"))]
    CodeSpaceExhausted { attempts: u32 },

    /// Underlying storage failure.
    #[snafu(display("Storage error: {source}"))]
    Storage {
        source: StorageError,
        #[snafu(implicit)]
        location: Location,
    },
}

impl ReferralError {
    /// Returns the machine-readable error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument { .. } => ErrorCode::AppInvalidArgument,
            Self::StudentNotFound { .. } => ErrorCode::ReferralStudentNotFound,
            Self::InvalidCode { .. } => ErrorCode::ReferralInvalidCode,
            Self::SelfReferral { .. } => ErrorCode::ReferralSelfReferral,
            Self::AlreadyReferred { .. } => ErrorCode::ReferralAlreadyReferred,
            Self::ReferralNotFound { .. } => ErrorCode::ReferralNotFound,
            Self::CodeSpaceExhausted { .. } => ErrorCode::AppInternal,
            Self::Storage { source, .. } => source.code(),
        }
    }

    /// Short label used for metrics.
    const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::StudentNotFound { .. } => "student_not_found",
            Self::InvalidCode { .. } => "invalid_code",
            Self::SelfReferral { .. } => "self_referral",
            Self::AlreadyReferred { .. } => "already_referred",
            Self::ReferralNotFound { .. } => "referral_not_found",
            Self::CodeSpaceExhausted { .. } => "code_space_exhausted",
            Self::Storage { .. } => "storage",
        }
    }
}

/// Result type for referral ledger operations.
pub type Result<T, E = ReferralError> = std::result::Result<T, E>;

/// Outcome of a committed referral application.
#[derive(Debug)]
struct Applied {
    applicant: Student,
    /// The applicant became premium in this transaction.
    referee_unlocked: bool,
    /// The code owner crossed the unlock threshold in this transaction.
    referrer_unlocked: bool,
}

/// The referral ledger.
///
/// Cheap to clone; clones share the underlying database.
#[derive(Clone)]
pub struct ReferralLedger {
    engine: StorageEngine,
    config: ReferralConfig,
}

impl ReferralLedger {
    /// Creates a ledger over `engine`.
    pub fn new(engine: StorageEngine, config: ReferralConfig) -> Self {
        Self { engine, config }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ReferralConfig {
        &self.config
    }

    /// Registers a student and mints their referral code.
    ///
    /// # Errors
    ///
    /// - [`ReferralError::InvalidArgument`] for an empty or over-long name
    /// - [`ReferralError::CodeSpaceExhausted`] if no free code was found
    /// - [`ReferralError::Storage`] on storage failure
    pub fn register_student(&self, name: &str) -> Result<Student> {
        self.register_student_at(name, Utc::now())
    }

    /// [`Self::register_student`] with an explicit clock reading.
    ///
    /// # Errors
    ///
    /// See [`Self::register_student`].
    pub fn register_student_at(&self, name: &str, now: DateTime<Utc>) -> Result<Student> {
        validate_student_name(name).context(InvalidArgumentSnafu)?;

        let txn = self.engine.begin_write().context(StorageSnafu)?;
        let referral_code = self.generate_unique_code(&txn)?;
        let id = StudentStore::next_id(&txn).context(StorageSnafu)?;

        let student = Student {
            id,
            name: name.trim().to_string(),
            referral_code,
            referred_by: None,
            referral_count: 0,
            is_premium_unlocked: false,
            created_at: now,
        };
        StudentStore::insert(&txn, &student).context(StorageSnafu)?;
        StorageEngine::commit(txn).context(StorageSnafu)?;

        metrics::record_student_registered();
        info!(student_id = %student.id, code = %student.referral_code, "Registered student");
        Ok(student)
    }

    /// Gets a student by id.
    ///
    /// # Errors
    ///
    /// Returns [`ReferralError::StudentNotFound`] if absent.
    pub fn get_student(&self, id: StudentId) -> Result<Student> {
        let txn = self.engine.begin_read().context(StorageSnafu)?;
        StudentStore::get(&txn, id)
            .context(StorageSnafu)?
            .ok_or(ReferralError::StudentNotFound { id })
    }

    /// Applies `code` on behalf of `student_id`.
    ///
    /// On success the applicant is unlocked, the owner's counter is
    /// incremented (unlocking them once the threshold is reached), and a
    /// pending ReferralRecord is stored. Returns the updated applicant.
    ///
    /// Checks run in order: non-empty code, applicant exists, applicant not
    /// already referred, code owned by someone, owner is not the applicant.
    ///
    /// # Errors
    ///
    /// - [`ReferralError::InvalidArgument`] for an empty code
    /// - [`ReferralError::StudentNotFound`] for an unknown applicant
    /// - [`ReferralError::AlreadyReferred`] if the applicant already used a code
    /// - [`ReferralError::InvalidCode`] if no student owns the code
    /// - [`ReferralError::SelfReferral`] if the code is the applicant's own
    pub fn apply_referral_code(&self, student_id: StudentId, code: &str) -> Result<Student> {
        self.apply_referral_code_at(student_id, code, Utc::now())
    }

    /// [`Self::apply_referral_code`] with an explicit clock reading.
    ///
    /// # Errors
    ///
    /// See [`Self::apply_referral_code`].
    pub fn apply_referral_code_at(
        &self,
        student_id: StudentId,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Student> {
        match self.try_apply(student_id, code, now) {
            Ok(applied) => {
                metrics::record_referral_applied();
                if applied.referee_unlocked {
                    metrics::record_premium_unlock("referee");
                }
                if applied.referrer_unlocked {
                    metrics::record_premium_unlock("referrer");
                }
                Ok(applied.applicant)
            },
            Err(e) => {
                metrics::record_referral_rejected(e.reason());
                debug!(student_id = %student_id, error = %e, "Referral code rejected");
                Err(e)
            },
        }
    }

    /// Runs the application in one write transaction. Unlock flags describe
    /// the committed state only.
    fn try_apply(&self, student_id: StudentId, code: &str, now: DateTime<Utc>) -> Result<Applied> {
        if code.trim().is_empty() {
            return Err(ValidationError::new("code", "must not be empty"))
                .context(InvalidArgumentSnafu);
        }

        let txn = self.engine.begin_write().context(StorageSnafu)?;

        let mut applicant = StudentStore::get(&txn, student_id)
            .context(StorageSnafu)?
            .ok_or(ReferralError::StudentNotFound { id: student_id })?;

        if applicant.has_been_referred() {
            return Err(ReferralError::AlreadyReferred { id: student_id });
        }

        // A code with characters no generated code can contain is simply unowned.
        let normalized = normalize_referral_code(code)
            .map_err(|_| ReferralError::InvalidCode { code: code.trim().to_string() })?;

        let mut referrer = StudentStore::get_by_code(&txn, &normalized)
            .context(StorageSnafu)?
            .ok_or_else(|| ReferralError::InvalidCode { code: normalized.clone() })?;

        if referrer.id == applicant.id {
            return Err(ReferralError::SelfReferral { id: student_id });
        }

        let record = ReferralRecord {
            referrer: referrer.id,
            referee: applicant.id,
            referral_code: normalized.clone(),
            credited: false,
            created_at: now,
        };
        ReferralStore::insert(&txn, &record).context(StorageSnafu)?;

        applicant.referred_by = Some(normalized);
        let referee_unlocked = !applicant.is_premium_unlocked;
        applicant.is_premium_unlocked = true;
        StudentStore::put(&txn, &applicant).context(StorageSnafu)?;

        referrer.referral_count = referrer.referral_count.saturating_add(1);
        let referrer_unlocked = !referrer.is_premium_unlocked
            && referrer.referral_count >= self.config.premium_unlock_threshold;
        if referrer_unlocked {
            referrer.is_premium_unlocked = true;
        }
        StudentStore::put(&txn, &referrer).context(StorageSnafu)?;

        StorageEngine::commit(txn).context(StorageSnafu)?;

        if referrer_unlocked {
            info!(
                student_id = %referrer.id,
                referral_count = referrer.referral_count,
                "Referrer unlocked premium"
            );
        }
        info!(
            referee = %applicant.id,
            referrer = %referrer.id,
            referral_count = referrer.referral_count,
            "Applied referral code"
        );
        Ok(Applied { applicant, referee_unlocked, referrer_unlocked })
    }

    /// Returns a student's code, counters, and referrals (most recent first).
    ///
    /// # Errors
    ///
    /// Returns [`ReferralError::StudentNotFound`] if absent.
    pub fn get_referral_info(&self, student_id: StudentId) -> Result<ReferralInfo> {
        let txn = self.engine.begin_read().context(StorageSnafu)?;

        let student = StudentStore::get(&txn, student_id)
            .context(StorageSnafu)?
            .ok_or(ReferralError::StudentNotFound { id: student_id })?;

        let records = ReferralStore::list_by_referrer(&txn, student_id).context(StorageSnafu)?;
        let mut referrals = Vec::with_capacity(records.len());
        for record in records {
            let referee_name = StudentStore::get(&txn, record.referee)
                .context(StorageSnafu)?
                .map(|s| s.name)
                .unwrap_or_default();
            referrals.push(ReferralEntry {
                referee_name,
                joined_at: record.created_at,
                credited: record.credited,
            });
        }

        Ok(ReferralInfo {
            referral_code: student.referral_code,
            referral_count: student.referral_count,
            is_premium_unlocked: student.is_premium_unlocked,
            referrals,
        })
    }

    /// Marks the referral that brought in `referee` as credited.
    ///
    /// Idempotent: crediting an already credited record returns it unchanged.
    ///
    /// # Errors
    ///
    /// - [`ReferralError::StudentNotFound`] if the referee does not exist
    /// - [`ReferralError::ReferralNotFound`] if the referee was never referred
    pub fn credit_referral(&self, referee: StudentId) -> Result<ReferralRecord> {
        let txn = self.engine.begin_write().context(StorageSnafu)?;

        let Some(mut record) = ReferralStore::get_by_referee(&txn, referee).context(StorageSnafu)?
        else {
            if StudentStore::get(&txn, referee).context(StorageSnafu)?.is_none() {
                return Err(ReferralError::StudentNotFound { id: referee });
            }
            return Err(ReferralError::ReferralNotFound { referee });
        };

        if record.credited {
            return Ok(record);
        }

        record.credited = true;
        ReferralStore::put(&txn, &record).context(StorageSnafu)?;
        StorageEngine::commit(txn).context(StorageSnafu)?;

        metrics::record_referral_credited();
        info!(referee = %referee, referrer = %record.referrer, "Credited referral");
        Ok(record)
    }

    fn generate_unique_code(&self, txn: &WriteTransaction) -> Result<String> {
        let mut rng = rand::rng();
        for _ in 0..self.config.max_code_attempts {
            let code: String = (0..self.config.code_length)
                .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
                .collect();
            if !StudentStore::code_exists(txn, &code).context(StorageSnafu)? {
                return Ok(code);
            }
            debug!(code = %code, "Referral code collision, retrying");
        }
        Err(ReferralError::CodeSpaceExhausted { attempts: self.config.max_code_attempts })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    use super::*;

    fn ledger() -> ReferralLedger {
        let engine = StorageEngine::open_in_memory().expect("open");
        ReferralLedger::new(engine, ReferralConfig::default())
    }

    fn base_time() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_register_student_mints_code() {
        let ledger = ledger();
        let student = ledger.register_student("  Ada Lovelace ").expect("register");

        assert_eq!(student.name, "Ada Lovelace");
        assert_eq!(student.referral_code.len(), 8);
        assert!(student.referral_code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        assert_eq!(student.referral_count, 0);
        assert!(!student.is_premium_unlocked);
        assert_eq!(ledger.get_student(student.id).expect("get"), student);
    }

    #[test]
    fn test_register_student_rejects_empty_name() {
        let err = ledger().register_student("   ").unwrap_err();
        assert!(matches!(err, ReferralError::InvalidArgument { .. }));
        assert_eq!(err.code(), ErrorCode::AppInvalidArgument);
    }

    #[test]
    fn test_get_student_not_found() {
        let err = ledger().get_student(StudentId::new(42)).unwrap_err();
        assert!(matches!(err, ReferralError::StudentNotFound { .. }));
    }

    #[test]
    fn test_apply_unlocks_referee_and_counts_referrer() {
        let ledger = ledger();
        let referrer = ledger.register_student("Referrer").unwrap();
        let referee = ledger.register_student("Referee").unwrap();

        let updated = ledger.apply_referral_code(referee.id, &referrer.referral_code).unwrap();
        assert!(updated.is_premium_unlocked);
        assert_eq!(updated.referred_by.as_deref(), Some(referrer.referral_code.as_str()));

        let info = ledger.get_referral_info(referrer.id).unwrap();
        assert_eq!(info.referral_count, 1);
        assert!(!info.is_premium_unlocked);
        assert_eq!(info.referrals.len(), 1);
        assert_eq!(info.referrals[0].referee_name, "Referee");
        assert!(!info.referrals[0].credited);
    }

    #[test]
    fn test_apply_normalizes_code() {
        let ledger = ledger();
        let referrer = ledger.register_student("Referrer").unwrap();
        let referee = ledger.register_student("Referee").unwrap();

        let presented = format!("  {}  ", referrer.referral_code.to_lowercase());
        assert!(ledger.apply_referral_code(referee.id, &presented).is_ok());
    }

    #[test]
    fn test_second_application_is_already_referred() {
        let ledger = ledger();
        let first = ledger.register_student("First").unwrap();
        let second = ledger.register_student("Second").unwrap();
        let applicant = ledger.register_student("Applicant").unwrap();

        ledger.apply_referral_code(applicant.id, &first.referral_code).unwrap();
        let err = ledger.apply_referral_code(applicant.id, &second.referral_code).unwrap_err();
        assert!(matches!(err, ReferralError::AlreadyReferred { .. }));

        // Re-applying the same code is rejected the same way and counts nothing.
        let err = ledger.apply_referral_code(applicant.id, &first.referral_code).unwrap_err();
        assert!(matches!(err, ReferralError::AlreadyReferred { .. }));

        assert_eq!(ledger.get_referral_info(first.id).unwrap().referral_count, 1);
        assert_eq!(ledger.get_referral_info(second.id).unwrap().referral_count, 0);
    }

    #[test]
    fn test_self_referral_rejected_without_record() {
        let ledger = ledger();
        let student = ledger.register_student("Solo").unwrap();

        let err = ledger.apply_referral_code(student.id, &student.referral_code).unwrap_err();
        assert!(matches!(err, ReferralError::SelfReferral { .. }));
        assert_eq!(err.code(), ErrorCode::ReferralSelfReferral);

        let info = ledger.get_referral_info(student.id).unwrap();
        assert_eq!(info.referral_count, 0);
        assert!(info.referrals.is_empty());
        assert!(!ledger.get_student(student.id).unwrap().has_been_referred());
        assert!(matches!(
            ledger.credit_referral(student.id).unwrap_err(),
            ReferralError::ReferralNotFound { .. }
        ));
    }

    #[test]
    fn test_unknown_code_is_invalid() {
        let ledger = ledger();
        let student = ledger.register_student("Someone").unwrap();

        let err = ledger.apply_referral_code(student.id, "NOPE0000").unwrap_err();
        assert!(matches!(err, ReferralError::InvalidCode { .. }));

        let err = ledger.apply_referral_code(student.id, "no-such-code!").unwrap_err();
        assert!(matches!(err, ReferralError::InvalidCode { .. }));

        let err = ledger.apply_referral_code(student.id, "   ").unwrap_err();
        assert!(matches!(err, ReferralError::InvalidArgument { .. }));
    }

    #[test]
    fn test_check_order_already_referred_before_invalid_code() {
        let ledger = ledger();
        let referrer = ledger.register_student("Referrer").unwrap();
        let applicant = ledger.register_student("Applicant").unwrap();
        ledger.apply_referral_code(applicant.id, &referrer.referral_code).unwrap();

        let err = ledger.apply_referral_code(applicant.id, "UNKNOWN1").unwrap_err();
        assert!(matches!(err, ReferralError::AlreadyReferred { .. }));
    }

    #[test]
    fn test_unknown_applicant_is_not_found() {
        let ledger = ledger();
        let referrer = ledger.register_student("Referrer").unwrap();
        let err = ledger.apply_referral_code(StudentId::new(999), &referrer.referral_code);
        assert!(matches!(err.unwrap_err(), ReferralError::StudentNotFound { .. }));
    }

    #[test]
    fn test_threshold_unlocks_referrer() {
        let ledger = ledger();
        let referrer = ledger.register_student("R").unwrap();

        for i in 0..2 {
            let s = ledger.register_student(&format!("Friend {i}")).unwrap();
            ledger.apply_referral_code(s.id, &referrer.referral_code).unwrap();
        }
        let before = ledger.get_student(referrer.id).unwrap();
        assert_eq!(before.referral_count, 2);
        assert!(!before.is_premium_unlocked);

        let x = ledger.register_student("X").unwrap();
        let x_after = ledger.apply_referral_code(x.id, &referrer.referral_code).unwrap();
        assert!(x_after.is_premium_unlocked);

        let after = ledger.get_student(referrer.id).unwrap();
        assert_eq!(after.referral_count, 3);
        assert!(after.is_premium_unlocked);

        let info = ledger.get_referral_info(referrer.id).unwrap();
        assert_eq!(info.referrals.len(), 3);
        assert_eq!(info.referrals.iter().filter(|r| r.referee_name == "X").count(), 1);
    }

    #[test]
    fn test_unlock_flags_only_report_committed_transitions() {
        let ledger = ledger();
        let referrer = ledger.register_student("R").unwrap();
        let now = base_time();

        let mut flags = Vec::new();
        for i in 0..4 {
            let s = ledger.register_student(&format!("Friend {i}")).unwrap();
            let applied = ledger.try_apply(s.id, &referrer.referral_code, now).unwrap();
            assert!(applied.applicant.is_premium_unlocked);
            assert_eq!(
                ledger.get_student(s.id).unwrap().is_premium_unlocked,
                applied.referee_unlocked
            );
            flags.push(applied.referrer_unlocked);
        }
        // Only the application that crossed the threshold reports the unlock.
        assert_eq!(flags, [false, false, true, false]);

        // A rejected application commits nothing and reports nothing.
        let late = ledger.register_student("Late").unwrap();
        ledger.try_apply(late.id, &referrer.referral_code, now).unwrap();
        assert!(matches!(
            ledger.try_apply(late.id, &referrer.referral_code, now),
            Err(ReferralError::AlreadyReferred { .. })
        ));
        assert_eq!(ledger.get_student(referrer.id).unwrap().referral_count, 5);
    }

    #[test]
    fn test_custom_threshold() {
        let engine = StorageEngine::open_in_memory().unwrap();
        let config = ReferralConfig::builder().premium_unlock_threshold(1).build().unwrap();
        let ledger = ReferralLedger::new(engine, config);

        let referrer = ledger.register_student("R").unwrap();
        let referee = ledger.register_student("E").unwrap();
        ledger.apply_referral_code(referee.id, &referrer.referral_code).unwrap();
        assert!(ledger.get_student(referrer.id).unwrap().is_premium_unlocked);
    }

    #[test]
    fn test_referrals_listed_most_recent_first() {
        let ledger = ledger();
        let referrer = ledger.register_student("R").unwrap();
        let names = ["Oldest", "Middle", "Newest"];
        for (i, name) in names.iter().enumerate() {
            let s = ledger.register_student(name).unwrap();
            let at = base_time() + Duration::minutes(i as i64);
            ledger.apply_referral_code_at(s.id, &referrer.referral_code, at).unwrap();
        }

        let info = ledger.get_referral_info(referrer.id).unwrap();
        let listed: Vec<&str> = info.referrals.iter().map(|r| r.referee_name.as_str()).collect();
        assert_eq!(listed, vec!["Newest", "Middle", "Oldest"]);
        assert_eq!(info.referrals[0].joined_at, base_time() + Duration::minutes(2));
    }

    #[test]
    fn test_credit_referral_is_idempotent() {
        let ledger = ledger();
        let referrer = ledger.register_student("R").unwrap();
        let referee = ledger.register_student("E").unwrap();
        ledger.apply_referral_code(referee.id, &referrer.referral_code).unwrap();

        let first = ledger.credit_referral(referee.id).unwrap();
        assert!(first.credited);
        let second = ledger.credit_referral(referee.id).unwrap();
        assert_eq!(first, second);

        let info = ledger.get_referral_info(referrer.id).unwrap();
        assert!(info.referrals[0].credited);
        assert_eq!(info.referral_count, 1);
    }

    #[test]
    fn test_credit_unknown_student() {
        let err = ledger().credit_referral(StudentId::new(5)).unwrap_err();
        assert!(matches!(err, ReferralError::StudentNotFound { .. }));
    }

    #[test]
    fn test_concurrent_applications_count_exactly() {
        let ledger = ledger();
        let referrer = ledger.register_student("R").unwrap();
        let applicants: Vec<Student> =
            (0..8).map(|i| ledger.register_student(&format!("A{i}")).unwrap()).collect();

        std::thread::scope(|scope| {
            for applicant in &applicants {
                let ledger = ledger.clone();
                let code = referrer.referral_code.clone();
                scope.spawn(move || {
                    ledger.apply_referral_code(applicant.id, &code).unwrap();
                });
            }
        });

        let info = ledger.get_referral_info(referrer.id).unwrap();
        assert_eq!(info.referral_count, 8);
        assert_eq!(info.referrals.len(), 8);
        assert!(info.is_premium_unlocked);
    }

    #[test]
    fn test_concurrent_double_apply_by_one_student() {
        let ledger = ledger();
        let a = ledger.register_student("A").unwrap();
        let b = ledger.register_student("B").unwrap();
        let applicant = ledger.register_student("C").unwrap();

        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = [a.referral_code.clone(), b.referral_code.clone()]
                .into_iter()
                .map(|code| {
                    let ledger = ledger.clone();
                    scope.spawn(move || ledger.apply_referral_code(applicant.id, &code))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let total = ledger.get_student(a.id).unwrap().referral_count
            + ledger.get_student(b.id).unwrap().referral_count;
        assert_eq!(total, 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_referral_count_matches_applications(n in 0usize..12) {
            let ledger = ledger();
            let referrer = ledger.register_student("Referrer").unwrap();
            for i in 0..n {
                let s = ledger.register_student(&format!("Student {i}")).unwrap();
                ledger.apply_referral_code(s.id, &referrer.referral_code).unwrap();
            }

            let info = ledger.get_referral_info(referrer.id).unwrap();
            prop_assert_eq!(info.referral_count as usize, n);
            prop_assert_eq!(info.referrals.len(), n);
            prop_assert_eq!(info.is_premium_unlocked, n >= 3);
        }

        #[test]
        fn prop_generated_codes_are_unique_and_well_formed(n in 1usize..40) {
            let ledger = ledger();
            let mut seen = std::collections::HashSet::new();
            for i in 0..n {
                let s = ledger.register_student(&format!("S{i}")).unwrap();
                prop_assert_eq!(s.referral_code.len(), 8);
                prop_assert!(s.referral_code.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
                prop_assert!(seen.insert(s.referral_code));
            }
        }
    }
}
