//! Observability metrics exposed via Prometheus using the `metrics` crate.
//!
//! ## Metric Naming Conventions
//!
//! All metrics follow the pattern: `campus_ledger_{subsystem}_{name}_{unit}`
//!
//! - Counters: `_total` suffix
//! - Histograms: `_seconds` suffix
//! - Gauges: no suffix
//!
//! Recording is a no-op until a recorder is installed by the server binary.

use metrics::{counter, gauge, histogram};

// =============================================================================
// Metric Names (constants for consistency)
// =============================================================================

// Referral ledger metrics
const STUDENTS_REGISTERED: &str = "campus_ledger_students_registered_total";
const REFERRALS_APPLIED: &str = "campus_ledger_referrals_applied_total";
const REFERRALS_REJECTED: &str = "campus_ledger_referrals_rejected_total";
const REFERRALS_CREDITED: &str = "campus_ledger_referrals_credited_total";
const PREMIUM_UNLOCKS: &str = "campus_ledger_premium_unlocks_total";

// Session manager metrics
const TOKENS_ISSUED: &str = "campus_ledger_session_tokens_issued_total";
const TOKENS_ROTATED: &str = "campus_ledger_session_tokens_rotated_total";
const TOKENS_REVOKED: &str = "campus_ledger_session_tokens_revoked_total";
const TOKEN_REJECTIONS: &str = "campus_ledger_session_rejections_total";
const TOKEN_REUSE_DETECTED: &str = "campus_ledger_session_reuse_detected_total";
const ROTATE_LATENCY: &str = "campus_ledger_session_rotate_latency_seconds";

// Expiry sweep metrics
const TOKENS_SWEPT: &str = "campus_ledger_sweep_tokens_deleted_total";
const SWEEP_CYCLES: &str = "campus_ledger_sweep_cycles_total";
const SWEEP_LATENCY: &str = "campus_ledger_sweep_latency_seconds";
const SWEEP_LAST_BATCH: &str = "campus_ledger_sweep_last_batch";

// =============================================================================
// Referral Ledger Metrics
// =============================================================================

/// Records a newly registered student.
#[inline]
pub fn record_student_registered() {
    counter!(STUDENTS_REGISTERED).increment(1);
}

/// Records a successful referral code application.
#[inline]
pub fn record_referral_applied() {
    counter!(REFERRALS_APPLIED).increment(1);
}

/// Records a rejected application, labelled by rejection kind.
#[inline]
pub fn record_referral_rejected(reason: &'static str) {
    counter!(REFERRALS_REJECTED, "reason" => reason).increment(1);
}

/// Records a referral marked as credited.
#[inline]
pub fn record_referral_credited() {
    counter!(REFERRALS_CREDITED).increment(1);
}

/// Records a premium unlock; `role` is `referrer` or `referee`.
#[inline]
pub fn record_premium_unlock(role: &'static str) {
    counter!(PREMIUM_UNLOCKS, "role" => role).increment(1);
}

// =============================================================================
// Session Manager Metrics
// =============================================================================

/// Records a token minted at login.
#[inline]
pub fn record_token_issued() {
    counter!(TOKENS_ISSUED).increment(1);
}

/// Records a rotation attempt and its latency.
#[inline]
pub fn record_token_rotated(success: bool, latency_secs: f64) {
    let status = if success { "success" } else { "error" };
    counter!(TOKENS_ROTATED, "status" => status).increment(1);
    histogram!(ROTATE_LATENCY, "status" => status).record(latency_secs);
}

/// Records tokens moved to the revoked state, labelled by cause
/// (`logout`, `logout_all`, `family`, `reuse`).
#[inline]
pub fn record_tokens_revoked(cause: &'static str, count: usize) {
    counter!(TOKENS_REVOKED, "cause" => cause).increment(count as u64);
}

/// Records a presented token that was rejected, labelled by token state.
#[inline]
pub fn record_token_rejected(reason: &'static str) {
    counter!(TOKEN_REJECTIONS, "reason" => reason).increment(1);
}

/// Records a detected reuse of a rotated token.
#[inline]
pub fn record_token_reuse_detected() {
    counter!(TOKEN_REUSE_DETECTED).increment(1);
}

// =============================================================================
// Expiry Sweep Metrics
// =============================================================================

/// Records a completed sweep cycle.
#[inline]
pub fn record_sweep(deleted: usize, latency_secs: f64) {
    counter!(SWEEP_CYCLES).increment(1);
    counter!(TOKENS_SWEPT).increment(deleted as u64);
    histogram!(SWEEP_LATENCY).record(latency_secs);
    gauge!(SWEEP_LAST_BATCH).set(deleted as f64);
}

/// Latency histogram bucket boundaries (in seconds).
///
/// Rotation is one write transaction (low milliseconds); sweep cycles over a
/// full batch reach into the hundreds of milliseconds.
pub const LATENCY_HISTOGRAM_BUCKETS: [f64; 11] =
    [0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0, 10.0];
