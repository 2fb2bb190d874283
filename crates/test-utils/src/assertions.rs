//! Polling assertions for background-task tests.
//!
//! The expiry sweeper runs on its own timer, so tests observe its effect by
//! polling rather than sleeping a fixed amount.

// Test utilities are expected to panic on failure
#![allow(clippy::expect_used)]

use std::time::Duration;

use campus_ledger_storage::{RefreshTokenStore, StorageEngine};
use tokio::time::{Instant, sleep};

/// Default polling interval for [`assert_eventually`].
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Polls `condition` until it returns true or `timeout` expires.
///
/// Returns `true` if the condition held before (or right at) the deadline.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use campus_ledger_test_utils::assert_eventually;
///
/// # async fn example(done: impl Fn() -> bool) {
/// assert!(assert_eventually(Duration::from_secs(1), done).await);
/// # }
/// ```
pub async fn assert_eventually<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + timeout;

    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(DEFAULT_POLL_INTERVAL).await;
    }

    // Final check after timeout
    condition()
}

/// Number of refresh tokens currently stored, swept or not.
///
/// # Panics
///
/// Panics if the store cannot be read.
#[must_use]
pub fn stored_token_count(engine: &StorageEngine) -> u64 {
    let txn = engine.begin_read().expect("begin read");
    RefreshTokenStore::count(&txn).expect("count tokens")
}

/// Waits until the store holds exactly `expected` refresh tokens.
///
/// Returns `false` if the count did not settle there before `timeout`.
pub async fn wait_for_token_count(engine: &StorageEngine, expected: u64, timeout: Duration) -> bool {
    assert_eventually(timeout, || stored_token_count(engine) == expected).await
}
