//! Ready-made ledger instances.

// Test utilities are expected to panic on failure
#![allow(clippy::expect_used)]

use campus_ledger_state::{ExpirySweeper, ReferralLedger, SessionManager};
use campus_ledger_storage::StorageEngine;
use campus_ledger_types::Student;

use crate::TestDir;
use crate::config::{test_referral_config, test_session_config};

/// A referral ledger, session manager, and sweeper sharing one store.
#[derive(Clone)]
pub struct TestLedger {
    /// The shared storage engine.
    pub engine: StorageEngine,
    /// Referral ledger over `engine`.
    pub referrals: ReferralLedger,
    /// Session manager over `engine`.
    pub sessions: SessionManager,
}

impl TestLedger {
    /// Builds a ledger over an existing engine with the test configuration.
    #[must_use]
    pub fn with_engine(engine: StorageEngine) -> Self {
        Self {
            referrals: ReferralLedger::new(engine.clone(), test_referral_config()),
            sessions: SessionManager::new(engine.clone(), test_session_config()),
            engine,
        }
    }

    /// A sweeper over the same store, using the test session configuration.
    #[must_use]
    pub fn sweeper(&self) -> ExpirySweeper {
        ExpirySweeper::new(self.engine.clone(), self.sessions.config())
    }

    /// Registers `name`, panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics if registration fails.
    pub fn student(&self, name: &str) -> Student {
        self.referrals.register_student(name).expect("register student")
    }
}

/// A ledger over a fresh in-memory store.
///
/// # Panics
///
/// Panics if the in-memory database cannot be created.
#[must_use]
pub fn in_memory_ledger() -> TestLedger {
    TestLedger::with_engine(StorageEngine::open_in_memory().expect("open in-memory store"))
}

/// A ledger over the database file in `dir`.
///
/// # Panics
///
/// Panics if the database cannot be opened.
#[must_use]
pub fn on_disk_ledger(dir: &TestDir) -> TestLedger {
    TestLedger::with_engine(dir.open_storage())
}
