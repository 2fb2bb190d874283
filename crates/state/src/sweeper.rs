//! Expiry sweep for refresh tokens.
//!
//! Expired tokens are already rejected at read time; the sweep only reclaims
//! space. It walks the expiry index in key order, so each cycle touches only
//! tokens that are due.
//!
//! Sweep behavior:
//! - Batched deletions (`sweep_batch_size` per cycle, default 1000)
//! - Each batch is one write transaction; a token and all of its index
//!   entries disappear together
//! - Stops when the shutdown signal flips

use std::time::{Duration, Instant};

use campus_ledger_storage::{RefreshTokenStore, StorageEngine, StorageError};
use campus_ledger_types::config::SessionConfig;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::metrics;

/// Background task deleting expired refresh tokens.
#[derive(Clone)]
pub struct ExpirySweeper {
    /// Shared storage engine.
    engine: StorageEngine,
    /// Sweep interval.
    interval: Duration,
    /// Maximum tokens per cycle.
    max_batch_size: usize,
}

impl ExpirySweeper {
    /// Creates a sweeper using the interval and batch size from `config`.
    pub fn new(engine: StorageEngine, config: &SessionConfig) -> Self {
        Self {
            engine,
            interval: config.sweep_interval,
            max_batch_size: config.sweep_batch_size,
        }
    }

    /// Overrides the sweep interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Deletes up to one batch of tokens with `expires_at <= now`.
    ///
    /// Returns the number of tokens deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; nothing is deleted then.
    pub fn sweep_once(&self, now: DateTime<Utc>) -> Result<usize, StorageError> {
        let txn = self.engine.begin_write()?;
        let expired = RefreshTokenStore::expired_hashes(&txn, now, self.max_batch_size)?;
        if expired.is_empty() {
            return Ok(0);
        }

        let mut deleted = 0;
        for hash in &expired {
            // Index keys are microsecond-granular; re-check the record itself.
            let due = RefreshTokenStore::get(&txn, hash)?.is_none_or(|token| token.is_expired(now));
            if due && RefreshTokenStore::delete(&txn, hash)? {
                deleted += 1;
            }
        }
        StorageEngine::commit(txn)?;
        Ok(deleted)
    }

    /// Runs a single sweep cycle off the async runtime.
    async fn run_cycle(&self) {
        let sweeper = self.clone();
        let start = Instant::now();
        let outcome = tokio::task::spawn_blocking(move || sweeper.sweep_once(Utc::now())).await;

        match outcome {
            Ok(Ok(deleted)) => {
                metrics::record_sweep(deleted, start.elapsed().as_secs_f64());
                if deleted > 0 {
                    info!(deleted, "Swept expired refresh tokens");
                } else {
                    debug!("No expired refresh tokens");
                }
            },
            Ok(Err(e)) => warn!(error = %e, "Expiry sweep failed"),
            Err(e) => warn!(error = %e, "Expiry sweep task panicked"),
        }
    }

    /// Starts the sweeper background task.
    ///
    /// The task exits once `shutdown` carries `true` or its sender is dropped.
    pub fn start(self, mut shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval = ?self.interval, batch = self.max_batch_size, "Expiry sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => self.run_cycle().await,
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Expiry sweeper stopped");
        })
    }
}
