//! redb storage engine wrapper.
//!
//! Provides a thin wrapper around redb with:
//! - Database lifecycle management (file-backed or in-memory)
//! - Eager creation of every ledger table
//! - A [`ReadScope`] abstraction so lookups work inside both read and
//!   write transactions

use std::path::Path;
use std::sync::Arc;

use redb::backends::InMemoryBackend;
use redb::{
    Database, Key, ReadTransaction, ReadableTable, TableDefinition, Value, WriteTransaction,
};
use snafu::ResultExt;

use crate::error::{
    CommitSnafu, DatabaseOpenSnafu, Result, TableSnafu, TransactionSnafu,
};
use crate::tables::Tables;

/// Storage engine backed by redb.
///
/// Cloning is cheap; clones share one database handle. redb serializes
/// write transactions, so every write transaction observes the committed
/// result of the previous one.
#[derive(Clone)]
pub struct StorageEngine {
    db: Arc<Database>,
}

impl StorageEngine {
    /// Opens or creates a database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the tables cannot be
    /// created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = Database::create(path)
            .context(DatabaseOpenSnafu { path: path.display().to_string() })?;
        let engine = Self { db: Arc::new(db) };
        engine.init_tables()?;
        tracing::debug!(path = %path.display(), "Opened ledger database");
        Ok(engine)
    }

    /// Creates a fresh in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the tables cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let db = Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .context(DatabaseOpenSnafu { path: ":memory:".to_string() })?;
        let engine = Self { db: Arc::new(db) };
        engine.init_tables()?;
        Ok(engine)
    }

    /// Begins a read transaction over a consistent snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started.
    pub fn begin_read(&self) -> Result<ReadTransaction> {
        self.db.begin_read().context(TransactionSnafu)
    }

    /// Begins a write transaction. Blocks while another writer is active.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started.
    pub fn begin_write(&self) -> Result<WriteTransaction> {
        self.db.begin_write().context(TransactionSnafu)
    }

    /// Commits a write transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails; nothing is applied in that case.
    pub fn commit(txn: WriteTransaction) -> Result<()> {
        txn.commit().context(CommitSnafu)
    }

    /// Creates all tables so later read transactions never see a missing table.
    fn init_tables(&self) -> Result<()> {
        let txn = self.begin_write()?;
        {
            txn.open_table(Tables::STUDENTS).context(TableSnafu)?;
            txn.open_table(Tables::REFERRAL_CODES).context(TableSnafu)?;
            txn.open_table(Tables::REFERRALS).context(TableSnafu)?;
            txn.open_table(Tables::REFERRALS_BY_REFERRER).context(TableSnafu)?;
            txn.open_table(Tables::REFRESH_TOKENS).context(TableSnafu)?;
            txn.open_table(Tables::TOKENS_BY_USER).context(TableSnafu)?;
            txn.open_table(Tables::TOKENS_BY_FAMILY).context(TableSnafu)?;
            txn.open_table(Tables::TOKENS_BY_EXPIRY).context(TableSnafu)?;
            txn.open_table(Tables::SEQUENCES).context(TableSnafu)?;
        }
        Self::commit(txn)
    }
}

/// A transaction that tables can be read through.
///
/// Implemented for both transaction kinds so a lookup helper can run inside a
/// write transaction and see that transaction's uncommitted writes.
pub trait ReadScope {
    /// Opens `definition` for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be opened.
    fn open_readable<K: Key + 'static, V: Value + 'static>(
        &self,
        definition: TableDefinition<'_, K, V>,
    ) -> Result<impl ReadableTable<K, V> + '_>;
}

impl ReadScope for ReadTransaction {
    fn open_readable<K: Key + 'static, V: Value + 'static>(
        &self,
        definition: TableDefinition<'_, K, V>,
    ) -> Result<impl ReadableTable<K, V> + '_> {
        self.open_table(definition).context(TableSnafu)
    }
}

impl ReadScope for WriteTransaction {
    fn open_readable<K: Key + 'static, V: Value + 'static>(
        &self,
        definition: TableDefinition<'_, K, V>,
    ) -> Result<impl ReadableTable<K, V> + '_> {
        self.open_table(definition).context(TableSnafu)
    }
}
