//! Storage error types.

use campus_ledger_types::{CodecError, ErrorCode};
use snafu::{Location, Snafu};

/// Errors raised by the storage layer.
///
/// Every variant wraps a redb or codec failure and records where in this
/// crate it surfaced.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    /// Database file could not be opened or created.
    #[snafu(display("Failed to open database at {path}: {source}"))]
    DatabaseOpen {
        /// Database path (or `:memory:`).
        path: String,
        /// Underlying redb error.
        source: redb::DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Transaction could not be started.
    #[snafu(display("Transaction error at {location}: {source}"))]
    Transaction {
        source: redb::TransactionError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Table could not be opened.
    #[snafu(display("Table error at {location}: {source}"))]
    Table {
        source: redb::TableError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Read or write inside an open table failed.
    #[snafu(display("Storage error at {location}: {source}"))]
    Storage {
        source: redb::StorageError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Commit failed; nothing from the transaction was applied.
    #[snafu(display("Commit error at {location}: {source}"))]
    Commit {
        source: redb::CommitError,
        #[snafu(implicit)]
        location: Location,
    },

    /// A stored record could not be encoded or decoded.
    #[snafu(display("Codec error at {location}: {source}"))]
    Codec {
        source: CodecError,
        #[snafu(implicit)]
        location: Location,
    },
}

impl StorageError {
    /// Returns the machine-readable error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::DatabaseOpen { .. } => ErrorCode::StorageDatabaseOpen,
            Self::Transaction { .. } | Self::Commit { .. } => ErrorCode::StorageTransaction,
            Self::Table { .. } | Self::Storage { .. } => ErrorCode::StorageTableOperation,
            Self::Codec { .. } => ErrorCode::StorageCodec,
        }
    }

    /// Whether this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

/// Result type for storage operations.
pub type Result<T, E = StorageError> = std::result::Result<T, E>;
