//! Student record storage.
//!
//! Students are keyed by their numeric id. The referral code index maps each
//! normalized code to its owner and is the uniqueness guard for codes.

use campus_ledger_types::{Student, StudentId, decode, encode};
use redb::{ReadableTable, WriteTransaction};
use snafu::ResultExt;

use crate::engine::ReadScope;
use crate::error::{CodecSnafu, Result, StorageSnafu, TableSnafu};
use crate::tables::Tables;

/// Sequence name for student id allocation.
const STUDENT_SEQUENCE: &str = "student_id";

/// Student storage operations.
pub struct StudentStore;

impl StudentStore {
    /// Gets a student by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the record cannot be decoded.
    pub fn get(txn: &impl ReadScope, id: StudentId) -> Result<Option<Student>> {
        let table = txn.open_readable(Tables::STUDENTS)?;
        match table.get(id.value()).context(StorageSnafu)? {
            Some(data) => Ok(Some(decode(data.value()).context(CodecSnafu)?)),
            None => Ok(None),
        }
    }

    /// Resolves a normalized referral code to its owner's id.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn id_by_code(txn: &impl ReadScope, code: &str) -> Result<Option<StudentId>> {
        let table = txn.open_readable(Tables::REFERRAL_CODES)?;
        Ok(table.get(code).context(StorageSnafu)?.map(|v| StudentId::new(v.value())))
    }

    /// Gets the student owning a normalized referral code.
    ///
    /// # Errors
    ///
    /// Returns an error if either read fails.
    pub fn get_by_code(txn: &impl ReadScope, code: &str) -> Result<Option<Student>> {
        match Self::id_by_code(txn, code)? {
            Some(id) => Self::get(txn, id),
            None => Ok(None),
        }
    }

    /// Whether a referral code is already owned.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn code_exists(txn: &impl ReadScope, code: &str) -> Result<bool> {
        Ok(Self::id_by_code(txn, code)?.is_some())
    }

    /// Allocates the next student id.
    ///
    /// Ids start at 1 and are never reused, even if the enclosing
    /// transaction later aborts and a retry allocates again.
    ///
    /// # Errors
    ///
    /// Returns an error if the sequence cannot be read or written.
    pub fn next_id(txn: &WriteTransaction) -> Result<StudentId> {
        let mut table = txn.open_table(Tables::SEQUENCES).context(TableSnafu)?;
        let current = table.get(STUDENT_SEQUENCE).context(StorageSnafu)?.map_or(0, |v| v.value());
        let next = current.saturating_add(1);
        table.insert(STUDENT_SEQUENCE, next).context(StorageSnafu)?;
        Ok(StudentId::new(next))
    }

    /// Inserts a new student and claims its referral code.
    ///
    /// The caller must have checked [`Self::code_exists`] in the same
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or either write fails.
    pub fn insert(txn: &WriteTransaction, student: &Student) -> Result<()> {
        Self::put(txn, student)?;
        let mut codes = txn.open_table(Tables::REFERRAL_CODES).context(TableSnafu)?;
        codes.insert(student.referral_code.as_str(), student.id.value()).context(StorageSnafu)?;
        Ok(())
    }

    /// Writes a student record. The referral code must not change.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    pub fn put(txn: &WriteTransaction, student: &Student) -> Result<()> {
        let encoded = encode(student).context(CodecSnafu)?;
        let mut table = txn.open_table(Tables::STUDENTS).context(TableSnafu)?;
        table.insert(student.id.value(), encoded.as_slice()).context(StorageSnafu)?;
        Ok(())
    }
}
