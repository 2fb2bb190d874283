//! Referral record storage.
//!
//! One record per referee; the referrer listing index orders a referrer's
//! referrals by creation time.

use campus_ledger_types::{ReferralRecord, StudentId, decode, encode};
use redb::{ReadableTable, WriteTransaction};
use snafu::ResultExt;

use crate::engine::ReadScope;
use crate::error::{CodecSnafu, Result, StorageSnafu, TableSnafu};
use crate::keys::{referee_from_referrer_key, referrer_bounds, referrer_key};
use crate::tables::Tables;

/// Referral storage operations.
pub struct ReferralStore;

impl ReferralStore {
    /// Gets the referral that credited `referee`'s code use, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the record cannot be decoded.
    pub fn get_by_referee(
        txn: &impl ReadScope,
        referee: StudentId,
    ) -> Result<Option<ReferralRecord>> {
        let table = txn.open_readable(Tables::REFERRALS)?;
        match table.get(referee.value()).context(StorageSnafu)? {
            Some(data) => Ok(Some(decode(data.value()).context(CodecSnafu)?)),
            None => Ok(None),
        }
    }

    /// Inserts a new referral and its listing index entry.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or any write fails.
    pub fn insert(txn: &WriteTransaction, record: &ReferralRecord) -> Result<()> {
        Self::put(txn, record)?;
        let key = referrer_key(record.referrer, record.created_at, record.referee);
        let mut index = txn.open_table(Tables::REFERRALS_BY_REFERRER).context(TableSnafu)?;
        index.insert(key.as_slice(), ()).context(StorageSnafu)?;
        Ok(())
    }

    /// Overwrites a referral record. Referrer, referee, and creation time
    /// must not change.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    pub fn put(txn: &WriteTransaction, record: &ReferralRecord) -> Result<()> {
        let encoded = encode(record).context(CodecSnafu)?;
        let mut table = txn.open_table(Tables::REFERRALS).context(TableSnafu)?;
        table.insert(record.referee.value(), encoded.as_slice()).context(StorageSnafu)?;
        Ok(())
    }

    /// Lists referrals made with `referrer`'s code, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if any read fails or a record cannot be decoded.
    pub fn list_by_referrer(
        txn: &impl ReadScope,
        referrer: StudentId,
    ) -> Result<Vec<ReferralRecord>> {
        let referees = {
            let index = txn.open_readable(Tables::REFERRALS_BY_REFERRER)?;
            let (lo, hi) = referrer_bounds(referrer);
            let mut referees = Vec::new();
            for entry in index.range(lo.as_slice()..=hi.as_slice()).context(StorageSnafu)?.rev() {
                let (key, _) = entry.context(StorageSnafu)?;
                if let Some(referee) = referee_from_referrer_key(key.value()) {
                    referees.push(referee);
                }
            }
            referees
        };

        let mut records = Vec::with_capacity(referees.len());
        for referee in referees {
            if let Some(record) = Self::get_by_referee(txn, referee)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}
