//! Parses raw remote listings into structured backup records.
//!
//! The remote is a flat file listing; anything that does not match the
//! canonical naming grammar for the configured prefix is invisible to
//! retention accounting, so foreign or malformed files are never touched.

use chrono::NaiveDate;
use tracing::warn;

use crate::naming::{self, ARCHIVE_SUFFIX, ENCRYPTED_SUFFIX};

/// One well-formed remote backup entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    /// Remote file name, exactly as listed
    pub identifier: String,

    /// Calendar date parsed from the identifier
    pub date: NaiveDate,

    /// Stream tag the record was matched under
    pub prefix: Option<String>,
}

/// Parse a raw listing into records, most recent first.
///
/// Entries on the same date keep their input order, so repeated runs over
/// an unchanged listing produce identical output. Non-matching entries are
/// dropped with a warning, never an error.
pub fn parse_listing(raw_names: &[String], prefix: &str) -> Vec<BackupRecord> {
    let mut records = Vec::new();

    for name in raw_names {
        match parse_entry(name, prefix) {
            Some(record) => records.push(record),
            None => {
                warn!(entry = %name, "Ignoring remote entry outside the backup naming scheme");
            }
        }
    }

    // Stable sort: ties on date preserve listing order
    records.sort_by(|a, b| b.date.cmp(&a.date));
    records
}

/// Match one entry against `YYYY-MM-DD[_PREFIX].tar.gz[.bin]`.
///
/// The prefix group must equal the configured prefix exactly when one is
/// configured, and must be absent when none is. Comparison is literal
/// string equality, so prefix values containing pattern metacharacters
/// match only themselves.
fn parse_entry(name: &str, prefix: &str) -> Option<BackupRecord> {
    let stem = name.strip_suffix(ENCRYPTED_SUFFIX).unwrap_or(name);
    let stem = stem.strip_suffix(ARCHIVE_SUFFIX)?;

    let date_part = stem.get(..10)?;
    let tail = &stem[10..];

    if prefix.is_empty() {
        if !tail.is_empty() {
            return None;
        }
    } else if tail.strip_prefix('_') != Some(prefix) {
        return None;
    }

    let date = naming::extract_date(date_part)?;

    Some(BackupRecord {
        identifier: name.to_string(),
        date,
        prefix: if prefix.is_empty() {
            None
        } else {
            Some(prefix.to_string())
        },
    })
}
